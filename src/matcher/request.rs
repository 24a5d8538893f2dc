//! 请求视图与判定结果模型

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::utils::HeaderConverter;

/// 待检查的请求内容：目标URL + Header + 参数
/// Header名统一小写，Header与参数均为多值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestView {
    pub url: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub parameters: BTreeMap<String, Vec<String>>,
}

impl RequestView {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.as_ref().to_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// 由请求URI构建：路径作为目标URL，查询串解码为参数
    /// 支持绝对URL（http://host/path?x=1）和相对URI（/path?x=1）
    pub fn from_uri(uri: &str) -> Self {
        let (path, query) = match Url::parse(uri) {
            Ok(url) if url.has_host() => (url.path().to_string(), url.query().map(str::to_string)),
            _ => {
                let without_fragment = uri.split('#').next().unwrap_or_default();
                match without_fragment.split_once('?') {
                    Some((path, query)) => (path.to_string(), Some(query.to_string())),
                    None => (without_fragment.to_string(), None),
                }
            }
        };

        let mut view = Self::new(path);
        if let Some(query) = query {
            for (name, value) in form_urlencoded::parse(query.as_bytes()) {
                view.parameters
                    .entry(name.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        }
        view
    }

    /// 由 http::Request 构建（请求体不参与检查）
    pub fn from_http_request<B>(request: &http::Request<B>) -> Self {
        let uri = request.uri();
        let target = match uri.query() {
            Some(query) => format!("{}?{}", uri.path(), query),
            None => uri.path().to_string(),
        };

        let mut view = Self::from_uri(&target);
        view.headers = HeaderConverter::to_multi_map(request.headers());
        view
    }

    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    pub fn parameter(&self, name: &str) -> Option<&[String]> {
        self.parameters.get(name).map(Vec::as_slice)
    }
}

/// 命中的字段
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum MatchedField {
    Url,
    Header(String),
    Parameter(String),
}

impl fmt::Display for MatchedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedField::Url => write!(f, "url"),
            MatchedField::Header(name) => write!(f, "header[{}]", name),
            MatchedField::Parameter(name) => write!(f, "parameter[{}]", name),
        }
    }
}

/// 一次规则命中：规则源文本 + 命中字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleHit {
    pub rule: String,
    pub field: MatchedField,
}

/// 请求判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// 未命中或被白名单放行
    Pass,
    /// 命中内容已就地替换，请求继续放行
    Sanitized { hits: Vec<RuleHit> },
    /// 命中规则，请求被拒绝
    Reject { hit: RuleHit },
}

impl Verdict {
    /// 请求是否可以继续处理（Pass 或 Sanitized）
    pub fn is_pass(&self) -> bool {
        !self.is_reject()
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Verdict::Reject { .. })
    }

    pub fn hits(&self) -> &[RuleHit] {
        match self {
            Verdict::Pass => &[],
            Verdict::Sanitized { hits } => hits,
            Verdict::Reject { hit } => std::slice::from_ref(hit),
        }
    }
}
