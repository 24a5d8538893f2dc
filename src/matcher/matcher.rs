//! 安全匹配器核心：整合规则集与策略开关，输出判定结果
//!
//! 提供两套互相独立的匹配入口：
//! - [`SecurityMatcher::matches`] / [`SecurityMatcher::sanitize`] 使用兜底正则，
//!   前者为整串匹配，后者替换所有命中片段；
//! - [`SecurityMatcher::evaluate`] 使用配置文件中的规则列表，按字段做包含匹配，
//!   并受策略开关控制。

use std::borrow::Cow;
use std::ops::ControlFlow;

use tracing::debug;

use super::analyzer::{FieldScanner, Halt, HeaderAnalyzer, ParameterAnalyzer, UrlAnalyzer};
use super::request::{RequestView, Verdict};
use crate::compiler::RuleSet;
use crate::rule::{LoadedConfig, PolicyFlags};
use crate::utils::is_blank;

/// 安全匹配器（加载完成后只读，可跨线程共享）
#[derive(Debug, Clone)]
pub struct SecurityMatcher {
    rule_set: RuleSet,
    flags: PolicyFlags,
    replacement: String,
}

impl SecurityMatcher {
    pub fn new(rule_set: RuleSet, flags: PolicyFlags, replacement: impl Into<String>) -> Self {
        Self {
            rule_set,
            flags,
            replacement: replacement.into(),
        }
    }

    /// 由一次完整加载的产物创建
    pub fn from_loaded(loaded: LoadedConfig, replacement: impl Into<String>) -> Self {
        Self::new(loaded.rule_set, loaded.flags, replacement)
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    pub fn flags(&self) -> PolicyFlags {
        self.flags
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// 兜底正则整串匹配；None 或未配置兜底正则时返回 false
    pub fn matches(&self, text: Option<&str>) -> bool {
        let Some(text) = text else {
            return false;
        };
        self.rule_set
            .single_match_pattern()
            .is_some_and(|pattern| pattern.is_full_match(text))
    }

    /// 对非法字符进行替换：替换所有命中兜底正则的片段
    /// None、空串、全空白串原样返回
    pub fn sanitize<'t>(&self, text: Option<&'t str>) -> Option<Cow<'t, str>> {
        let text = text?;
        if is_blank(text) {
            return Some(Cow::Borrowed(text));
        }

        Some(match self.rule_set.single_match_pattern() {
            Some(pattern) => pattern.replace_all(text, &self.replacement),
            None => Cow::Borrowed(text),
        })
    }

    /// 按策略开关检查请求；开启替换时命中内容在 request 中就地替换
    pub fn evaluate(&self, request: &mut RequestView) -> Verdict {
        // 1. 白名单直接放行
        if self.rule_set.is_exempt(&request.url) {
            debug!("白名单url，跳过安全检查：{}", request.url);
            return Verdict::Pass;
        }

        // 2. 未开启任何检查
        if !self.flags.any_check_enabled() {
            return Verdict::Pass;
        }

        // 3. 依次检查 URL、Header、参数
        let mut scanner = FieldScanner::new(&self.rule_set, self.flags, &self.replacement);
        let flow = self.scan(&mut scanner, request);
        let hits = scanner.into_hits();

        match flow {
            ControlFlow::Break(Halt::Reject(hit)) => Verdict::Reject { hit },
            _ if hits.is_empty() => Verdict::Pass,
            _ => Verdict::Sanitized { hits },
        }
    }

    fn scan(&self, scanner: &mut FieldScanner<'_>, request: &mut RequestView) -> ControlFlow<Halt> {
        if self.flags.check_url {
            UrlAnalyzer::analyze(scanner, &mut request.url)?;
        }
        if self.flags.check_header {
            HeaderAnalyzer::analyze(scanner, &mut request.headers)?;
        }
        if self.flags.check_parameter {
            ParameterAnalyzer::analyze(scanner, &mut request.parameters)?;
        }
        ControlFlow::Continue(())
    }
}
