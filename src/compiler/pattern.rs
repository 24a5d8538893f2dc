//! 编译后模式模型
//! 正则编译后的结构，加载完成后只读

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use regex::{NoExpand, Regex};

/// 兜底匹配正则
/// 同时保存搜索形式（用于替换）和整串锚定形式（用于整串匹配）
#[derive(Debug, Clone)]
pub struct CatchAllPattern {
    search: Regex,
    full: Regex,
}

impl CatchAllPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let search = Regex::new(source)?;
        let full = Regex::new(&format!(r"\A(?:{})\z", source))?;
        Ok(Self { search, full })
    }

    pub fn as_str(&self) -> &str {
        self.search.as_str()
    }

    /// 整串匹配（非包含匹配）
    pub fn is_full_match(&self, text: &str) -> bool {
        self.full.is_match(text)
    }

    /// 替换全部不重叠的命中片段，替换标记按字面量处理
    pub fn replace_all<'t>(&self, text: &'t str, replacement: &str) -> Cow<'t, str> {
        self.search.replace_all(text, NoExpand(replacement))
    }
}

/// 编译后的规则集
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    exempt_urls: HashSet<String>,
    // 规则源文本 -> 正则，按源文本排序遍历
    rules: BTreeMap<String, Regex>,
    single_match_pattern: Option<CatchAllPattern>,
}

impl RuleSet {
    pub(crate) fn new(
        exempt_urls: HashSet<String>,
        rules: BTreeMap<String, Regex>,
        single_match_pattern: Option<CatchAllPattern>,
    ) -> Self {
        Self {
            exempt_urls,
            rules,
            single_match_pattern,
        }
    }

    /// URL是否在白名单中
    pub fn is_exempt(&self, url: &str) -> bool {
        self.exempt_urls.contains(url)
    }

    pub fn exempt_urls(&self) -> impl Iterator<Item = &str> {
        self.exempt_urls.iter().map(String::as_str)
    }

    pub fn exempt_url_count(&self) -> usize {
        self.exempt_urls.len()
    }

    /// 按源文本顺序遍历规则
    pub fn rules(&self) -> impl Iterator<Item = (&str, &Regex)> {
        self.rules.iter().map(|(source, regex)| (source.as_str(), regex))
    }

    pub fn rule(&self, source: &str) -> Option<&Regex> {
        self.rules.get(source)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn single_match_pattern(&self) -> Option<&CatchAllPattern> {
        self.single_match_pattern.as_ref()
    }
}
