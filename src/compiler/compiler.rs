//! 规则编译器核心
//! 仅负责将原始规则编译为可执行的正则模式

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use regex::Regex;
use tracing::{debug, info};

use super::pattern::{CatchAllPattern, RuleSet};
use crate::config::GuardConfig;
use crate::error::{ConfigError, RsxssResult};
use crate::rule::RawSecurityConfig;
use crate::utils::is_blank;

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则集，任一规则编译失败则整体失败
    pub fn compile(raw: &RawSecurityConfig, config: &GuardConfig) -> RsxssResult<RuleSet> {
        let start = Instant::now();
        let mut stats = CompileStats::default();

        // 1. 白名单url
        let exempt_urls: HashSet<String> = raw
            .exempt_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();

        // 2. 编译通用正则规则
        let mut rules: BTreeMap<String, Regex> = BTreeMap::new();
        for raw_rule in &raw.rules {
            let cleaned = Self::unescape_backslashes(raw_rule);
            if is_blank(&cleaned) {
                stats.blank_count += 1;
                continue;
            }
            if rules.contains_key(&*cleaned) {
                debug!("重复的匹配规则已合并：{}", cleaned);
                stats.duplicate_count += 1;
                continue;
            }

            let regex = Self::compile_single_pattern(&cleaned)?;
            info!("配置的匹配规则:{}", cleaned);
            rules.insert(cleaned.into_owned(), regex);
        }

        // 3. 编译兜底正则
        let single_match_pattern = match config.catch_all_regex.as_deref() {
            Some(source) if !is_blank(source) => Some(
                CatchAllPattern::new(source).map_err(|e| ConfigError::InvalidPattern {
                    pattern: source.to_string(),
                    source: e,
                })?,
            ),
            _ => None,
        };

        // 4. 输出编译统计
        debug!(
            "规则编译完成，耗时{:?}，规则{}条、白名单{}条、空规则{}条、重复规则{}条、兜底正则{}",
            start.elapsed(),
            rules.len(),
            exempt_urls.len(),
            stats.blank_count,
            stats.duplicate_count,
            if single_match_pattern.is_some() { "已启用" } else { "未启用" }
        );

        Ok(RuleSet::new(exempt_urls, rules, single_match_pattern))
    }

    /// xml的cdata标签传输数据时，会在\前再加\，需要将\\还原为\
    pub fn unescape_backslashes(raw: &str) -> Cow<'_, str> {
        if raw.contains(r"\\") {
            Cow::Owned(raw.replace(r"\\", r"\"))
        } else {
            Cow::Borrowed(raw)
        }
    }

    fn compile_single_pattern(source: &str) -> RsxssResult<Regex> {
        Regex::new(source).map_err(|e| ConfigError::InvalidPattern {
            pattern: source.to_string(),
            source: e,
        })
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    blank_count: usize,
    duplicate_count: usize,
}
