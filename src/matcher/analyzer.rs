//! 检测分析器：负责URL/Header/参数的逐值规则检查
use std::collections::BTreeMap;
use std::ops::ControlFlow;

use regex::NoExpand;
use tracing::warn;

use super::request::{MatchedField, RuleHit};
use crate::compiler::RuleSet;
use crate::rule::PolicyFlags;
use crate::utils::preview_compact;

/// 日志中命中内容的最大展示长度
const LOG_PREVIEW_LEN: usize = 80;

/// 扫描中止原因
#[derive(Debug)]
pub(crate) enum Halt {
    /// 未开启替换，命中即拒绝
    Reject(RuleHit),
    /// 已替换且未开启链式检查，停止扫描
    Stopped,
}

/// 单次请求的字段扫描器，累计替换过的命中记录
pub(crate) struct FieldScanner<'a> {
    rule_set: &'a RuleSet,
    flags: PolicyFlags,
    replacement: &'a str,
    hits: Vec<RuleHit>,
}

impl<'a> FieldScanner<'a> {
    pub(crate) fn new(rule_set: &'a RuleSet, flags: PolicyFlags, replacement: &'a str) -> Self {
        Self {
            rule_set,
            flags,
            replacement,
            hits: Vec::new(),
        }
    }

    pub(crate) fn into_hits(self) -> Vec<RuleHit> {
        self.hits
    }

    /// 用全部规则检查一个值（包含匹配）
    fn scan_value(&mut self, value: &mut String, field: impl Fn() -> MatchedField) -> ControlFlow<Halt> {
        for (source, regex) in self.rule_set.rules() {
            if !regex.is_match(value.as_str()) {
                continue;
            }

            let hit = RuleHit {
                rule: source.to_string(),
                field: field(),
            };

            if self.flags.log {
                warn!(
                    rule = %source,
                    field = %hit.field,
                    value = %preview_compact(value.as_str(), LOG_PREVIEW_LEN),
                    replace = self.flags.replace,
                    "请求内容命中安全过滤规则"
                );
            }

            if !self.flags.replace {
                return ControlFlow::Break(Halt::Reject(hit));
            }

            let sanitized = regex
                .replace_all(value.as_str(), NoExpand(self.replacement))
                .into_owned();
            *value = sanitized;
            self.hits.push(hit);

            if !self.flags.chain {
                return ControlFlow::Break(Halt::Stopped);
            }
        }

        ControlFlow::Continue(())
    }

    /// 检查多值映射中的每一个值
    fn scan_multi_map(
        &mut self,
        map: &mut BTreeMap<String, Vec<String>>,
        to_field: fn(String) -> MatchedField,
    ) -> ControlFlow<Halt> {
        for (name, values) in map.iter_mut() {
            for value in values.iter_mut() {
                self.scan_value(value, || to_field(name.clone()))?;
            }
        }
        ControlFlow::Continue(())
    }
}

/// URL分析器
pub(crate) struct UrlAnalyzer;

impl UrlAnalyzer {
    pub(crate) fn analyze(scanner: &mut FieldScanner<'_>, url: &mut String) -> ControlFlow<Halt> {
        scanner.scan_value(url, || MatchedField::Url)
    }
}

/// Header分析器
pub(crate) struct HeaderAnalyzer;

impl HeaderAnalyzer {
    pub(crate) fn analyze(
        scanner: &mut FieldScanner<'_>,
        headers: &mut BTreeMap<String, Vec<String>>,
    ) -> ControlFlow<Halt> {
        scanner.scan_multi_map(headers, MatchedField::Header)
    }
}

/// 参数分析器
pub(crate) struct ParameterAnalyzer;

impl ParameterAnalyzer {
    pub(crate) fn analyze(
        scanner: &mut FieldScanner<'_>,
        parameters: &mut BTreeMap<String, Vec<String>>,
    ) -> ControlFlow<Halt> {
        scanner.scan_multi_map(parameters, MatchedField::Parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use crate::rule::RawSecurityConfig;
    use crate::compiler::RuleCompiler;

    fn rule_set(rules: &[&str]) -> RuleSet {
        let raw = RawSecurityConfig {
            rules: rules.iter().map(|r| r.to_string()).collect(),
            ..RawSecurityConfig::default()
        };
        RuleCompiler::compile(&raw, &GuardConfig::default()).unwrap()
    }

    #[test]
    fn test_reject_on_first_hit() {
        let rules = rule_set(&["<script>", "alert"]);
        let flags = PolicyFlags::default();
        let mut scanner = FieldScanner::new(&rules, flags, "");
        let mut value = "<script>alert(1)</script>".to_string();

        let flow = UrlAnalyzer::analyze(&mut scanner, &mut value);
        match flow {
            // 规则按源文本排序，"<script>" 排在 "alert" 之前
            ControlFlow::Break(Halt::Reject(hit)) => {
                assert_eq!(hit.rule, "<script>");
                assert_eq!(hit.field, MatchedField::Url);
            }
            other => panic!("unexpected flow: {other:?}"),
        }
        assert_eq!(value, "<script>alert(1)</script>");
    }

    #[test]
    fn test_replace_with_chain_applies_every_rule() {
        let rules = rule_set(&["<script>", "alert"]);
        let flags = PolicyFlags {
            replace: true,
            chain: true,
            ..PolicyFlags::default()
        };
        let mut scanner = FieldScanner::new(&rules, flags, "#");
        let mut params = BTreeMap::from([(
            "name".to_string(),
            vec!["<script>alert(1)".to_string(), "ok".to_string()],
        )]);

        let flow = ParameterAnalyzer::analyze(&mut scanner, &mut params);
        assert!(flow.is_continue());
        assert_eq!(params["name"], vec!["##(1)", "ok"]);
        assert_eq!(scanner.into_hits().len(), 2);
    }

    #[test]
    fn test_replace_without_chain_stops_after_first_hit() {
        let rules = rule_set(&["<script>", "alert"]);
        let flags = PolicyFlags {
            replace: true,
            ..PolicyFlags::default()
        };
        let mut scanner = FieldScanner::new(&rules, flags, "");
        let mut headers = BTreeMap::from([
            ("a-first".to_string(), vec!["<script>alert(1)".to_string()]),
            ("b-second".to_string(), vec!["alert(2)".to_string()]),
        ]);

        let flow = HeaderAnalyzer::analyze(&mut scanner, &mut headers);
        assert!(matches!(flow, ControlFlow::Break(Halt::Stopped)));
        assert_eq!(headers["a-first"], vec!["alert(1)"]);
        assert_eq!(headers["b-second"], vec!["alert(2)"]);

        let hits = scanner.into_hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, MatchedField::Header("a-first".to_string()));
    }
}
