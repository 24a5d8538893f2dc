//! 规则加载管理器
//! 负责定位配置资源并把XML配置文件解析为原始规则数据

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, error, info, warn};
use url::Url;

use super::model::{tags, ParsedConfig, PolicyFlags, RawSecurityConfig};
use crate::compiler::{RuleCompiler, RuleSet};
use crate::config::GuardConfig;
use crate::error::{ConfigError, ConfigWarning, RsxssResult};

const CLASSPATH_PREFIX: &str = "classpath:";
const FILE_PREFIX: &str = "file:";

/// 配置资源解析：标识 -> 可读字节流
pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, identifier: &str) -> io::Result<Box<dyn Read>>;
}

/// 基于本地文件系统的资源解析器
/// 支持 `classpath:`、`file:` URL、相对路径与绝对路径
#[derive(Debug, Clone)]
pub struct FileResourceResolver {
    base_dir: PathBuf,
}

impl FileResourceResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 将标识转换为本地路径（不检查文件是否存在）
    pub fn locate(&self, identifier: &str) -> io::Result<PathBuf> {
        let identifier = identifier.trim();

        if let Some(rest) = identifier.strip_prefix(CLASSPATH_PREFIX) {
            return Ok(self.base_dir.join(rest.trim_start_matches('/')));
        }

        if identifier.starts_with(FILE_PREFIX) {
            let url = Url::parse(identifier)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            return url.to_file_path().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("无法转换为本地路径：{}", identifier),
                )
            });
        }

        let path = Path::new(identifier);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base_dir.join(path))
        }
    }
}

impl ResourceResolver for FileResourceResolver {
    fn resolve(&self, identifier: &str) -> io::Result<Box<dyn Read>> {
        let path = self.locate(identifier)?;
        debug!("xss 配置文件路径={}", path.display());
        Ok(Box::new(File::open(path)?))
    }
}

/// 一次完整加载的产物
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub rule_set: RuleSet,
    pub flags: PolicyFlags,
    pub warnings: Vec<ConfigWarning>,
}

impl LoadedConfig {
    /// 加载摘要（不含编译后的正则）
    pub fn report(&self) -> LoadReport {
        LoadReport {
            flags: self.flags,
            rule_count: self.rule_set.rule_count(),
            exempt_url_count: self.rule_set.exempt_url_count(),
            catch_all_enabled: self.rule_set.single_match_pattern().is_some(),
            warnings: self.warnings.clone(),
        }
    }
}

/// 加载摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub flags: PolicyFlags,
    pub rule_count: usize,
    pub exempt_url_count: usize,
    pub catch_all_enabled: bool,
    pub warnings: Vec<ConfigWarning>,
}

/// 规则加载管理器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 通过资源解析器定位并加载配置
    pub fn load_from_resolver(
        resolver: &dyn ResourceResolver,
        identifier: &str,
        config: &GuardConfig,
    ) -> RsxssResult<LoadedConfig> {
        let reader = resolver
            .resolve(identifier)
            .map_err(|e| ConfigError::unreadable(identifier, e))?;
        Self::load(reader, identifier, config)
    }

    /// 从字节流加载配置（identifier 仅用于错误信息）
    pub fn load<R: Read>(mut reader: R, identifier: &str, config: &GuardConfig) -> RsxssResult<LoadedConfig> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ConfigError::unreadable(identifier, e))?;

        let text = String::from_utf8(bytes).map_err(|e| {
            ConfigError::Malformed(format!("{} 不是有效的UTF-8文本：{}", identifier, e))
        })?;

        Self::load_str(&text, config)
    }

    /// 从XML文本加载配置：解析 + 编译，任一步失败都不产生规则集
    pub fn load_str(text: &str, config: &GuardConfig) -> RsxssResult<LoadedConfig> {
        let parsed = Self::parse(text)?;
        let rule_set = RuleCompiler::compile(&parsed.raw, config)?;

        Ok(LoadedConfig {
            rule_set,
            flags: parsed.raw.flags,
            warnings: parsed.warnings,
        })
    }

    /// 解析XML配置为原始规则数据
    pub fn parse(text: &str) -> RsxssResult<ParsedConfig> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;
        let root = doc.root_element();
        let mut warnings = Vec::new();

        // 1. 读取策略开关
        let flags = PolicyFlags {
            check_header: Self::read_flag(root, tags::IS_CHECK_HEADER, &mut warnings),
            check_parameter: Self::read_flag(root, tags::IS_CHECK_PARAMETER, &mut warnings),
            check_url: Self::read_flag(root, tags::IS_CHECK_URL, &mut warnings),
            log: Self::read_flag(root, tags::IS_LOG, &mut warnings),
            chain: Self::read_flag(root, tags::IS_CHAIN, &mut warnings),
            replace: Self::read_flag(root, tags::REPLACE, &mut warnings),
        };

        // 2. 加载白名单url（可选）
        let exempt_urls = match Self::child_element(root, tags::WHITE_URL_LIST) {
            Some(list) => Self::child_elements(list, tags::URL)
                .map(Self::element_text)
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .inspect(|url| info!("配置的白名单url:{}", url))
                .collect(),
            None => {
                debug!("安全过滤配置文件中没有 {}，白名单为空", tags::WHITE_URL_LIST);
                Vec::new()
            }
        };

        // 3. 加载通用正则过滤配置（必需）
        let Some(regex_list) = Self::child_element(root, tags::REGEX_LIST) else {
            error!("安全过滤配置文件中没有 {} 属性", tags::REGEX_LIST);
            return Err(ConfigError::MissingRuleSection(tags::REGEX_LIST));
        };
        let rules = Self::child_elements(regex_list, tags::REGEX)
            .map(Self::element_text)
            .collect();

        Ok(ParsedConfig {
            raw: RawSecurityConfig {
                flags,
                exempt_urls,
                rules,
            },
            warnings,
        })
    }

    /// 读取布尔开关；缺失或无法解析时记录告警并返回 false
    fn read_flag(root: Node<'_, '_>, tag: &'static str, warnings: &mut Vec<ConfigWarning>) -> bool {
        let value = Self::child_element(root, tag).map(Self::element_text);
        match value.as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            _ => {
                let warning = ConfigWarning::MissingFlagValue(tag);
                warn!("{}", warning);
                warnings.push(warning);
                false
            }
        }
    }

    fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
        node.children().find(|n| n.is_element() && n.has_tag_name(tag))
    }

    fn child_elements<'a, 'input: 'a>(
        node: Node<'a, 'input>,
        tag: &'a str,
    ) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
        node.children()
            .filter(move |n| n.is_element() && n.has_tag_name(tag))
    }

    /// 元素下全部文本（含CDATA）
    fn element_text(node: Node<'_, '_>) -> String {
        node.descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<XSSConfig>
    <IS_CHECK_HEADER>true</IS_CHECK_HEADER>
    <IS_CHECK_PARAMETER> TRUE </IS_CHECK_PARAMETER>
    <IS_CHECK_URL>false</IS_CHECK_URL>
    <IS_LOG>true</IS_LOG>
    <IS_CHAIN>false</IS_CHAIN>
    <REPLACE>true</REPLACE>
    <white-url-list>
        <url>/login</url>
        <url>  /upload  </url>
        <url>   </url>
    </white-url-list>
    <regex-list>
        <regex><![CDATA[<script>]]></regex>
        <regex><![CDATA[on\\w+\\s*=]]></regex>
        <regex></regex>
    </regex-list>
</XSSConfig>"#;

    #[test]
    fn test_parse_full_config() {
        let parsed = ConfigLoader::parse(FULL_CONFIG).unwrap();
        let flags = parsed.raw.flags;

        assert!(flags.check_header);
        assert!(flags.check_parameter);
        assert!(!flags.check_url);
        assert!(flags.log);
        assert!(!flags.chain);
        assert!(flags.replace);
        assert!(parsed.warnings.is_empty());

        // 空白url被跳过，其余被trim
        assert_eq!(parsed.raw.exempt_urls, vec!["/login", "/upload"]);
        // 规则原样保留，反斜杠在编译阶段还原
        assert_eq!(parsed.raw.rules, vec!["<script>", r"on\\w+\\s*=", ""]);
    }

    #[test]
    fn test_missing_flag_defaults_false_with_warning() {
        let xml = r#"<XSSConfig>
            <IS_CHECK_URL>yes</IS_CHECK_URL>
            <regex-list><regex>a</regex></regex-list>
        </XSSConfig>"#;
        let parsed = ConfigLoader::parse(xml).unwrap();

        assert_eq!(parsed.raw.flags, PolicyFlags::default());
        assert_eq!(parsed.warnings.len(), 6);
        assert!(parsed.warnings.contains(&ConfigWarning::MissingFlagValue(tags::IS_CHECK_URL)));
    }

    #[test]
    fn test_missing_regex_list_is_fatal() {
        let xml = r#"<XSSConfig>
            <IS_CHECK_URL>true</IS_CHECK_URL>
            <white-url-list><url>/a</url></white-url-list>
        </XSSConfig>"#;
        let err = ConfigLoader::parse(xml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRuleSection(tags::REGEX_LIST)));
    }

    #[test]
    fn test_missing_white_list_is_not_an_error() {
        let xml = r#"<XSSConfig><regex-list><regex>a</regex></regex-list></XSSConfig>"#;
        let loaded = ConfigLoader::load_str(xml, &GuardConfig::default()).unwrap();
        assert_eq!(loaded.rule_set.exempt_url_count(), 0);
        assert_eq!(loaded.rule_set.rule_count(), 1);
    }

    #[test]
    fn test_malformed_document() {
        let err = ConfigLoader::parse("<XSSConfig><regex-list>").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_invalid_pattern_aborts_load() {
        let xml = r#"<XSSConfig><regex-list>
            <regex>&lt;script&gt;</regex>
            <regex>(unclosed</regex>
        </regex-list></XSSConfig>"#;
        let err = ConfigLoader::load_str(xml, &GuardConfig::default()).unwrap_err();
        match err {
            ConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_utf8_source_is_malformed() {
        let bytes: &[u8] = &[0xff, 0xfe, 0x00];
        let err = ConfigLoader::load(bytes, "memory", &GuardConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_resolver_locates_identifiers() {
        let resolver = FileResourceResolver::new("/srv/app");

        assert_eq!(
            resolver.locate("classpath:/xss/xss_security_config.xml").unwrap(),
            PathBuf::from("/srv/app/xss/xss_security_config.xml")
        );
        assert_eq!(
            resolver.locate("conf/xss.xml").unwrap(),
            PathBuf::from("/srv/app/conf/xss.xml")
        );
        assert_eq!(
            resolver.locate("/etc/xss.xml").unwrap(),
            PathBuf::from("/etc/xss.xml")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolver_accepts_file_url() {
        let resolver = FileResourceResolver::new("/srv/app");
        assert_eq!(
            resolver.locate("file:///etc/xss.xml").unwrap(),
            PathBuf::from("/etc/xss.xml")
        );
    }

    #[test]
    fn test_load_from_resolver_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FileResourceResolver::new(dir.path());
        let err = ConfigLoader::load_from_resolver(&resolver, "missing.xml", &GuardConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn test_load_from_resolver_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("xss.xml"), FULL_CONFIG).unwrap();
        let resolver = FileResourceResolver::new(dir.path());

        let loaded =
            ConfigLoader::load_from_resolver(&resolver, "classpath:xss.xml", &GuardConfig::default())
                .unwrap();
        assert_eq!(loaded.rule_set.rule_count(), 2);
        assert!(loaded.rule_set.is_exempt("/login"));
    }
}
