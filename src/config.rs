//! 全局配置管理,存储XML配置文件之外的引擎选项

use std::path::PathBuf;

/// 内置的兜底匹配正则（脚本标签、伪协议、事件属性、iframe、CSS表达式）
pub const DEFAULT_CATCH_ALL_REGEX: &str = r"(?is)<\s*/?\s*script\b[^>]*>|(?:java|vb)script\s*:|\bon[a-z]+\s*=|<\s*/?\s*iframe\b[^>]*>|expression\s*\(";

/// 默认替换标记
pub const DEFAULT_REPLACEMENT: &str = "";

/// 全局配置
#[derive(Debug, Clone)]
pub struct GuardConfig {
    // 相对路径与 classpath: 标识的解析根目录
    pub base_dir: PathBuf,
    // 兜底匹配正则，None 表示关闭 matches/sanitize
    pub catch_all_regex: Option<String>,
    // 命中内容的替换标记
    pub replacement: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            catch_all_regex: Some(DEFAULT_CATCH_ALL_REGEX.to_string()),
            replacement: DEFAULT_REPLACEMENT.to_string(),
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GuardConfig {
        GuardConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GuardConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
        }
    }

    pub fn base_dir(mut self, dir: PathBuf) -> Self {
        self.config.base_dir = dir;
        self
    }

    pub fn catch_all_regex(mut self, regex: Option<String>) -> Self {
        self.config.catch_all_regex = regex;
        self
    }

    pub fn replacement(mut self, replacement: String) -> Self {
        self.config.replacement = replacement;
        self
    }

    pub fn build(self) -> GuardConfig {
        self.config
    }
}
