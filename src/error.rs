//! 全局错误类型定义

use std::fmt;
use std::io::Error as IoError;

use regex::Error as RegexError;
use thiserror::Error;

/// 配置加载错误（均为致命错误，整次加载作废）
#[derive(Error, Debug)]
pub enum ConfigError {
    // 资源相关错误
    #[error("安全过滤配置文件无法读取：{identifier}，错误：{source}")]
    Unreadable {
        identifier: String,
        #[source]
        source: IoError,
    },
    #[error("安全过滤配置文件格式错误：{0}")]
    Malformed(String),

    // 规则相关错误
    #[error("安全过滤配置文件中没有 {0} 属性")]
    MissingRuleSection(&'static str),
    #[error("正则编译失败：{pattern}，错误：{source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: RegexError,
    },
}

impl ConfigError {
    /// 以资源标识包装IO错误
    pub(crate) fn unreadable(identifier: impl Into<String>, source: IoError) -> Self {
        ConfigError::Unreadable {
            identifier: identifier.into(),
            source,
        }
    }
}

/// 非致命的配置告警：对应项取默认值，加载继续
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// 策略开关缺失或无法解析为布尔值，按 false 处理
    MissingFlagValue(&'static str),
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::MissingFlagValue(tag) => {
                write!(f, "安全过滤配置文件中 {} 缺失或无效，按 false 处理", tag)
            }
        }
    }
}

// 全局Result类型
pub type RsxssResult<T> = Result<T, ConfigError>;
