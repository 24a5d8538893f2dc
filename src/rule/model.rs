//! 规则数据模型定义
//! 仅存储配置数据，无任何业务逻辑

use serde::{Deserialize, Serialize};

use crate::error::ConfigWarning;

/// 配置文件固定标签名
pub mod tags {
    pub const IS_CHECK_HEADER: &str = "IS_CHECK_HEADER";
    pub const IS_CHECK_PARAMETER: &str = "IS_CHECK_PARAMETER";
    pub const IS_CHECK_URL: &str = "IS_CHECK_URL";
    pub const IS_LOG: &str = "IS_LOG";
    pub const IS_CHAIN: &str = "IS_CHAIN";
    pub const REPLACE: &str = "REPLACE";

    pub const WHITE_URL_LIST: &str = "white-url-list";
    pub const URL: &str = "url";
    pub const REGEX_LIST: &str = "regex-list";
    pub const REGEX: &str = "regex";
}

/// 过滤策略开关，加载成功前全部为 false
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyFlags {
    pub check_header: bool,
    pub check_parameter: bool,
    pub check_url: bool,
    /// 命中时输出日志，不影响判定结果
    pub log: bool,
    /// 命中后是否继续扫描
    pub chain: bool,
    /// 命中后替换内容（true）还是拒绝请求（false）
    pub replace: bool,
}

impl PolicyFlags {
    /// 是否开启了任意一项检查
    pub fn any_check_enabled(&self) -> bool {
        self.check_header || self.check_parameter || self.check_url
    }
}

/// 配置文件解析后的原始数据（尚未编译）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSecurityConfig {
    pub flags: PolicyFlags,
    pub exempt_urls: Vec<String>,
    // 原样保留的规则文本，反斜杠还原在编译阶段完成
    pub rules: Vec<String>,
}

/// 解析结果：原始数据 + 非致命告警
#[derive(Debug, Clone, Default)]
pub struct ParsedConfig {
    pub raw: RawSecurityConfig,
    pub warnings: Vec<ConfigWarning>,
}
