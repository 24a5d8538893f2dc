//! rsxss - 基于正则规则的请求内容安全过滤引擎（XSS等注入检查）

// 导出全局错误类型
pub use self::error::{ConfigError, ConfigWarning, RsxssResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GuardConfig};

// 导出规则模块核心接口
pub use self::rule::{
    ConfigLoader, FileResourceResolver, LoadReport, LoadedConfig, PolicyFlags, RawSecurityConfig,
    ResourceResolver,
};

// 导出工具模块核心接口
pub use self::utils::HeaderConverter;

// 导出编译模块核心接口
pub use self::compiler::{CatchAllPattern, RuleCompiler, RuleSet};

// 导出匹配模块核心接口（含全局单例的简化接口）
pub use self::matcher::{
    MatchedField,
    ManagerState,
    RequestView,
    RuleHit,
    SecurityManager,
    SecurityMatcher,
    Verdict,
    destroy_xss_guard,
    global_manager,
    init_xss_guard,
    init_xss_guard_with_source,
    xss_evaluate,
    xss_matches,
    xss_sanitize,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod utils;
pub mod compiler;
pub mod matcher;
