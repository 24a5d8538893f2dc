//! 匹配模块：安全匹配核心逻辑与生命周期管理
mod analyzer;
pub mod global;
pub mod matcher;
pub mod request;

// 导出核心接口
pub use self::global::{
    destroy_xss_guard, global_manager, init_xss_guard, init_xss_guard_with_source, xss_evaluate,
    xss_matches, xss_sanitize, ManagerState, SecurityManager,
};
pub use self::matcher::SecurityMatcher;
pub use self::request::{MatchedField, RequestView, RuleHit, Verdict};
