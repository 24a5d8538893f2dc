//! 规则模块：负责配置的定位、解析与数据模型定义
pub mod model;
pub mod loader;

// 导出核心接口
pub use self::model::{tags, ParsedConfig, PolicyFlags, RawSecurityConfig};
pub use self::loader::{ConfigLoader, FileResourceResolver, LoadReport, LoadedConfig, ResourceResolver};
