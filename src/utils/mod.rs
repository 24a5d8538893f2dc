//! 工具模块
pub mod header_converter;
pub mod text;

pub use self::header_converter::HeaderConverter;
pub use self::text::{is_blank, preview_compact};
