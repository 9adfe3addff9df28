//! 通用工具模块
pub mod text;

pub use self::text::{TextNormalizer, preview_compact};
