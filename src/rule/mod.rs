//! 规则模块：负责规则的校验、数据模型定义、有序集合与持久化
pub mod pattern;
pub mod rename;
pub mod model;
pub mod map;
pub mod store;

// 导出核心接口
pub use self::pattern::{MatchPattern, Scheme, HostMatcher, PathMatcher};
pub use self::rename::{RenameDefinition, RuleType};
pub use self::model::Rule;
pub use self::map::RuleMap;
pub use self::store::RuleStore;
