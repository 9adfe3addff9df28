//! 后台模块：规则集合的唯一持有者与内容脚本注册
pub mod registry;
pub mod coordinator;

pub use self::coordinator::Coordinator;
pub use self::registry::{MemoryScriptRegistry, RegistryCall, ScriptRegistration, ScriptRegistry, ScriptUpdate};
