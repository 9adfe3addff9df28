//! ruliname - 基于URL匹配规则的页面标题重命名引擎

// 导出全局错误类型
pub use self::error::{RulinameError, RulinameResult, ValidationError};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, ExtensionConfig, RenamePolicy, RunAt};

// 导出规则模块核心接口
pub use self::rule::{MatchPattern, RenameDefinition, Rule, RuleMap, RuleStore, RuleType, Scheme};

// 导出页面文档接口
pub use self::dom::{Document, Element, PageDocument, Selector, TitleObserver};

// 导出标题解析接口
pub use self::resolver::{ResolverState, TitleGuard, TitleResolver};

// 导出消息协议
pub use self::message::{
    BackgroundMessage, RenameClient, RenameReceiver, RenameRequest, RenameResponse, ResolutionResult,
    TabInfo, channel,
};

// 导出页面端与后台入口
pub use self::content::ContentScript;
pub use self::background::{Coordinator, MemoryScriptRegistry, ScriptRegistration, ScriptRegistry, ScriptUpdate};

// 导出工具模块核心接口
pub use self::utils::TextNormalizer;

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod dom;
pub mod resolver;
pub mod message;
pub mod content;
pub mod background;
pub mod utils;
