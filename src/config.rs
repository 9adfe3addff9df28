//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 内容脚本注入时机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunAt {
    DocumentStart,
    DocumentEnd,
    DocumentIdle,
}

/// 标题解析策略（随重命名请求一起下发到页面）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePolicy {
    // 元素未找到时的轮询次数
    pub attempts: u32,
    // 轮询间隔
    pub interval: Duration,
    // 是否守护标题，防止页面改回
    pub observe_title_changes: bool,
    // 守护期间最多纠正次数
    pub max_title_renaming: u32,
}

impl Default for RenamePolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(1000),
            observe_title_changes: true,
            max_title_renaming: 5,
        }
    }
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct ExtensionConfig {
    // 内容脚本注册ID
    pub content_script_id: String,
    // 内容脚本注入时机
    pub run_at: RunAt,
    // 内容脚本文件
    pub content_script_js: Vec<String>,
    // 规则持久化文件路径
    pub rules_path: PathBuf,
    // 重命名请求默认策略
    pub policy: RenamePolicy,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            content_script_id: "rules_content_script".to_string(),
            run_at: RunAt::DocumentStart,
            content_script_js: vec!["content.js".to_string()],
            rules_path: PathBuf::from("ruliname_rules.json"),
            policy: RenamePolicy::default(),
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> ExtensionConfig {
        ExtensionConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: ExtensionConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_script_id(mut self, id: impl Into<String>) -> Self {
        self.config.content_script_id = id.into();
        self
    }

    pub fn run_at(mut self, run_at: RunAt) -> Self {
        self.config.run_at = run_at;
        self
    }

    pub fn content_script_js(mut self, js: Vec<String>) -> Self {
        self.config.content_script_js = js;
        self
    }

    pub fn rules_path(mut self, path: PathBuf) -> Self {
        self.config.rules_path = path;
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.config.policy.attempts = attempts;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.policy.interval = interval;
        self
    }

    pub fn observe_title_changes(mut self, observe: bool) -> Self {
        self.config.policy.observe_title_changes = observe;
        self
    }

    pub fn max_title_renaming(mut self, max: u32) -> Self {
        self.config.policy.max_title_renaming = max;
        self
    }

    pub fn build(self) -> ExtensionConfig {
        self.config
    }
}
