//! 后台与页面之间的消息协议
pub mod channel;

use std::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::RenamePolicy;
use crate::error::ValidationError;
use crate::rule::{RenameDefinition, RuleType};

pub use self::channel::{RenameClient, RenameEnvelope, RenameReceiver, channel};

/// 页面就绪信号的类型标签
pub const READY_TO_RECEIVE_RENAME_REQUEST: &str = "ready_to_receive_rename_request";

/// 重命名请求：重命名定义 + 解析策略
/// `attempts` 与 `max_title_renaming` 在解析过程中被消耗
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub value: String,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    // 毫秒
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default = "default_observe")]
    pub observe_title_changes: bool,
    #[serde(default = "default_max_renaming")]
    pub max_title_renaming: u32,
}

// 旧版消息只带 type/value，缺失字段按默认策略补齐
fn default_attempts() -> u32 {
    RenamePolicy::default().attempts
}

fn default_interval() -> u64 {
    RenamePolicy::default().interval.as_millis() as u64
}

fn default_observe() -> bool {
    RenamePolicy::default().observe_title_changes
}

fn default_max_renaming() -> u32 {
    RenamePolicy::default().max_title_renaming
}

impl RenameRequest {
    pub fn from_definition(definition: &RenameDefinition, policy: &RenamePolicy) -> Self {
        Self {
            rule_type: definition.rule_type(),
            value: definition.value().to_string(),
            attempts: policy.attempts,
            interval: policy.interval.as_millis() as u64,
            observe_title_changes: policy.observe_title_changes,
            max_title_renaming: policy.max_title_renaming,
        }
    }

    /// 从未类型化的消息解析，类型未知或字段缺失时返回 `None`
    pub fn parse(message: &Value) -> Option<Self> {
        match serde_json::from_value(message.clone()) {
            Ok(request) => Some(request),
            Err(e) => {
                debug!("重命名请求解析失败：{}", e);
                None
            }
        }
    }

    pub fn definition(&self) -> Result<RenameDefinition, ValidationError> {
        RenameDefinition::new(self.rule_type, self.value.as_str())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionResult {
    Success,
    Failure,
}

/// 页面对每个请求恰好回复一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameResponse {
    pub result: ResolutionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RenameResponse {
    pub fn success() -> Self {
        Self {
            result: ResolutionResult::Success,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: ResolutionResult::Failure,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ResolutionResult::Success
    }
}

/// 页面发往后台的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackgroundMessage {
    ReadyToReceiveRenameRequest,
}

impl BackgroundMessage {
    pub fn parse(message: &Value) -> Option<Self> {
        serde_json::from_value(message.clone()).ok()
    }

    pub fn to_json(&self) -> Value {
        // 单元变体序列化不会失败
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// 发出消息的标签页
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: i64,
    pub url: String,
}
