//! 内容脚本注册接口（由宿主浏览器提供）与内存实现

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::RunAt;
use crate::error::{RulinameError, RulinameResult};

/// 首次注册时提交的完整描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRegistration {
    pub id: String,
    pub matches: Vec<String>,
    pub run_at: RunAt,
    pub js: Vec<String>,
}

/// 已注册后只更新匹配模式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptUpdate {
    pub id: String,
    pub matches: Vec<String>,
}

#[async_trait]
pub trait ScriptRegistry: Send + Sync {
    /// 返回 `ids` 中已注册的脚本ID
    async fn registered(&self, ids: &[String]) -> RulinameResult<Vec<String>>;

    async fn register(&self, scripts: Vec<ScriptRegistration>) -> RulinameResult<()>;

    async fn update(&self, scripts: Vec<ScriptUpdate>) -> RulinameResult<()>;
}

/// 注册表收到的调用，按顺序记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Registered(Vec<String>),
    Register(Vec<ScriptRegistration>),
    Update(Vec<ScriptUpdate>),
}

/// 内存注册表
#[derive(Debug, Default)]
pub struct MemoryScriptRegistry {
    scripts: Mutex<IndexMap<String, ScriptRegistration>>,
    calls: Mutex<Vec<RegistryCall>>,
    // 设置后所有调用都失败
    failure: Option<String>,
}

impl MemoryScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn script(&self, id: &str) -> Option<ScriptRegistration> {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: RegistryCall) -> RulinameResult<()> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        match &self.failure {
            Some(message) => Err(RulinameError::RegistryError(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ScriptRegistry for MemoryScriptRegistry {
    async fn registered(&self, ids: &[String]) -> RulinameResult<Vec<String>> {
        self.record(RegistryCall::Registered(ids.to_vec()))?;
        let scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.iter().filter(|id| scripts.contains_key(id.as_str())).cloned().collect())
    }

    async fn register(&self, scripts: Vec<ScriptRegistration>) -> RulinameResult<()> {
        self.record(RegistryCall::Register(scripts.clone()))?;
        let mut registered = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        for script in scripts {
            if registered.contains_key(&script.id) {
                return Err(RulinameError::RegistryError(format!("脚本已注册：{}", script.id)));
            }
            registered.insert(script.id.clone(), script);
        }
        Ok(())
    }

    async fn update(&self, scripts: Vec<ScriptUpdate>) -> RulinameResult<()> {
        self.record(RegistryCall::Update(scripts.clone()))?;
        let mut registered = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        for script in scripts {
            let Some(existing) = registered.get_mut(&script.id) else {
                return Err(RulinameError::RegistryError(format!("脚本未注册：{}", script.id)));
            };
            existing.matches = script.matches;
        }
        Ok(())
    }
}
