//! 后台协调器：持有规则集合，维护内容脚本注册，回应页面就绪信号

use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::registry::{ScriptRegistration, ScriptRegistry, ScriptUpdate};
use crate::config::ExtensionConfig;
use crate::error::RulinameResult;
use crate::message::{BackgroundMessage, RenameClient, RenameRequest, RenameResponse, TabInfo};
use crate::rule::{RuleMap, RuleStore};

pub struct Coordinator<R: ScriptRegistry> {
    config: ExtensionConfig,
    registry: R,
    rules: RwLock<RuleMap>,
}

impl<R: ScriptRegistry> Coordinator<R> {
    pub fn new(config: ExtensionConfig, registry: R) -> Self {
        Self {
            config,
            registry,
            rules: RwLock::new(RuleMap::new()),
        }
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// 当前规则集合（只读）
    pub fn rules(&self) -> RwLockReadGuard<'_, RuleMap> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 启动时读取已存储的规则
    pub async fn init(&self, stored: Option<&str>) {
        self.on_rules_changed(stored).await;
    }

    /// 从规则文件启动，文件不存在时保持空规则
    pub async fn init_from_store(&self) -> RulinameResult<()> {
        if let Some(rules) = RuleStore::load(&self.config).await? {
            self.replace_rules(rules).await;
        }
        Ok(())
    }

    /// 存储中的规则发生变化
    pub async fn on_rules_changed(&self, new_value: Option<&str>) {
        let Some(json) = new_value else {
            return;
        };

        match RuleMap::from_serialized(json) {
            Ok(rules) => self.replace_rules(rules).await,
            Err(e) => warn!("规则解析失败，保留原有规则：{}", e),
        }
    }

    async fn replace_rules(&self, rules: RuleMap) {
        let pattern_matches = rules.pattern_matches();
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = rules;
        debug!("规则集合已更新，匹配模式数：{}", pattern_matches.len());

        if pattern_matches.is_empty() {
            return;
        }
        self.refresh_registration(pattern_matches).await;
    }

    /// 首次注册或更新内容脚本的匹配模式，失败只记录日志
    pub async fn refresh_registration(&self, pattern_matches: Vec<String>) {
        if let Err(e) = self.try_refresh_registration(pattern_matches).await {
            warn!("内容脚本注册失败：{}", e);
        }
    }

    async fn try_refresh_registration(&self, matches: Vec<String>) -> RulinameResult<()> {
        let id = self.config.content_script_id.clone();
        let registered = self.registry.registered(std::slice::from_ref(&id)).await?;

        if registered.is_empty() {
            info!("注册内容脚本 {}，匹配模式：{:?}", id, matches);
            self.registry
                .register(vec![ScriptRegistration {
                    id,
                    matches,
                    run_at: self.config.run_at,
                    js: self.config.content_script_js.clone(),
                }])
                .await
        } else {
            info!("更新内容脚本 {}，匹配模式：{:?}", id, matches);
            self.registry.update(vec![ScriptUpdate { id, matches }]).await
        }
    }

    /// 处理页面消息，就绪信号且标签页地址命中规则时返回要发送的重命名请求
    pub fn on_message(&self, message: &Value, tab: &TabInfo) -> Option<RenameRequest> {
        match BackgroundMessage::parse(message)? {
            BackgroundMessage::ReadyToReceiveRenameRequest => {
                let rules = self.rules();
                let Some(rule) = rules.get_by_url(&tab.url) else {
                    debug!("标签页 {} 没有匹配的规则：{}", tab.id, tab.url);
                    return None;
                };
                Some(RenameRequest::from_definition(rule.rename_definition(), &self.config.policy))
            }
        }
    }

    /// 处理页面消息并通过通道发送请求，返回页面的回复
    pub async fn dispatch(
        &self,
        message: &Value,
        tab: &TabInfo,
        client: &RenameClient,
    ) -> Option<RulinameResult<RenameResponse>> {
        let request = self.on_message(message, tab)?;
        let response = client.send(request).await;
        match &response {
            Ok(reply) if !reply.is_success() => {
                warn!("标签页 {} 重命名失败：{}", tab.id, reply.message.as_deref().unwrap_or_default())
            }
            Ok(_) => debug!("标签页 {} 重命名成功", tab.id),
            Err(e) => warn!("标签页 {} 通信失败：{}", tab.id, e),
        }
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::registry::{MemoryScriptRegistry, RegistryCall};
    use crate::config::{ConfigManager, RunAt};
    use crate::content::ContentScript;
    use crate::dom::{Document, PageDocument};
    use crate::message::{READY_TO_RECEIVE_RENAME_REQUEST, channel};
    use crate::rule::RuleType;
    use serde_json::json;
    use std::time::Duration;

    const SCRIPT_ID: &str = "rules_content_script";

    fn rules_json(entries: &[(&str, &str)]) -> String {
        let mut rules = serde_json::Map::new();
        for (id, pattern) in entries {
            rules.insert(
                id.to_string(),
                json!({ "match": pattern, "rename": { "type": "fixed", "value": "val" } }),
            );
        }
        Value::Object(rules).to_string()
    }

    fn coordinator() -> Coordinator<MemoryScriptRegistry> {
        Coordinator::new(ConfigManager::get_default(), MemoryScriptRegistry::new())
    }

    fn tab(url: &str) -> TabInfo {
        TabInfo {
            id: 1,
            url: url.to_string(),
        }
    }

    fn ready() -> Value {
        json!({ "type": READY_TO_RECEIVE_RENAME_REQUEST })
    }

    #[tokio::test]
    async fn test_no_registration_without_rules() {
        let coordinator = coordinator();
        coordinator.init(None).await;
        coordinator.init(Some("{}")).await;
        assert!(coordinator.registry().calls().is_empty());
    }

    #[tokio::test]
    async fn test_register_single_rule() {
        let coordinator = coordinator();
        coordinator.init(Some(&rules_json(&[("test", "https://test.com/")]))).await;

        assert_eq!(
            coordinator.registry().calls(),
            vec![
                RegistryCall::Registered(vec![SCRIPT_ID.to_string()]),
                RegistryCall::Register(vec![ScriptRegistration {
                    id: SCRIPT_ID.to_string(),
                    matches: vec!["https://test.com/".to_string()],
                    run_at: RunAt::DocumentStart,
                    js: vec!["content.js".to_string()],
                }]),
            ]
        );
    }

    #[tokio::test]
    async fn test_register_two_rules_then_update() {
        let coordinator = coordinator();
        coordinator
            .init(Some(&rules_json(&[("test", "https://test.com/"), ("test2", "https://test2.com/")])))
            .await;
        let script = coordinator.registry().script(SCRIPT_ID).unwrap();
        assert_eq!(script.matches, vec!["https://test.com/", "https://test2.com/"]);

        coordinator.on_rules_changed(Some(&rules_json(&[("test", "https://test.com/")]))).await;
        assert_eq!(
            coordinator.registry().calls().last(),
            Some(&RegistryCall::Update(vec![ScriptUpdate {
                id: SCRIPT_ID.to_string(),
                matches: vec!["https://test.com/".to_string()],
            }]))
        );
        assert_eq!(coordinator.rules().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rules_keep_previous() {
        let coordinator = coordinator();
        coordinator.init(Some(&rules_json(&[("test", "https://test.com/")]))).await;
        let calls = coordinator.registry().calls().len();

        coordinator.on_rules_changed(Some("not json")).await;
        coordinator
            .on_rules_changed(Some(&rules_json(&[("bad", "https://*.test.com:8080/")])))
            .await;

        assert_eq!(coordinator.registry().calls().len(), calls);
        assert!(coordinator.rules().get("test").is_some());
        assert!(coordinator.rules().get("bad").is_none());
    }

    #[tokio::test]
    async fn test_registry_failure_is_not_escalated() {
        let coordinator = Coordinator::new(ConfigManager::get_default(), MemoryScriptRegistry::failing("denied"));
        coordinator.init(Some(&rules_json(&[("test", "https://test.com/")]))).await;

        assert_eq!(coordinator.registry().calls().len(), 1);
        assert_eq!(coordinator.rules().len(), 1);
    }

    #[tokio::test]
    async fn test_on_message() {
        let coordinator = coordinator();
        coordinator
            .init(Some(&rules_json(&[("test", "https://test.com/"), ("wild", "*://*.test.com/*")])))
            .await;

        let request = coordinator.on_message(&ready(), &tab("https://test.com/")).unwrap();
        assert_eq!(request.rule_type, RuleType::Fixed);
        assert_eq!(request.value, "val");
        assert_eq!(request.attempts, 10);
        assert_eq!(request.interval(), Duration::from_millis(1000));

        assert!(coordinator.on_message(&ready(), &tab("https://other.com/")).is_none());
        assert!(coordinator.on_message(&json!({ "type": "unknown_type" }), &tab("https://test.com/")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_end_to_end() {
        let coordinator = coordinator();
        let stored = json!({
            "news": {
                "match": "https://news.test.com/*",
                "rename": { "type": "custom_query", "value": "main h1" }
            }
        })
        .to_string();
        coordinator.init(Some(&stored)).await;

        let document = PageDocument::parse("<html><head><title>Old</title></head><body><main><h1>Headline</h1></main></body></html>");
        let (client, receiver) = channel();
        let page = document.clone();
        tokio::spawn(async move {
            ContentScript::new(page).serve(receiver).await;
        });

        let response = coordinator
            .dispatch(&ContentScript::<PageDocument>::ready_signal(), &tab("https://news.test.com/today"), &client)
            .await
            .unwrap()
            .unwrap();
        assert!(response.is_success());
        assert_eq!(document.title(), "Headline");

        assert!(coordinator.dispatch(&ready(), &tab("https://test.com/"), &client).await.is_none());
    }

    #[tokio::test]
    async fn test_init_from_store() {
        let path = std::env::temp_dir().join(format!("ruliname_coordinator_{}.json", std::process::id()));
        let config = ConfigManager::custom().rules_path(path.clone()).build();

        let coordinator = Coordinator::new(config.clone(), MemoryScriptRegistry::new());
        coordinator.init_from_store().await.unwrap();
        assert!(coordinator.rules().is_empty());

        let rules = RuleMap::from_serialized(&rules_json(&[("test", "https://test.com/")])).unwrap();
        RuleStore::save(&config, &rules).await.unwrap();
        coordinator.init_from_store().await.unwrap();
        assert_eq!(coordinator.rules().len(), 1);
        assert!(coordinator.registry().script(SCRIPT_ID).is_some());

        RuleStore::clear(&config).await.unwrap();
    }
}
