//! 规则持久化管理
//! 仅处理规则集合的本地JSON序列化和反序列化，格式与导入/导出一致

use tracing::debug;

use super::map::RuleMap;
use crate::config::ExtensionConfig;
use crate::error::RulinameResult;

/// 规则存储管理器
pub struct RuleStore;

impl RuleStore {
    /// 从本地文件加载规则集合，文件不存在时返回 `None`
    pub async fn load(config: &ExtensionConfig) -> RulinameResult<Option<RuleMap>> {
        let rules_path = &config.rules_path;
        let data = match tokio::fs::read_to_string(rules_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("规则文件不存在：{}", rules_path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let rules = RuleMap::from_serialized(&data)?;
        debug!("规则文件加载成功，规则数：{}", rules.len());
        Ok(Some(rules))
    }

    /// 将规则集合写入本地文件，存在未完成编辑的槽位时拒绝写入
    pub async fn save(config: &ExtensionConfig, rules: &RuleMap) -> RulinameResult<()> {
        let data = rules.export_json()?;
        debug!("规则集合序列化成功，数据大小：{} 字节", data.len());

        tokio::fs::write(&config.rules_path, data).await?;
        Ok(())
    }

    /// 清除本地规则文件
    pub async fn clear(config: &ExtensionConfig) -> RulinameResult<()> {
        let rules_path = &config.rules_path;
        if rules_path.exists() {
            tokio::fs::remove_file(rules_path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::error::RulinameError;
    use crate::rule::Rule;
    use serde_json::json;

    fn temp_config(name: &str) -> ExtensionConfig {
        let path = std::env::temp_dir().join(format!("ruliname_{}_{}.json", name, std::process::id()));
        ConfigManager::custom().rules_path(path).build()
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let config = temp_config("missing");
        RuleStore::clear(&config).await.unwrap();
        assert!(RuleStore::load(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let config = temp_config("roundtrip");
        let mut rules = RuleMap::new();
        rules.set(
            "docs",
            Rule::parse(&json!({
                "match": "https://docs.rs/",
                "rename": { "type": "class_id", "value": "crate-title" }
            }))
            .unwrap(),
        );

        RuleStore::save(&config, &rules).await.unwrap();
        let loaded = RuleStore::load(&config).await.unwrap().unwrap();
        assert_eq!(loaded, rules);

        RuleStore::clear(&config).await.unwrap();
        assert!(!config.rules_path.exists());
    }

    #[tokio::test]
    async fn test_save_rejects_null_slots() {
        let config = temp_config("null_slot");
        RuleStore::clear(&config).await.unwrap();

        let mut rules = RuleMap::new();
        rules.add_new_rule("draft");

        let err = RuleStore::save(&config, &rules).await.unwrap_err();
        assert!(matches!(err, RulinameError::InvalidState(id) if id == "draft"));
        assert!(!config.rules_path.exists());
    }
}
