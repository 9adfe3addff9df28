//! 有序规则集合
//! 插入顺序有意义：URL查找按顺序取第一条命中规则，新建规则插在最前面

use indexmap::{IndexMap, IndexSet};
use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use super::model::Rule;
use crate::error::{RulinameError, RulinameResult, ValidationError};

/// 规则ID → 规则槽位；`None` 表示正在编辑、尚未通过校验的槽位
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMap {
    rules: IndexMap<String, Option<Rule>>,
}

impl RuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从序列化的JSON文本解析，任一规则非法则整体失败
    pub fn from_serialized(json: &str) -> RulinameResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// 从 `{id: {match, rename}}` 对象解析，保持条目顺序
    pub fn from_value(value: &Value) -> RulinameResult<Self> {
        let obj = value.as_object().ok_or(ValidationError::RulesNotObject)?;

        let mut rules = Self::new();
        for (id, rule) in obj {
            rules.set(id, Rule::parse(rule)?);
        }

        debug!("规则集合解析完成，规则数：{}", rules.len());
        Ok(rules)
    }

    /// 写入规则：已存在的ID保持原位置，新ID追加到末尾
    pub fn set(&mut self, id: impl Into<String>, rule: Rule) {
        self.rules.insert(id.into(), Some(rule));
    }

    /// 动态入口（ID和规则均来自未类型化的JSON），原始对象需经过规则校验
    pub fn set_value(&mut self, id: &Value, rule: &Value) -> RulinameResult<()> {
        let Value::String(id) = id else {
            return Err(RulinameError::InvalidArgument("id can only be a string".to_string()));
        };

        let rule = Rule::parse(rule)?;
        self.set(id.as_str(), rule);
        Ok(())
    }

    /// 获取槽位：外层 `None` 表示不存在，内层 `None` 表示占位中的非法规则
    pub fn get(&self, id: &str) -> Option<Option<&Rule>> {
        self.rules.get(id).map(Option::as_ref)
    }

    pub fn remove(&mut self, id: &str) {
        self.rules.shift_remove(id);
    }

    /// 强制将槽位置为非法（编辑校验失败时使用）
    pub fn set_null_rule(&mut self, id: impl Into<String>) {
        self.rules.insert(id.into(), None);
    }

    /// 在最前面插入一个空槽位
    pub fn add_new_rule(&mut self, id: impl Into<String>) {
        self.rules.shift_insert(0, id.into(), None);
    }

    /// 实时编辑：校验通过则写入，失败则将槽位置空并返回校验错误
    pub fn apply_edit(&mut self, id: &str, rule: &Value) -> Result<(), ValidationError> {
        match Rule::parse(rule) {
            Ok(rule) => {
                self.set(id, rule);
                Ok(())
            }
            Err(e) => {
                debug!("规则编辑校验失败：id={}，错误={}", id, e);
                self.set_null_rule(id);
                Err(e)
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 所有有效规则的匹配模式（去重，保持首次出现顺序），用于内容脚本注册范围
    pub fn pattern_matches(&self) -> Vec<String> {
        let patterns: IndexSet<&str> = self
            .rules
            .values()
            .flatten()
            .map(|rule| rule.match_pattern().as_str())
            .collect();

        patterns.into_iter().map(str::to_string).collect()
    }

    /// 按顺序返回第一条命中URL的规则，空槽位视为不匹配
    pub fn get_by_url(&self, url: &str) -> Option<&Rule> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("URL解析失败，无规则命中：url={}，错误={}", url, e);
                return None;
            }
        };

        self.rules
            .values()
            .flatten()
            .find(|rule| rule.match_pattern().matches_url(&parsed))
    }

    /// 导出为 `{id: {match, rename}}`，存在空槽位时失败
    pub fn to_json(&self) -> RulinameResult<Value> {
        let mut obj = Map::with_capacity(self.rules.len());
        for (id, rule) in &self.rules {
            let rule = rule
                .as_ref()
                .ok_or_else(|| RulinameError::InvalidState(id.clone()))?;
            obj.insert(id.clone(), rule.to_json());
        }

        Ok(Value::Object(obj))
    }

    /// 导出格式与持久化格式一致
    pub fn export_json(&self) -> RulinameResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_json()?)?)
    }

    /// 导入：任一规则非法则整体失败
    pub fn import_json(text: &str) -> RulinameResult<Self> {
        Self::from_serialized(text)
    }
}

impl Serialize for RuleMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for (id, rule) in &self.rules {
            let rule = rule
                .as_ref()
                .ok_or_else(|| S::Error::custom(RulinameError::InvalidState(id.clone())))?;
            map.serialize_entry(id, rule)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MATCH_1: &str = "https://test1.com/";
    const MATCH_2: &str = "https://test2.com/";

    fn rule_json(pattern: &str) -> Value {
        json!({ "match": pattern, "rename": { "type": "fixed", "value": "val" } })
    }

    fn rule(pattern: &str) -> Rule {
        Rule::parse(&rule_json(pattern)).unwrap()
    }

    #[test]
    fn test_empty_map() {
        let rules = RuleMap::new();
        assert_eq!(rules.keys().count(), 0);
        assert!(rules.is_empty());
        assert_eq!(rules.to_json().unwrap(), json!({}));
    }

    #[test]
    fn test_from_serialized() {
        let text = json!({ "rule1": rule_json(MATCH_1), "rule2": rule_json(MATCH_2) }).to_string();
        let rules = RuleMap::from_serialized(&text).unwrap();

        assert_eq!(rules.keys().collect::<Vec<_>>(), vec!["rule1", "rule2"]);
        assert_eq!(rules.get("rule1").unwrap().unwrap().to_json(), rule_json(MATCH_1));
        assert_eq!(rules.get("rule2").unwrap().unwrap().to_json(), rule_json(MATCH_2));
    }

    #[test]
    fn test_from_serialized_preserves_order() {
        let text = r#"{"zeta": {"match": "https://z.com/", "rename": {"type": "fixed", "value": "z"}},
                       "alpha": {"match": "https://a.com/", "rename": {"type": "fixed", "value": "a"}}}"#;
        let rules = RuleMap::from_serialized(text).unwrap();
        assert_eq!(rules.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_from_serialized_fails_fast() {
        let text = json!({
            "good": rule_json(MATCH_1),
            "bad": { "match": "https://bad.com" , "rename": { "type": "fixed", "value": "x" } },
        })
        .to_string();
        let err = RuleMap::from_serialized(&text).unwrap_err();
        assert!(matches!(err, RulinameError::Validation(ValidationError::MissingPathSlash)));

        assert!(matches!(
            RuleMap::from_serialized("[]").unwrap_err(),
            RulinameError::Validation(ValidationError::RulesNotObject)
        ));
        assert!(matches!(
            RuleMap::from_serialized("{not json").unwrap_err(),
            RulinameError::JsonError(_)
        ));
    }

    #[test]
    fn test_to_json() {
        let mut rules = RuleMap::new();
        rules.set("rule1", rule(MATCH_1));
        rules.set("rule2", rule(MATCH_2));

        assert_eq!(
            rules.to_json().unwrap(),
            json!({ "rule1": rule_json(MATCH_1), "rule2": rule_json(MATCH_2) })
        );
        assert_eq!(
            serde_json::to_value(&rules).unwrap(),
            json!({ "rule1": rule_json(MATCH_1), "rule2": rule_json(MATCH_2) })
        );
    }

    #[test]
    fn test_to_json_fails_with_null_slot() {
        let mut rules = RuleMap::new();
        rules.set("rule1", rule(MATCH_1));
        rules.set_null_rule("rule2");

        let err = rules.to_json().unwrap_err();
        assert_eq!(err.to_string(), "Rule 'rule2' is invalid");
        assert!(serde_json::to_value(&rules).is_err());
        assert!(rules.export_json().is_err());

        rules.set("rule2", rule(MATCH_2));
        assert!(rules.to_json().is_ok());
    }

    #[test]
    fn test_set_keeps_position_on_overwrite() {
        let mut rules = RuleMap::new();
        rules.set("a", rule(MATCH_1));
        rules.set("b", rule(MATCH_1));
        rules.set("a", rule(MATCH_2));
        rules.set("c", rule(MATCH_2));

        assert_eq!(rules.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(rules.get("a").unwrap().unwrap().match_pattern().as_str(), MATCH_2);
    }

    #[test]
    fn test_set_value() {
        let mut rules = RuleMap::new();
        let err = rules.set_value(&json!(123), &rule_json(MATCH_1)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: id can only be a string");

        rules.set_value(&json!("rule1"), &rule_json(MATCH_1)).unwrap();
        assert_eq!(rules.get("rule1"), Some(Some(&rule(MATCH_1))));

        let err = rules.set_value(&json!("rule2"), &json!({ "match": MATCH_2 })).unwrap_err();
        assert!(matches!(
            err,
            RulinameError::Validation(ValidationError::MissingRuleField("rename"))
        ));
        assert_eq!(rules.get("rule2"), None);
    }

    #[test]
    fn test_get_and_remove() {
        let mut rules = RuleMap::new();
        rules.set("rule1", rule(MATCH_1));
        assert_eq!(rules.get("rule1"), Some(Some(&rule(MATCH_1))));

        rules.remove("rule1");
        assert_eq!(rules.get("rule1"), None);

        // 不存在时为空操作
        rules.remove("missing");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_add_new_rule_at_front() {
        let mut rules = RuleMap::new();
        rules.set("rule1", rule(MATCH_1));
        rules.set("rule2", rule(MATCH_2));
        rules.add_new_rule("x");

        assert_eq!(rules.keys().next(), Some("x"));
        assert_eq!(rules.keys().collect::<Vec<_>>(), vec!["x", "rule1", "rule2"]);
        assert_eq!(rules.get("x"), Some(None));
    }

    #[test]
    fn test_set_null_rule_overrides_valid_rule() {
        let mut rules = RuleMap::new();
        rules.set("rule1", rule(MATCH_1));
        rules.set_null_rule("rule1");
        assert_eq!(rules.get("rule1"), Some(None));
    }

    #[test]
    fn test_apply_edit() {
        let mut rules = RuleMap::new();
        rules.add_new_rule("draft");

        let err = rules.apply_edit("draft", &json!({ "match": "https://test.com" })).unwrap_err();
        assert_eq!(err, ValidationError::MissingPathSlash);
        assert_eq!(rules.get("draft"), Some(None));

        rules.apply_edit("draft", &rule_json(MATCH_1)).unwrap();
        assert_eq!(rules.get("draft"), Some(Some(&rule(MATCH_1))));
    }

    #[test]
    fn test_pattern_matches() {
        let mut rules = RuleMap::new();
        rules.set("rule1", rule(MATCH_1));
        rules.set("rule2", rule(MATCH_2));
        rules.set("rule3", rule(MATCH_1));
        rules.set_null_rule("rule4");

        assert_eq!(rules.pattern_matches(), vec![MATCH_1.to_string(), MATCH_2.to_string()]);
    }

    #[test]
    fn test_get_by_url_first_match_wins() {
        let mut rules = RuleMap::new();
        let specific = Rule::parse(&json!({
            "match": "https://www.test1.com/",
            "rename": { "type": "fixed", "value": "specific" }
        }))
        .unwrap();
        let wildcard = Rule::parse(&json!({
            "match": "https://*.test1.com/",
            "rename": { "type": "fixed", "value": "wildcard" }
        }))
        .unwrap();
        rules.set("wildcard", wildcard.clone());
        rules.set("specific", specific);

        assert_eq!(rules.get_by_url("https://www.test1.com/"), Some(&wildcard));
        assert_eq!(rules.get_by_url("https://nothing.com/"), None);
        assert_eq!(rules.get_by_url("::not-a-url::"), None);
    }

    #[test]
    fn test_get_by_url_skips_null_slots() {
        let mut rules = RuleMap::new();
        rules.add_new_rule("draft");
        rules.set("rule1", rule(MATCH_1));
        rules.set_null_rule("rule2");

        assert_eq!(rules.get_by_url(MATCH_1), Some(&rule(MATCH_1)));
        assert_eq!(rules.get_by_url(MATCH_2), None);
    }

    #[test]
    fn test_export_import() {
        let mut rules = RuleMap::new();
        rules.set("rule1", rule(MATCH_1));
        rules.set("rule2", rule(MATCH_2));

        let exported = rules.export_json().unwrap();
        let imported = RuleMap::import_json(&exported).unwrap();
        assert_eq!(imported, rules);
    }
}
