//! 重命名定义：描述如何得到新标题（固定文本 / 元素ID / class / 自定义查询）

use std::fmt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// 重命名类型（线上传输使用的标签）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Fixed,
    ElementId,
    ClassId,
    CustomQuery,
}

impl RuleType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "fixed" => Some(RuleType::Fixed),
            "element_id" => Some(RuleType::ElementId),
            "class_id" => Some(RuleType::ClassId),
            "custom_query" => Some(RuleType::CustomQuery),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Fixed => "fixed",
            RuleType::ElementId => "element_id",
            RuleType::ClassId => "class_id",
            RuleType::CustomQuery => "custom_query",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 重命名定义，只能通过 `parse` / `new` 校验后构造
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RenameDefinition {
    Fixed(String),
    ElementId(String),
    ClassId(String),
    CustomQuery(String),
}

impl RenameDefinition {
    /// 从类型和值构造（值不能为空）
    pub fn new(rule_type: RuleType, value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::EmptyValue);
        }

        Ok(match rule_type {
            RuleType::Fixed => RenameDefinition::Fixed(value),
            RuleType::ElementId => RenameDefinition::ElementId(value),
            RuleType::ClassId => RenameDefinition::ClassId(value),
            RuleType::CustomQuery => RenameDefinition::CustomQuery(value),
        })
    }

    /// 从JSON对象 `{type, value}` 解析，按 type → value 的顺序校验
    pub fn parse(obj: &Value) -> Result<Self, ValidationError> {
        let obj = obj.as_object().ok_or(ValidationError::RenameNotObject)?;

        let tag = Self::verify_string(obj, "type")?;
        let rule_type = RuleType::parse(tag)
            .ok_or_else(|| ValidationError::InvalidType(tag.to_string()))?;

        let value = Self::verify_string(obj, "value")?;
        Self::new(rule_type, value)
    }

    pub fn rule_type(&self) -> RuleType {
        match self {
            RenameDefinition::Fixed(_) => RuleType::Fixed,
            RenameDefinition::ElementId(_) => RuleType::ElementId,
            RenameDefinition::ClassId(_) => RuleType::ClassId,
            RenameDefinition::CustomQuery(_) => RuleType::CustomQuery,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            RenameDefinition::Fixed(v)
            | RenameDefinition::ElementId(v)
            | RenameDefinition::ClassId(v)
            | RenameDefinition::CustomQuery(v) => v,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "type": self.rule_type().as_str(),
            "value": self.value(),
        })
    }

    fn verify_string<'a>(
        obj: &'a Map<String, Value>,
        field: &'static str,
    ) -> Result<&'a str, ValidationError> {
        match obj.get(field) {
            None => Err(ValidationError::MissingRenameField(field)),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ValidationError::TypeMismatch(field)),
        }
    }
}

impl<'de> Deserialize<'de> for RenameDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
