//! 规则数据模型：匹配模式 + 重命名定义
//! 构造是原子的，任一部分校验失败都不会产生半成品

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::pattern::MatchPattern;
use super::rename::RenameDefinition;
use crate::error::ValidationError;

/// 单条重命名规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    #[serde(rename = "match")]
    match_pattern: MatchPattern,
    #[serde(rename = "rename")]
    rename_definition: RenameDefinition,
}

impl Rule {
    pub fn new(match_pattern: MatchPattern, rename_definition: RenameDefinition) -> Self {
        Self { match_pattern, rename_definition }
    }

    /// 从 `{match, rename}` 解析，子校验的错误原样透传
    pub fn parse(obj: &Value) -> Result<Self, ValidationError> {
        let obj = obj.as_object().ok_or(ValidationError::RuleNotObject)?;

        let pattern = match obj.get("match") {
            None => return Err(ValidationError::MissingRuleField("match")),
            Some(Value::String(s)) => s,
            Some(_) => return Err(ValidationError::MatchNotString),
        };
        let match_pattern = MatchPattern::validate(pattern)?;

        let rename = obj.get("rename").ok_or(ValidationError::MissingRuleField("rename"))?;
        let rename_definition = RenameDefinition::parse(rename)?;

        Ok(Self { match_pattern, rename_definition })
    }

    pub fn match_pattern(&self) -> &MatchPattern {
        &self.match_pattern
    }

    pub fn rename_definition(&self) -> &RenameDefinition {
        &self.rename_definition
    }

    /// 判断URL是否适用该规则
    pub fn matches(&self, url: &str) -> bool {
        self.match_pattern.test(url)
    }

    /// 序列化为输入时的形状 `{match: <模式字符串>, rename: {type, value}}`
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "match": self.match_pattern.as_str(),
            "rename": self.rename_definition.to_json(),
        })
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
