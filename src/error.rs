//! 全局错误类型定义
//! 校验错误的提示文案会直接展示在规则编辑界面，属于对外契约，不可随意修改

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;

/// 规则校验错误（匹配模式 / 重命名定义 / 规则）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    // 匹配模式相关错误
    #[error("Invalid match pattern: missing '://' separator")]
    MissingSeparator,
    #[error("Invalid match pattern: scheme '{0}' is invalid. Only one of [http, https, ws, wss, ftp, datafile, *] schemes are valid")]
    InvalidScheme(String),
    #[error("Invalid match pattern: host must end with a slash")]
    MissingPathSlash,
    #[error("Invalid match pattern: host part is optional only if the scheme is set to 'file'")]
    EmptyHost,
    #[error("Invalid match pattern: host must not contain a port")]
    HostWithPort,
    #[error("Invalid match pattern: invalid host: '{0}'. The host can either be a complete hostname, any  hostname ('*'), or a wildcard hostname (*. followed by the hostname)")]
    InvalidHost(String),

    // 重命名定义相关错误
    #[error("Invalid rename definition: object required")]
    RenameNotObject,
    #[error("Invalid rename definition: missing '{0}'")]
    MissingRenameField(&'static str),
    #[error("Invalid '{0}' value: string required")]
    TypeMismatch(&'static str),
    #[error("Invalid argument: rename 'type' can be one of 'fixed', 'element_id', 'class_id', 'custom_query'")]
    InvalidType(String),
    #[error("Invalid argument: value must not be empty")]
    EmptyValue,

    // 规则相关错误
    #[error("Invalid rule: object required")]
    RuleNotObject,
    #[error("Invalid rule: missing '{0}'")]
    MissingRuleField(&'static str),
    #[error("Invalid argument: 'match' can only be a string")]
    MatchNotString,

    // 规则集合相关错误
    #[error("Invalid rules: object required")]
    RulesNotObject,
}

#[derive(Error, Debug)]
pub enum RulinameError {
    // 校验错误（原样透传文案）
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // 标题解析相关错误
    #[error("Element not found within timeout period")]
    NotFound,
    #[error("Invalid selector: '{0}'")]
    InvalidSelector(String),

    // 规则集合状态错误
    #[error("Rule '{0}' is invalid")]
    InvalidState(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // 通信相关错误
    #[error("消息通道已关闭：{0}")]
    ChannelClosed(String),
    #[error("内容脚本注册失败：{0}")]
    RegistryError(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
}

// 全局Result类型
pub type RulinameResult<T> = Result<T, RulinameError>;
