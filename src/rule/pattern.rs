//! 匹配模式：校验并解析 `scheme://host/path` 形式的URL匹配规则
//! 构造后不可变，对外仅暴露 `test` 匹配能力

use std::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::ValidationError;

const SCHEME_SEPARATOR: &str = "://";

/// 合法主机名：`*`、完整主机名、或 `*.` 开头的通配主机名
static HOST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*|(\*\.)?([a-zA-Z0-9-]+\.)*[a-zA-Z0-9-]+)$").expect("主机名正则编译失败")
});

/// 协议部分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
    Ftp,
    Data,
    File,
    Any,
}

impl Scheme {
    pub fn parse(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            "ws" => Some(Scheme::Ws),
            "wss" => Some(Scheme::Wss),
            "ftp" => Some(Scheme::Ftp),
            "data" => Some(Scheme::Data),
            "file" => Some(Scheme::File),
            "*" => Some(Scheme::Any),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
            Scheme::Ftp => "ftp",
            Scheme::Data => "data",
            Scheme::File => "file",
            Scheme::Any => "*",
        }
    }

    fn matches(&self, scheme: &str) -> bool {
        match self {
            Scheme::Any => true,
            other => other.as_str() == scheme,
        }
    }
}

/// 主机部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatcher {
    // 仅 file 协议允许空主机
    Empty,
    Any,
    Exact(String),
    // `*.domain`，存储去掉 `*.` 的裸域名
    Subdomain(String),
}

impl HostMatcher {
    fn from_host(host: &str) -> Self {
        if host.is_empty() {
            HostMatcher::Empty
        } else if host == "*" {
            HostMatcher::Any
        } else if let Some(domain) = host.strip_prefix("*.") {
            HostMatcher::Subdomain(domain.to_ascii_lowercase())
        } else {
            HostMatcher::Exact(host.to_ascii_lowercase())
        }
    }

    fn matches(&self, host: Option<&str>) -> bool {
        match (self, host) {
            (HostMatcher::Any, _) => true,
            (HostMatcher::Empty, None) => true,
            (HostMatcher::Empty, Some(h)) => h.is_empty(),
            (HostMatcher::Exact(expected), Some(h)) => expected.eq_ignore_ascii_case(h),
            (HostMatcher::Subdomain(domain), Some(h)) => {
                let h = h.to_ascii_lowercase();
                h.len() > domain.len() + 1
                    && h.ends_with(domain.as_str())
                    && h.as_bytes()[h.len() - domain.len() - 1] == b'.'
            }
            (_, None) => false,
        }
    }
}

/// 路径部分（不支持路径中间通配，仅末尾 `/` 或 `*` 前缀匹配）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Any,
    Prefix(String),
    Exact(String),
}

impl PathMatcher {
    fn from_rest(rest: &str) -> Self {
        let rest = normalize_rest(rest);
        let rest = rest.as_str();
        if rest == "/" || rest == "/*" {
            PathMatcher::Any
        } else if let Some(prefix) = rest.strip_suffix('*') {
            PathMatcher::Prefix(prefix.to_string())
        } else if rest.ends_with('/') {
            PathMatcher::Prefix(rest.to_string())
        } else {
            PathMatcher::Exact(rest.to_string())
        }
    }

    fn wants_query(&self) -> bool {
        match self {
            PathMatcher::Any => false,
            PathMatcher::Prefix(p) | PathMatcher::Exact(p) => p.contains('?'),
        }
    }

    fn matches(&self, target: &str) -> bool {
        match self {
            PathMatcher::Any => true,
            PathMatcher::Prefix(prefix) => target.starts_with(prefix.as_str()),
            PathMatcher::Exact(path) => target == path,
        }
    }
}

/// 按URL的编码规则规整路径与查询部分，与 `Url::path()`/`Url::query()` 可直接比较
/// 片段部分不参与匹配，直接丢弃
fn normalize_rest(rest: &str) -> String {
    match Url::parse(&format!("http://h{}", rest)) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(e) => {
            debug!("路径规整失败，按原样使用：rest={}，错误={}", rest, e);
            rest.to_string()
        }
    }
}

/// 校验通过的匹配模式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchPattern {
    source: String,
    scheme: Scheme,
    host: HostMatcher,
    path: PathMatcher,
}

impl MatchPattern {
    /// 校验并解析匹配模式，每类错误都有独立的提示文案
    pub fn validate(pattern: &str) -> Result<Self, ValidationError> {
        let mut parts = pattern.split(SCHEME_SEPARATOR);
        let (scheme, rest) = match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(rest), None) => (scheme, rest),
            _ => return Err(ValidationError::MissingSeparator),
        };

        let scheme = Scheme::parse(scheme)
            .ok_or_else(|| ValidationError::InvalidScheme(scheme.to_string()))?;

        let path_start = rest.find('/').ok_or(ValidationError::MissingPathSlash)?;
        let (host, path) = rest.split_at(path_start);

        if scheme != Scheme::File && host.is_empty() {
            return Err(ValidationError::EmptyHost);
        }

        if host.contains(':') {
            return Err(ValidationError::HostWithPort);
        }

        // file 协议的空主机不参与主机名校验
        if !host.is_empty() && !HOST_REGEX.is_match(host) {
            return Err(ValidationError::InvalidHost(host.to_string()));
        }

        Ok(Self {
            source: pattern.to_string(),
            scheme,
            host: HostMatcher::from_host(host),
            path: PathMatcher::from_rest(path),
        })
    }

    /// 原始模式字符串
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &HostMatcher {
        &self.host
    }

    pub fn path(&self) -> &PathMatcher {
        &self.path
    }

    /// 判断URL是否命中该模式，无法解析的URL一律不命中
    pub fn test(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => self.matches_url(&parsed),
            Err(e) => {
                debug!("URL解析失败，视为不匹配：url={}，错误={}", url, e);
                false
            }
        }
    }

    /// 对已解析的URL做结构化匹配
    pub fn matches_url(&self, url: &Url) -> bool {
        if !self.scheme.matches(url.scheme()) {
            return false;
        }

        if !self.host.matches(url.host_str()) {
            return false;
        }

        if self.path.wants_query() {
            let target = format!("{}?{}", url.path(), url.query().unwrap_or(""));
            self.path.matches(&target)
        } else {
            self.path.matches(url.path())
        }
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl TryFrom<String> for MatchPattern {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value)
    }
}

impl From<MatchPattern> for String {
    fn from(pattern: MatchPattern) -> Self {
        pattern.source
    }
}
