use serde::{Deserialize, Serialize};
use std::fmt;

/// 提取来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    /// 响应 body，按路径导航
    Body,
    /// 响应 Header，名称大小写不敏感
    #[serde(alias = "header")]
    Headers,
    /// 状态码
    Status,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionSource::Body => "body",
            ExtractionSource::Headers => "headers",
            ExtractionSource::Status => "status",
        }
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 提取规则
///
/// `path` 对 body 是路径表达式，对 headers 是 Header 名称，对 status 被忽略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRule {
    pub source: ExtractionSource,

    #[serde(default, alias = "name")]
    pub path: String,

    #[serde(alias = "variable")]
    pub destination_variable: String,
}

impl ExtractionRule {
    pub fn new(source: ExtractionSource, path: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source,
            path: path.into(),
            destination_variable: destination.into(),
        }
    }

    /// 从 body 路径提取
    pub fn body(path: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(ExtractionSource::Body, path, destination)
    }

    /// 从 Header 提取
    pub fn header(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(ExtractionSource::Headers, name, destination)
    }

    /// 提取状态码
    pub fn status(destination: impl Into<String>) -> Self {
        Self::new(ExtractionSource::Status, "", destination)
    }
}

/// 提取未命中时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissPolicy {
    /// 写入空字符串，步骤不受影响
    #[default]
    Empty,
    /// 不写入变量，步骤标记为失败
    Fail,
}

/// 提取未命中
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionMiss {
    #[error("body path '{0}' did not resolve")]
    PathNotFound(String),

    #[error("invalid extraction path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("response body is not valid JSON")]
    BodyNotJson,

    #[error("header '{0}' not present in response")]
    HeaderNotFound(String),
}

/// 单条提取规则的执行记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
    pub variable: String,
    pub source: ExtractionSource,
    pub path: String,
    /// 写入作用域的值；策略为 Fail 且未命中时为 None
    pub value: Option<String>,
    pub miss: Option<String>,
}

impl ExtractionRecord {
    pub fn is_miss(&self) -> bool {
        self.miss.is_some()
    }
}
