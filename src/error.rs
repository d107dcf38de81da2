use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainpostError {
    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP 请求失败: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("URL 解析错误: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("测试链 '{0}' 没有任何步骤")]
    EmptyChain(String),

    #[error("未找到 {kind}: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ChainpostError {
    fn from(err: anyhow::Error) -> Self {
        ChainpostError::Other(err.to_string())
    }
}

/// Result type for chainpost crate
pub type Result<T> = std::result::Result<T, ChainpostError>;
