use async_trait::async_trait;

use crate::http::request::ResolvedRequest;
use crate::http::response::ResponseRecord;
use crate::variable::Environment;

/// 传输层错误：请求没有拿到任何 HTTP 响应
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// 请求执行器
///
/// 编排器把它当作不透明的 I/O：传入已解析的请求，拿回响应或传输错误。
/// 超时等策略由实现方自行配置。
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(
        &self,
        request: &ResolvedRequest,
        environment: Option<&Environment>,
    ) -> Result<ResponseRecord, TransportError>;
}
