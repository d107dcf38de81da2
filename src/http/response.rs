use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::http::types::{Status, find_header};

/// 一次请求的响应记录
///
/// 创建后不可修改：字段私有，只暴露只读访问器，运行期间通过 `Arc` 共享
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    status: Status,
    status_text: String,
    headers: Vec<(String, String)>,
    body: String,
    #[serde(skip)]
    json: Option<Value>,
    elapsed_ms: u64,
    size_bytes: u64,
    error: Option<String>,
}

impl ResponseRecord {
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        headers: Vec<(String, String)>,
        body: String,
        elapsed: Duration,
    ) -> Self {
        let json = serde_json::from_str(&body).ok();
        let size_bytes = body.len() as u64;

        Self {
            status: Status::new(status),
            status_text: status_text.into(),
            headers,
            body,
            json,
            elapsed_ms: elapsed.as_millis() as u64,
            size_bytes,
            error: None,
        }
    }

    /// 传输层失败时生成的占位响应（status = 0）
    pub fn transport_error(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: Status::TRANSPORT_ERROR,
            status_text: Status::TRANSPORT_ERROR.reason_phrase().to_string(),
            headers: Vec::new(),
            body: String::new(),
            json: None,
            elapsed_ms: elapsed.as_millis() as u64,
            size_bytes: 0,
            error: Some(message.into()),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 大小写不敏感的 header 查找
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// body 能解析为 JSON 时的结构化内容
    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_transport_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}
