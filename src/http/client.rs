use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::Result;
use crate::http::executor::{RequestExecutor, TransportError};
use crate::http::request::ResolvedRequest;
use crate::http::response::ResponseRecord;
use crate::variable::Environment;

/// 基于 reqwest 的默认执行器
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    fn build_headers(headers: &[(String, String)]) -> std::result::Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::new();
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.trim().as_bytes()).map_err(|e| {
                TransportError::InvalidHeader {
                    name: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
                name: key.clone(),
                reason: e.to_string(),
            })?;
            map.append(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl RequestExecutor for Client {
    async fn execute(
        &self,
        request: &ResolvedRequest,
        _environment: Option<&Environment>,
    ) -> std::result::Result<ResponseRecord, TransportError> {
        let url = request
            .full_url()
            .map_err(|e| TransportError::InvalidUrl {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;
        let headers = Self::build_headers(&request.headers)?;

        debug!("{} {}", request.method, url);

        let mut req = self
            .inner
            .request(request.method.into(), url)
            .headers(headers);

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let start = Instant::now();
        let response = req.send().await?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;
        let elapsed = start.elapsed();

        Ok(ResponseRecord::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            headers,
            body,
            elapsed,
        ))
    }
}
