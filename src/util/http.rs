use crate::util::errors::ResolverError;
use bytes::Bytes;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub struct HttpOptions {
    pub method: Method,
    pub headers: reqwest::header::HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: reqwest::header::HeaderMap::new(),
            body: None,
            timeout: Some(Duration::from_secs(10)),
        }
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub json: Option<Value>,
}

impl HttpResponse {
    pub fn ensure_success(self) -> Result<Self, ResolverError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ResolverError::FailedStatusCode(self.status.to_string()))
        }
    }
}

/// Sends a request and parses the body as json when possible. Empty or non json bodies leave `json` as None.
pub async fn make_request(
    url: &str,
    client: &Client,
    options: HttpOptions,
) -> Result<HttpResponse, ResolverError> {
    let mut req = client.request(options.method, url);
    req = req.headers(options.headers);
    if let Some(body) = options.body {
        req = req.body(body);
    }
    if let Some(timeout) = options.timeout {
        req = req.timeout(timeout);
    }

    let res = req.send().await?;
    let status = res.status();

    let body_bytes = res.bytes().await?;
    let json: Option<Value> = if body_bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&body_bytes).ok()
    };

    tracing::trace!("{} responded with [{}]", url, status);

    Ok(HttpResponse { status, json })
}
