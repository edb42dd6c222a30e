//! HTTP effects and the network seam.
//!
//! Requests go through [`HttpTransport`]. [`ReqwestTransport`] is the default;
//! tests and embedders can plug in their own. A transport only returns `Err`
//! when no response was received at all; 4xx and 5xx responses are ordinary
//! [`HttpResponse`] values.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{Effect, UnknownFallback};
use crate::config::EngineConfig;
use crate::error::EffectError;

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum HttpOp {
    Get {
        url: String,
        #[serde(default)]
        options: RequestOptions,
    },
    Post {
        url: String,
        #[serde(default)]
        body: Option<Value>,
        #[serde(default)]
        options: RequestOptions,
    },
    Put {
        url: String,
        #[serde(default)]
        body: Option<Value>,
        #[serde(default)]
        options: RequestOptions,
    },
    Delete {
        url: String,
        #[serde(default)]
        options: RequestOptions,
    },
    #[serde(skip)]
    Unknown { operation: String, payload: Value },
}

impl HttpOp {
    pub fn operation(&self) -> &str {
        match self {
            HttpOp::Get { .. } => "get",
            HttpOp::Post { .. } => "post",
            HttpOp::Put { .. } => "put",
            HttpOp::Delete { .. } => "delete",
            HttpOp::Unknown { operation, .. } => operation,
        }
    }
}

impl UnknownFallback for HttpOp {
    fn unknown(operation: String, payload: Value) -> Self {
        HttpOp::Unknown { operation, payload }
    }
}

pub fn get(url: impl Into<String>) -> Effect {
    get_with(url, RequestOptions::default())
}

pub fn get_with(url: impl Into<String>, options: RequestOptions) -> Effect {
    Effect::new(HttpOp::Get {
        url: url.into(),
        options,
    })
}

pub fn post(url: impl Into<String>, body: impl Into<Value>) -> Effect {
    post_with(url, body, RequestOptions::default())
}

pub fn post_with(
    url: impl Into<String>,
    body: impl Into<Value>,
    options: RequestOptions,
) -> Effect {
    Effect::new(HttpOp::Post {
        url: url.into(),
        body: Some(body.into()),
        options,
    })
}

pub fn put(url: impl Into<String>, body: impl Into<Value>) -> Effect {
    Effect::new(HttpOp::Put {
        url: url.into(),
        body: Some(body.into()),
        options: RequestOptions::default(),
    })
}

pub fn delete(url: impl Into<String>) -> Effect {
    Effect::new(HttpOp::Delete {
        url: url.into(),
        options: RequestOptions::default(),
    })
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A validated request ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

/// Any response that arrived, whatever its status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// JSON body when it parses, otherwise the body text as a JSON string.
    pub data: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Decode a response body: JSON when it parses, text otherwise.
pub(crate) fn decode_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

// =============================================================================
// Transport
// =============================================================================

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request. `Err` means no response was received.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, EffectError>;
}

/// The default transport, backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, EffectError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EffectError::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| EffectError::Transport(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            data: decode_body(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::effect::{Category, EffectOp};

    #[test]
    fn test_constructors_do_not_send() {
        // Building effects for an unroutable host must be instant and inert.
        let effect = get("http://192.0.2.1/never");
        assert_eq!(effect.category(), Category::Http);
        assert_eq!(effect.operation(), "get");
    }

    #[test]
    fn test_from_parts_reads_options() {
        let effect = Effect::from_parts(
            Category::Http,
            "post",
            json!({
                "url": "/api/items",
                "body": { "title": "milk" },
                "options": { "headers": { "X-Trace": "1" } }
            }),
        );
        let EffectOp::Http(HttpOp::Post { url, body, options }) = effect.into_op() else {
            panic!("Expected Post");
        };
        assert_eq!(url, "/api/items");
        assert_eq!(body, Some(json!({ "title": "milk" })));
        assert_eq!(options.headers.get("X-Trace").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body("{\"a\":1}".into()), json!({ "a": 1 }));
        assert_eq!(decode_body("not json".into()), json!("not json"));
        assert_eq!(decode_body(String::new()), Value::Null);
    }
}
