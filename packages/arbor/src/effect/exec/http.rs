use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::effect::http::{HttpMethod, HttpOp, HttpRequest, HttpTransport, RequestOptions};
use crate::effect::{Category, Completion, EffectValue};
use crate::error::EffectError;
use crate::sanitize::{is_relative, sanitize_url};

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Always pending, including for requests rejected before sending.
pub(crate) fn execute(
    transport: Arc<dyn HttpTransport>,
    base: Option<&Url>,
    op: HttpOp,
) -> Completion {
    let request = prepare(base, op);
    Completion::pending("http", async move {
        let request = request?;
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = transport.send(request).await?;
        debug!(status = response.status, "response received");
        Ok(EffectValue::Http(response))
    })
}

fn prepare(base: Option<&Url>, op: HttpOp) -> Result<HttpRequest, EffectError> {
    let (method, url, body, options) = match op {
        HttpOp::Get { url, options } => (HttpMethod::Get, url, None, options),
        HttpOp::Post { url, body, options } => (HttpMethod::Post, url, body, options),
        HttpOp::Put { url, body, options } => (HttpMethod::Put, url, body, options),
        HttpOp::Delete { url, options } => (HttpMethod::Delete, url, None, options),
        HttpOp::Unknown { operation, .. } => {
            return Err(super::unknown(Category::Http, operation));
        }
    };
    let operation = match method {
        HttpMethod::Get => "get",
        HttpMethod::Post => "post",
        HttpMethod::Put => "put",
        HttpMethod::Delete => "delete",
    };

    let url = resolve_url(operation, base, &url)?;
    let RequestOptions {
        headers: extra,
        body: option_body,
    } = options;

    let body = match method {
        HttpMethod::Post | HttpMethod::Put => body.or(option_body).map(encode_body),
        HttpMethod::Get | HttpMethod::Delete => None,
    };

    Ok(HttpRequest {
        method,
        url,
        headers: merge_headers(extra),
        body,
    })
}

pub(crate) fn resolve_url(
    operation: &'static str,
    base: Option<&Url>,
    raw: &str,
) -> Result<Url, EffectError> {
    let clean = sanitize_url(raw)
        .map_err(|e| EffectError::invalid(operation, format!("Invalid URL: {e}")))?;

    let url = if is_relative(&clean) {
        let base = base.ok_or_else(|| {
            EffectError::invalid(
                operation,
                format!("relative URL {clean:?} needs a configured base URL"),
            )
        })?;
        base.join(&clean)
    } else {
        Url::parse(&clean)
    }
    .map_err(|e| EffectError::invalid(operation, format!("Invalid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EffectError::invalid(
            operation,
            format!("cannot send a request over {other}:"),
        )),
    }
}

/// Default content type first, then caller headers, matched case-insensitively.
fn merge_headers(extra: BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if !extra.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
        headers.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
    }
    headers.extend(extra);
    headers
}

fn encode_body(body: Value) -> String {
    match body {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
