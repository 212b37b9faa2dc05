//! Proxy-style invocation event and response

use std::collections::{BTreeMap, HashMap};

use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

pub const HSTS_HEADER: &str = "Strict-Transport-Security";
pub const HSTS_VALUE: &str = "max-age=63072000; includeSubDomains; preload";
pub const API_VERSION_RESPONSE_HEADER: &str = "Api-Version";

/// Headers that may carry the caller's request id, in order of preference.
const REQUEST_ID_HEADERS: [&str; 2] = ["x-amzn-requestid", "x-request-id"];

/// One inbound invocation as the handler sees it.
#[derive(Debug, Clone, Default)]
pub struct ProxyRequest {
    pub headers: HashMap<String, String>,
    pub body: String,
    pub request_id: String,
}

impl ProxyRequest {
    /// Flattens an HTTP request. Header names come out lowercase and a
    /// repeated header keeps its last value, as the gateway proxy does.
    pub fn from_http(headers: &HeaderMap, body: &Bytes) -> Self {
        let mut flat = HashMap::new();
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                flat.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let request_id = REQUEST_ID_HEADERS
            .iter()
            .find_map(|name| flat.get(*name).filter(|v| !v.is_empty()).cloned())
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        Self {
            headers: flat,
            body: String::from_utf8_lossy(body).into_owned(),
            request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status_code: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    /// The response every invocation starts from: 400, HSTS and the trace id.
    pub fn scaffold(request_id: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(HSTS_HEADER.to_string(), HSTS_VALUE.to_string());

        Self {
            status_code: StatusCode::BAD_REQUEST,
            headers,
            body: json!({ "TraceId": request_id }).to_string(),
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Dropping invalid response header {:?}", name),
            }
        }
        headers
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));

        (self.status_code, headers, self.body).into_response()
    }
}
