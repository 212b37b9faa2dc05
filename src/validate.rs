//! Inbound header and body validation. Pure functions, no I/O.

use std::collections::HashMap;
use std::fmt;

use crate::error::ValidationError;
use crate::status::StatusRequest;

pub const API_VERSION_HEADER: &str = "api-version";
pub const CONTENT_TYPE_HEADER: &str = "content-type";
const EXPECTED_CONTENT_TYPE: &str = "application/json";

/// API versions this service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up a header ignoring the case of its name.
fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .or_else(|| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

/// Checks the headers against the API contract and returns the requested version.
pub fn validate_headers(headers: &HashMap<String, String>) -> Result<ApiVersion, ValidationError> {
    let api_version = header_value(headers, API_VERSION_HEADER).unwrap_or_default();
    if api_version != ApiVersion::V1.as_str() {
        return Err(ValidationError::InvalidApiVersion {
            value: api_version.to_string(),
        });
    }

    let content_type = header_value(headers, CONTENT_TYPE_HEADER).unwrap_or_default();
    if content_type != EXPECTED_CONTENT_TYPE {
        return Err(ValidationError::InvalidContentType {
            value: content_type.to_string(),
        });
    }

    Ok(ApiVersion::V1)
}

/// Decodes the body and checks every required field, stopping at the first empty one.
pub fn validate_body(body: &str) -> Result<StatusRequest, ValidationError> {
    if body.is_empty() {
        return Err(ValidationError::EmptyBody);
    }

    // A bare `null` body decodes like `{}`.
    let request: StatusRequest = serde_json::from_str::<Option<StatusRequest>>(body)
        .map_err(|e| ValidationError::MalformedBody(e.to_string()))?
        .unwrap_or_default();

    // The gateway schema already constrains some of these, but not emptiness.
    if let Some((field, _)) = request
        .required_fields()
        .into_iter()
        .find(|(_, value)| value.is_empty())
    {
        return Err(ValidationError::EmptyField { field });
    }

    Ok(request)
}
