//! Request body encoding.
//!
//! Form fields win over JSON. The resulting body carries the content type it
//! should be sent with.

use bytes::Bytes;
use url::form_urlencoded;

use crate::constants::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::error::HttpError;

/// An encoded request body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Value for the `Content-Type` header.
    pub content_type: &'static str,
    /// Encoded bytes.
    pub body: Bytes,
}

/// Picks and encodes the request body.
///
/// Non-empty `data` is form-encoded; otherwise `json` is serialized;
/// otherwise there is no body.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if `json` cannot be serialized.
pub fn encode(
    data: Option<&[(String, String)]>,
    json: Option<&serde_json::Value>,
) -> Result<Option<Payload>, HttpError> {
    if let Some(fields) = data.filter(|fields| !fields.is_empty()) {
        return Ok(Some(Payload {
            content_type: FORM_CONTENT_TYPE,
            body: Bytes::from(encode_form(fields)),
        }));
    }
    match json {
        Some(value) => {
            let body = serde_json::to_vec(value).map_err(HttpError::Serialize)?;
            Ok(Some(Payload {
                content_type: JSON_CONTENT_TYPE,
                body: Bytes::from(body),
            }))
        }
        None => Ok(None),
    }
}

/// Encodes fields as `key=value` pairs joined with `&`, in order.
#[must_use]
pub fn encode_form(fields: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}
