//! Backend-agnostic request descriptor.

use http::header::IntoHeaderName;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::error::HttpError;

/// A request as the caller describes it, before auth and payload resolution.
///
/// `data` (form fields) and `json` may both be set; `data` then decides the
/// body and `json` is ignored.
///
/// # Example
///
/// ```
/// use satvu_http::Request;
///
/// let request = Request::post("http://api.example.com/orders")
///     .form([("product", "standard")])
///     .try_header("X-Request-Id", "42")?;
/// assert_eq!(request.url(), "http://api.example.com/orders");
/// # Ok::<(), satvu_http::HttpError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    headers: HeaderMap,
    data: Option<Vec<(String, String)>>,
    json: Option<serde_json::Value>,
}

impl Request {
    /// Creates a request with no headers and no payload.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            data: None,
            json: None,
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a `POST` request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Adds a header, replacing any previous value for the same name.
    #[must_use]
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a header from string parts.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidHeader`] if either part is not valid HTTP.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, HttpError> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        Ok(self.header(name, value))
    }

    /// Merges `headers` into the request headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets form fields, sent as `application/x-www-form-urlencoded`.
    ///
    /// Field order is preserved. An empty set of fields sends no form body.
    #[must_use]
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.data = Some(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Sets a JSON body, sent as `application/json` unless form fields are set.
    #[must_use]
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.json = Some(value);
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL as given by the caller.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Caller-supplied headers.
    #[must_use]
    pub const fn header_map(&self) -> &HeaderMap {
        &self.headers
    }

    /// Form fields, if any.
    #[must_use]
    pub fn data(&self) -> Option<&[(String, String)]> {
        self.data.as_deref()
    }

    /// JSON value, if any.
    #[must_use]
    pub const fn json_value(&self) -> Option<&serde_json::Value> {
        self.json.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::AUTHORIZATION;

    #[test]
    fn test_try_header_rejects_invalid_name() {
        let err = Request::get("http://example.com/")
            .try_header("bad header", "x")
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeader(_)));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = Request::get("http://example.com/")
            .try_header("authorization", "some-other")
            .unwrap();
        assert_eq!(request.header_map()[AUTHORIZATION], "some-other");
    }

    #[test]
    fn test_form_preserves_field_order() {
        let request = Request::post("http://example.com/").form([("b", "1"), ("a", "2")]);
        let fields: Vec<_> = request
            .data()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(fields, ["b", "a"]);
    }
}
