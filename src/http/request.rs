// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request configuration and the immutable request it produces

use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use url::{form_urlencoded, Url};

use super::content_types::FORM_URLENCODED;
use super::headers::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use super::multipart::{self, MultipartPart};
use super::{DEFAULT_ACCEPT, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT};
use crate::error::{Error, Result};

/// Everything a caller can say about a request before it is built.
///
/// Every field has a default, so only the interesting ones need setting:
///
/// ```
/// use httpsession::{Method, RequestConfig};
///
/// let config = RequestConfig::new()
///     .method(Method::POST)
///     .param("k", "v")
///     .capture_cookie(true);
/// assert_eq!(config.params.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request method
    pub method: Method,
    /// Add Accept/User-Agent/Content-Type (and stored cookies) automatically
    pub use_default_headers: bool,
    /// Caller headers, applied over the defaults
    pub headers: Vec<(String, String)>,
    /// Query or body parameters, in order
    pub params: Vec<(String, String)>,
    /// Multipart parts; non-empty switches body encoding to multipart
    pub multipart: Vec<MultipartPart>,
    /// Capture Set-Cookie headers of the response into the cookie store
    pub capture_cookie: bool,
    /// Basic auth credentials (user, password)
    pub basic_auth: Option<(String, String)>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: Method::GET,
            use_default_headers: true,
            headers: Vec::new(),
            params: Vec::new(),
            multipart: Vec::new(),
            capture_cookie: false,
            basic_auth: None,
        }
    }
}

impl RequestConfig {
    /// Create a GET configuration with default headers
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Toggle default headers
    pub fn use_default_headers(mut self, enabled: bool) -> Self {
        self.use_default_headers = enabled;
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add multiple headers
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add multiple parameters
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a multipart part
    pub fn part(mut self, part: MultipartPart) -> Self {
        self.multipart.push(part);
        self
    }

    /// Request cookie capture
    pub fn capture_cookie(mut self, capture: bool) -> Self {
        self.capture_cookie = capture;
        self
    }

    /// Set basic auth credentials
    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }
}

/// Immutable, fully encoded request
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Request URL, query parameters included
    pub url: Url,
    /// Request headers (defaults merged with caller headers)
    pub headers: HeaderMap,
    /// Encoded body
    pub body: Option<Bytes>,
    /// Push the response into the cookie store on completion
    pub capture_cookie: bool,
    /// Whether default headers were requested
    pub use_default_headers: bool,
}

impl Request {
    /// Build a request from a URL and configuration.
    ///
    /// Fails with [`Error::MalformedUrl`] before anything touches the network.
    pub fn configure(url: impl AsRef<str>, config: RequestConfig) -> Result<Self> {
        let mut url = Url::parse(url.as_ref())?;
        let mut body = None;
        let mut content_type = None;

        if sends_params_in_body(&config.method) {
            if !config.multipart.is_empty() {
                let encoded = multipart::encode(&config.params, &config.multipart);
                content_type = Some(encoded.content_type());
                body = Some(encoded.body);
            } else if !config.params.is_empty() {
                body = Some(Bytes::from(encode_form(&config.params)));
                content_type = Some(FORM_URLENCODED.to_string());
            }
        } else if !config.params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(config.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let mut headers = HeaderMap::new();
        if config.use_default_headers {
            headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
            headers.insert(
                ACCEPT_LANGUAGE,
                HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
            );
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
            if let Some(ref ct) = content_type {
                headers.insert(CONTENT_TYPE, header_value(ct)?);
            }
        } else if let Some(ref ct) = content_type {
            // The body is unreadable without its boundary, defaults or not.
            if ct.starts_with(super::content_types::MULTIPART_FORM_DATA) {
                headers.insert(CONTENT_TYPE, header_value(ct)?);
            }
        }

        for (name, value) in &config.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::invalid_header(format!("{}: {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }

        if let Some((ref user, ref password)) = config.basic_auth {
            headers.insert(AUTHORIZATION, header_value(&basic_auth_value(user, password))?);
        }

        Ok(Self {
            method: config.method,
            url,
            headers,
            body,
            capture_cookie: config.capture_cookie,
            use_default_headers: config.use_default_headers,
        })
    }

    /// Create a GET request with default headers
    pub fn get(url: impl AsRef<str>) -> Result<Self> {
        Self::configure(url, RequestConfig::default())
    }

    /// Create a POST request with form parameters
    pub fn post<I, K, V>(url: impl AsRef<str>, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::configure(url, RequestConfig::new().method(Method::POST).params(params))
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body length in bytes
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, |b| b.len())
    }

    /// Get the host
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }
}

/// Methods whose parameters travel in the body
fn sends_params_in_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn encode_form(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

/// `Basic base64(user:password)`
pub(crate) fn basic_auth_value(user: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
    format!("Basic {}", encoded)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::try_from(value).map_err(|e| Error::invalid_header(format!("{:?}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::multipart::tests::sections;
    use std::collections::HashMap;

    #[test]
    fn test_malformed_url() {
        let err = Request::get("not a url").unwrap_err();
        assert!(matches!(err, Error::MalformedUrl(_)));
    }

    #[test]
    fn test_get_params_in_query() {
        let config = RequestConfig::new().param("q", "rust lang").param("page", "2");
        let req = Request::configure("https://example.test/search?x=1", config).unwrap();

        assert_eq!(req.method, Method::GET);
        assert!(req.body.is_none());
        assert_eq!(req.url.query(), Some("x=1&q=rust+lang&page=2"));
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn test_delete_params_in_query() {
        let config = RequestConfig::new().method(Method::DELETE).param("id", "7");
        let req = Request::configure("https://example.test/item", config).unwrap();
        assert_eq!(req.url.query(), Some("id=7"));
        assert!(req.body.is_none());
    }

    #[test]
    fn test_post_params_form_encoded() {
        let req = Request::post(
            "https://example.test/post",
            [("k", "v"), ("emoji", "Http Request POST 😄"), ("a&b", "c=d")],
        )
        .unwrap();

        assert_eq!(req.url.query(), None);
        assert_eq!(req.header("content-type"), Some(FORM_URLENCODED));

        let body = req.body.unwrap();
        let decoded: HashMap<String, String> = form_urlencoded::parse(&body).into_owned().collect();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded["k"], "v");
        assert_eq!(decoded["emoji"], "Http Request POST 😄");
        assert_eq!(decoded["a&b"], "c=d");
    }

    #[test]
    fn test_multipart_body() {
        let config = RequestConfig::new()
            .method(Method::POST)
            .param("title", "hello")
            .part(MultipartPart::file("file", "Hello.txt", "text/plain", "re"));
        let req = Request::configure("https://example.test/upload", config).unwrap();

        let ct = req.header("content-type").unwrap().to_string();
        let boundary = ct.split("boundary=").nth(1).unwrap();
        let sections = sections(req.body.as_ref().unwrap(), boundary);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].1, b"re");
    }

    #[test]
    fn test_multipart_keeps_content_type_without_defaults() {
        let config = RequestConfig::new()
            .method(Method::PUT)
            .use_default_headers(false)
            .part(MultipartPart::new("f", "x"));
        let req = Request::configure("https://example.test/upload", config).unwrap();
        assert!(req
            .header("content-type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
        assert!(req.header("user-agent").is_none());
    }

    #[test]
    fn test_default_headers() {
        let req = Request::get("https://example.test/").unwrap();
        assert_eq!(req.header("accept"), Some("*/*"));
        assert_eq!(req.header("user-agent"), Some(DEFAULT_USER_AGENT));

        let bare = Request::configure(
            "https://example.test/",
            RequestConfig::new().use_default_headers(false),
        )
        .unwrap();
        assert!(bare.headers.is_empty());
    }

    #[test]
    fn test_user_headers_override_defaults() {
        let config = RequestConfig::new()
            .header("Accept", "application/json")
            .header("X-Custom", "1");
        let req = Request::configure("https://example.test/", config).unwrap();
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.headers.get_all("accept").iter().count(), 1);
        assert_eq!(req.header("x-custom"), Some("1"));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = RequestConfig::new().header("bad header", "v");
        let err = Request::configure("https://example.test/", config).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn test_basic_auth() {
        let config = RequestConfig::new().basic_auth("user", "password");
        let req = Request::configure("https://example.test/", config).unwrap();
        assert_eq!(req.header("authorization"), Some("Basic dXNlcjpwYXNzd29yZA=="));
    }

    #[test]
    fn test_capture_flag_carried() {
        let req = Request::configure(
            "https://example.test/",
            RequestConfig::new().capture_cookie(true),
        )
        .unwrap();
        assert!(req.capture_cookie);
        assert!(req.use_default_headers);
    }
}
