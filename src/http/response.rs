// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Response metadata and completion values

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

use super::headers::{CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE};
use crate::error::{Error, Result};

/// Status line and headers of a response, without the body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL (after redirects)
    pub url: Url,
    /// Response status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
}

impl HttpResponse {
    /// Create new response metadata
    pub fn new(url: Url, status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            url,
            status,
            headers,
        }
    }

    pub(crate) fn from_reqwest(response: &reqwest::Response) -> Self {
        Self::new(
            response.url().clone(),
            response.status(),
            response.headers().clone(),
        )
    }

    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get status code as u16
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get all values for a header
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Get content type
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    /// Get content length
    pub fn content_length(&self) -> Option<u64> {
        self.header(CONTENT_LENGTH).and_then(|v| v.parse().ok())
    }

    /// Get Set-Cookie headers
    pub fn set_cookies(&self) -> Vec<&str> {
        self.header_all(SET_COOKIE)
    }
}

/// Everything a completion callback receives.
///
/// On success `error` is `None` and `body` holds the bytes received, in
/// arrival order. On failure or cancellation any partially received bytes
/// are discarded: `body` is `None`, while `response` is kept when the
/// transport got as far as the status line. Download completions never carry
/// a body; the file went to the download callback instead.
#[derive(Debug, Default)]
pub struct Completion {
    /// Accumulated response body
    pub body: Option<Bytes>,
    /// Response metadata, if a response arrived
    pub response: Option<HttpResponse>,
    /// Failure, if any
    pub error: Option<Error>,
}

impl Completion {
    pub(crate) fn success(body: Option<Bytes>, response: Option<HttpResponse>) -> Self {
        Self {
            body,
            response,
            error: None,
        }
    }

    pub(crate) fn failure(response: Option<HttpResponse>, error: Error) -> Self {
        Self {
            body: None,
            response,
            error: Some(error),
        }
    }

    /// Check whether the request finished without error
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Body as text, lossy conversion
    pub fn text_lossy(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| Error::Decoding("no body received".to_string()))?;
        serde_json::from_slice(body).map_err(|e| Error::Decoding(e.to_string()))
    }

    /// Split into the error or the (body, response) pair
    pub fn into_result(self) -> Result<(Bytes, Option<HttpResponse>)> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.body.unwrap_or_default(), self.response)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn meta(status: StatusCode) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("content-length", HeaderValue::from_static("13"));
        HttpResponse::new(Url::parse("https://example.test/").unwrap(), status, headers)
    }

    #[test]
    fn test_response_metadata() {
        let resp = meta(StatusCode::OK);
        assert!(resp.is_success());
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.content_type(), Some("application/json"));
        assert_eq!(resp.content_length(), Some(13));
        assert!(resp.set_cookies().is_empty());
    }

    #[test]
    fn test_completion_json() {
        let completion = Completion::success(
            Some(Bytes::from_static(br#"{"ok":true}"#)),
            Some(meta(StatusCode::OK)),
        );
        let value: serde_json::Value = completion.json().unwrap();
        assert_eq!(value["ok"], true);
        assert!(completion.is_ok());
    }

    #[test]
    fn test_failure_discards_body() {
        let completion = Completion::failure(Some(meta(StatusCode::OK)), Error::Cancelled);
        assert!(completion.body.is_none());
        assert!(completion.response.is_some());
        assert!(completion.into_result().unwrap_err().is_cancelled());
    }
}
