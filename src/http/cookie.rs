// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cookie store fed by captured responses

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::response::HttpResponse;

lazy_static! {
    static ref SHARED_STORE: CookieStore = CookieStore::new();
}

/// A single HTTP cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain the cookie belongs to
    pub domain: String,
    /// Path the cookie is valid for
    pub path: String,
    /// Expiration time (None = session cookie)
    pub expires: Option<DateTime<Utc>>,
    /// Secure flag (HTTPS only)
    pub secure: bool,
    /// HttpOnly flag
    pub http_only: bool,
    /// SameSite attribute
    pub same_site: SameSite,
}

/// SameSite cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SameSite {
    #[default]
    None,
    Lax,
    Strict,
}

impl Cookie {
    /// Create a new cookie
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
            expires: None,
            secure: false,
            http_only: false,
            same_site: SameSite::default(),
        }
    }

    /// Set the domain
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set secure flag
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set expiration time
    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Check if the cookie is expired
    pub fn is_expired(&self) -> bool {
        self.expires.map_or(false, |exp| exp < Utc::now())
    }

    /// Check if the cookie applies to the given URL
    pub fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("");
        if !self.domain_matches(host) {
            return false;
        }

        if !path_matches(&self.path, url.path()) {
            return false;
        }

        if self.secure && url.scheme() != "https" {
            return false;
        }

        !self.is_expired()
    }

    fn domain_matches(&self, host: &str) -> bool {
        if self.domain.is_empty() {
            return true;
        }

        let domain = self.domain.trim_start_matches('.');
        host.eq_ignore_ascii_case(domain) || host.ends_with(&format!(".{}", domain))
    }

    /// Parse a Set-Cookie header value received from `url`
    pub fn parse(header: &str, url: &Url) -> Option<Self> {
        let mut parts = header.split(';');
        let first = parts.next()?.trim();

        let (name, value) = first.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut cookie = Cookie::new(name, value.trim().trim_matches('"'));

        let host = url.host_str().unwrap_or("");
        cookie.domain = host.to_string();
        cookie.path = default_path(url);

        for part in parts {
            let part = part.trim();
            if let Some((attr, val)) = part.split_once('=') {
                let attr = attr.trim().to_lowercase();
                let val = val.trim();
                match attr.as_str() {
                    "domain" if !val.is_empty() => {
                        cookie.domain = val.trim_start_matches('.').to_lowercase()
                    }
                    "path" if val.starts_with('/') => cookie.path = val.to_string(),
                    "expires" => {
                        // Max-Age wins over Expires when both are present
                        if cookie.expires.is_none() {
                            if let Ok(dt) = DateTime::parse_from_rfc2822(val) {
                                cookie.expires = Some(dt.with_timezone(&Utc));
                            }
                        }
                    }
                    "max-age" => {
                        if let Ok(secs) = val.parse::<i64>() {
                            cookie.expires = Some(if secs <= 0 {
                                DateTime::<Utc>::MIN_UTC
                            } else {
                                Utc::now() + chrono::Duration::seconds(secs)
                            });
                        }
                    }
                    "samesite" => {
                        cookie.same_site = match val.to_lowercase().as_str() {
                            "strict" => SameSite::Strict,
                            "lax" => SameSite::Lax,
                            _ => SameSite::None,
                        };
                    }
                    _ => {}
                }
            } else {
                match part.to_lowercase().as_str() {
                    "secure" => cookie.secure = true,
                    "httponly" => cookie.http_only = true,
                    _ => {}
                }
            }
        }

        // A Domain attribute may only widen the cookie to a parent of the host
        if !cookie.domain_matches(host) {
            tracing::debug!(host, domain = %cookie.domain, "Rejecting cookie for foreign domain");
            return None;
        }

        Some(cookie)
    }

    /// Convert to cookie header format
    pub fn to_header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Directory of the request path, per RFC 6265 5.1.4
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == request_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Thread-safe cookie storage shared between sessions.
///
/// Cloning yields another handle to the same store. Whole-response writes
/// are serialized so two sessions capturing at once never interleave.
#[derive(Debug, Clone)]
pub struct CookieStore {
    /// Cookies stored by domain
    cookies: Arc<DashMap<String, Vec<Cookie>>>,
    write_lock: Arc<Mutex<()>>,
}

impl Default for CookieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            cookies: Arc::new(DashMap::new()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Handle to the process-wide store
    pub fn shared() -> Self {
        SHARED_STORE.clone()
    }

    /// Capture every Set-Cookie header of a response.
    ///
    /// Responses without cookies and unparsable cookies are ignored.
    pub fn set(&self, response: &HttpResponse) {
        let set_cookies = response.set_cookies();
        if set_cookies.is_empty() {
            return;
        }

        let _guard = self.write_lock.lock();
        let mut stored = 0usize;
        for header in set_cookies {
            if let Some(cookie) = Cookie::parse(header, &response.url) {
                self.merge(cookie);
                stored += 1;
            } else {
                tracing::debug!(header, "Skipping malformed Set-Cookie");
            }
        }
        tracing::debug!(url = %response.url, stored, "Captured cookies");
    }

    /// Add a cookie, replacing any with the same name and path
    pub fn add(&self, cookie: Cookie) {
        let _guard = self.write_lock.lock();
        self.merge(cookie);
    }

    fn merge(&self, cookie: Cookie) {
        let mut slot = self.cookies.entry(cookie.domain.clone()).or_default();
        slot.retain(|c| c.name != cookie.name || c.path != cookie.path);
        // An already-expired cookie is a deletion
        if !cookie.is_expired() {
            slot.push(cookie);
        }
    }

    /// Get all cookies for a URL
    pub fn get(&self, url: &Url) -> Vec<Cookie> {
        self.remove_expired();

        let mut result: Vec<Cookie> = self
            .cookies
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|c| c.matches(url))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        // Longer paths first, per RFC 6265 5.4
        result.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        result
    }

    /// Get Cookie header value for a URL
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.get(url);
        if cookies.is_empty() {
            return None;
        }

        Some(
            cookies
                .iter()
                .map(|c| c.to_header_value())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Remove a specific cookie
    pub fn remove(&self, name: &str, domain: &str, path: &str) {
        let _guard = self.write_lock.lock();
        if let Some(mut cookies) = self.cookies.get_mut(domain) {
            cookies.retain(|c| c.name != name || c.path != path);
        }
    }

    /// Clear all cookies
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.cookies.clear();
    }

    fn remove_expired(&self) {
        let _guard = self.write_lock.lock();
        for mut entry in self.cookies.iter_mut() {
            entry.value_mut().retain(|c| !c.is_expired());
        }
    }

    /// Get total cookie count
    pub fn len(&self) -> usize {
        self.cookies.iter().map(|e| e.value().len()).sum()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export all cookies as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        let all_cookies: Vec<Cookie> = self
            .cookies
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        serde_json::to_string(&all_cookies)
    }

    /// Import cookies from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let cookies: Vec<Cookie> = serde_json::from_str(json)?;
        let store = CookieStore::new();
        for cookie in cookies {
            store.add(cookie);
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::StatusCode;

    fn response_with(url: &str, cookies: &[&str]) -> HttpResponse {
        let mut headers = HeaderMap::new();
        for c in cookies {
            headers.append("set-cookie", HeaderValue::from_str(c).unwrap());
        }
        HttpResponse::new(Url::parse(url).unwrap(), StatusCode::OK, headers)
    }

    #[test]
    fn test_cookie_parsing() {
        let url = Url::parse("https://example.com/path").unwrap();
        let header = "session=abc123; Domain=example.com; Path=/; Secure; HttpOnly";
        let cookie = Cookie::parse(header, &url).unwrap();

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.domain, "example.com");
        assert_eq!(cookie.path, "/");
        assert!(cookie.secure);
        assert!(cookie.http_only);
    }

    #[test]
    fn test_default_path() {
        let url = Url::parse("https://example.com/account/login").unwrap();
        let cookie = Cookie::parse("sid=1", &url).unwrap();
        assert_eq!(cookie.path, "/account");
        assert!(cookie.matches(&Url::parse("https://example.com/account/me").unwrap()));
        assert!(!cookie.matches(&Url::parse("https://example.com/accounts").unwrap()));
    }

    #[test]
    fn test_set_from_response() {
        let store = CookieStore::new();
        let resp = response_with(
            "https://example.test/signIn.json",
            &["sid=abc; Path=/", "theme=dark; Path=/"],
        );
        store.set(&resp);

        assert_eq!(store.len(), 2);
        let url = Url::parse("https://example.test/signIned.json").unwrap();
        let header = store.cookie_header(&url).unwrap();
        assert!(header.contains("sid=abc"));
        assert!(header.contains("theme=dark"));
    }

    #[test]
    fn test_domain_attribute_must_cover_host() {
        let url = Url::parse("https://www.example.test/").unwrap();
        let parent = Cookie::parse("a=1; Domain=example.test", &url).unwrap();
        assert_eq!(parent.domain, "example.test");
        assert!(Cookie::parse("a=1; Domain=.WWW.example.test", &url).is_some());
        assert!(Cookie::parse("a=1; Domain=other.test", &url).is_none());
        assert!(Cookie::parse("a=1; Domain=ample.test", &url).is_none());
        assert!(Cookie::parse("a=1; Domain=sub.www.example.test", &url).is_none());
    }

    #[test]
    fn test_foreign_domain_not_captured() {
        let store = CookieStore::new();
        store.set(&response_with(
            "https://evil.test/",
            &["sid=evil; Domain=victim.test; Path=/", "ok=1; Path=/"],
        ));

        assert_eq!(store.len(), 1);
        assert!(store
            .cookie_header(&Url::parse("https://victim.test/").unwrap())
            .is_none());
        assert_eq!(
            store
                .cookie_header(&Url::parse("https://evil.test/").unwrap())
                .as_deref(),
            Some("ok=1")
        );
    }

    #[test]
    fn test_set_without_cookies_is_noop() {
        let store = CookieStore::new();
        store.set(&response_with("https://example.test/", &[]));
        assert!(store.is_empty());
    }

    #[test]
    fn test_merge_replaces_same_name() {
        let store = CookieStore::new();
        store.set(&response_with("https://example.test/", &["sid=1; Path=/"]));
        store.set(&response_with("https://example.test/", &["sid=2; Path=/"]));
        assert_eq!(store.len(), 1);
        let cookies = store.get(&Url::parse("https://example.test/").unwrap());
        assert_eq!(cookies[0].value, "2");
    }

    #[test]
    fn test_expired_cookie_deletes() {
        let store = CookieStore::new();
        store.set(&response_with("https://example.test/", &["sid=1; Path=/"]));
        store.set(&response_with(
            "https://example.test/",
            &["sid=; Path=/; Max-Age=0"],
        ));
        assert!(store
            .get(&Url::parse("https://example.test/").unwrap())
            .is_empty());
    }

    #[test]
    fn test_secure_cookie_not_sent_over_http() {
        let store = CookieStore::new();
        store.add(Cookie::new("s", "1").domain("example.test").secure(true));
        assert!(store
            .cookie_header(&Url::parse("http://example.test/").unwrap())
            .is_none());
        assert!(store
            .cookie_header(&Url::parse("https://example.test/").unwrap())
            .is_some());
    }

    #[test]
    fn test_json_round_trip() {
        let store = CookieStore::new();
        store.add(Cookie::new("a", "1").domain("example.test"));
        let restored = CookieStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn test_shared_handles_alias() {
        let a = CookieStore::shared();
        let b = CookieStore::shared();
        a.add(Cookie::new("shared_alias_test", "1").domain("shared.alias.test"));
        assert!(b
            .cookie_header(&Url::parse("https://shared.alias.test/").unwrap())
            .is_some());
        b.remove("shared_alias_test", "shared.alias.test", "/");
    }
}
