// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP session layer
//!
//! Request building, cookie capture and the callback-driven session manager.
//! All networking is delegated to `reqwest`.

mod config;
mod cookie;
mod event;
mod multipart;
mod request;
mod response;
mod session;
mod transport;

pub use config::{SessionConfig, DEFAULT_UPLOAD_CHUNK_SIZE};
pub use cookie::{Cookie, CookieStore, SameSite};
pub use event::{
    CompletionCallback, DownloadCallback, Progress, ProgressCallback, ResponseDisposition,
    ResumeDataCallback,
};
pub use multipart::MultipartPart;
pub use request::{Request, RequestConfig};
pub use response::{Completion, HttpResponse};
pub use session::{configure, Session, TaskHandle};

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str = concat!("httpsession/", env!("CARGO_PKG_VERSION"));

/// Default Accept header value
pub const DEFAULT_ACCEPT: &str = "*/*";

/// Default Accept-Language header value
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Common HTTP headers
pub mod headers {
    pub const ACCEPT: &str = "accept";
    pub const ACCEPT_LANGUAGE: &str = "accept-language";
    pub const AUTHORIZATION: &str = "authorization";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const COOKIE: &str = "cookie";
    pub const ETAG: &str = "etag";
    pub const IF_RANGE: &str = "if-range";
    pub const LAST_MODIFIED: &str = "last-modified";
    pub const RANGE: &str = "range";
    pub const SET_COOKIE: &str = "set-cookie";
    pub const USER_AGENT: &str = "user-agent";
}

/// Content types produced by the request builder
pub mod content_types {
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}
