// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # httpsession - Callback-driven HTTP sessions
//!
//! A thin convenience layer over `reqwest`: configure a request with a
//! builder, send it, and get told about it through callbacks.
//!
//! ## Features
//!
//! - Builder-style requests: query/form parameters, multipart uploads,
//!   basic auth, default headers with caller overrides
//! - Completion callbacks that fire exactly once per send
//! - Upload and download progress reporting
//! - Downloads to temporary files, with cancel-and-resume tokens
//! - Cookie capture into a shared, thread-safe cookie store
//!
//! Connection reuse, TLS, redirects and timeouts are all left to the
//! transport.
//!
//! ## Example
//!
//! ```rust,no_run
//! use httpsession::{Method, RequestConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::new()?;
//!     let config = RequestConfig::new().method(Method::POST).param("k", "v");
//!
//!     session
//!         .configure("https://example.test/post", config)?
//!         .send_for_result(|completion| match completion.error {
//!             None => println!("{}", completion.text_lossy().unwrap_or_default()),
//!             Some(e) => eprintln!("failed: {}", e),
//!         })?
//!         .join()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;

// Errors
pub use error::{Error, ErrorContext, Result};

// Requests
pub use http::{configure, MultipartPart, Request, RequestConfig};

// Sessions
pub use http::{Completion, HttpResponse, Progress, Session, SessionConfig, TaskHandle};
pub use http::{CompletionCallback, DownloadCallback, ProgressCallback, ResumeDataCallback};

// Cookies
pub use http::{Cookie, CookieStore, SameSite};

pub use reqwest::{Method, StatusCode};

/// httpsession version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
