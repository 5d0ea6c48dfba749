// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transport configuration

use std::path::PathBuf;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

use super::DEFAULT_USER_AGENT;
use crate::error::{Error, Result};

/// Default size of the chunks an upload body is streamed in
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// Session configuration
///
/// Everything here is handed to the transport. Timeouts in particular are
/// enforced by `reqwest`, never by the session itself.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// User agent sent by the transport when the request carries none
    pub user_agent: String,
    /// Total request timeout (None = no limit)
    pub timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Proxy URL
    pub proxy: Option<String>,
    /// Directory temporary download files are written to
    pub download_dir: PathBuf,
    /// Chunk size for streamed upload bodies
    pub upload_chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(Duration::from_secs(60)),
            connect_timeout: Duration::from_secs(30),
            max_redirects: 10,
            proxy: None,
            download_dir: std::env::temp_dir(),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

impl SessionConfig {
    /// Create a new session config
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for long-running downloads: no total timeout.
    pub fn background() -> Self {
        Self {
            timeout: None,
            ..Self::default()
        }
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set total timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the total timeout
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set max redirects
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set proxy
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set the directory for temporary download files
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set upload chunk size (clamped to at least one byte)
    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.upload_chunk_size = size.max(1);
        self
    }

    /// Build a transport client from this configuration
    pub(crate) fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .redirect(Policy::limited(self.max_redirects))
            .cookie_store(false); // The session's CookieStore handles cookies

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(ref proxy_url) = self.proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy_url)
                    .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?,
            );
        }

        Ok(builder.build()?)
    }
}
