// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for httpsession
//!
//! Configuration problems (bad URL, bad header) are returned synchronously.
//! Everything that happens on the wire is delivered through the completion
//! callback's error slot instead.

use thiserror::Error;

/// Result type alias for httpsession operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for httpsession
#[derive(Error, Debug)]
pub enum Error {
    /// URL could not be parsed
    #[error("Malformed URL: {0}")]
    MalformedUrl(#[from] url::ParseError),

    /// Header name or value rejected
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Transport failure (DNS, connect, TLS, I/O on the wire)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body could not be decoded
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Request was cancelled by the caller
    #[error("Request cancelled")]
    Cancelled,

    /// A send was attempted before `configure`
    #[error("No request configured")]
    NotConfigured,

    /// A send was attempted while another request is still running
    #[error("A request is already in flight")]
    InFlight,

    /// Resume token could not be decoded or no longer applies
    #[error("Invalid resume data: {0}")]
    InvalidResumeData(String),

    /// I/O error (temporary download files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid header error
    pub fn invalid_header<S: Into<String>>(msg: S) -> Self {
        Error::InvalidHeader(msg.into())
    }

    /// Create an invalid resume data error
    pub fn invalid_resume_data<S: Into<String>>(msg: S) -> Self {
        Error::InvalidResumeData(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this error reports a user-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Check if this error came from the transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Check if this is a transport timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Get the URL involved, if the transport reported one
    pub fn url(&self) -> Option<&url::Url> {
        match self {
            Error::Transport(e) => e.url(),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add operation context to error
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<Error>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            Error::Other(format!("{}: {}", msg, err))
        })
    }
}
