// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transport lifecycle events and the callbacks they drive
//!
//! Each in-flight request owns one unbounded channel of [`TransportEvent`]s.
//! The transport task is the only producer and emits exactly one terminal
//! event (`Completed` or `Cancelled`) as its last message.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use super::response::{Completion, HttpResponse};
use crate::error::Error;

/// Called zero or more times with transfer progress
pub type ProgressCallback = Box<dyn FnMut(Progress) + Send>;
/// Called exactly once when a request finishes
pub type CompletionCallback = Box<dyn FnOnce(Completion) + Send>;
/// Called with the temporary file of a finished download.
///
/// The file is deleted as soon as the callback returns.
pub type DownloadCallback = Box<dyn FnOnce(&Path) + Send>;
/// Called with the resume token of a cancelled download
pub type ResumeDataCallback = Box<dyn FnOnce(Option<Bytes>) + Send>;

/// Byte counts reported by progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes moved by this event
    pub bytes_this_event: u64,
    /// Bytes moved so far
    pub total_bytes: u64,
    /// Bytes expected in total, when the transport knows
    pub total_expected: Option<u64>,
}

impl Progress {
    pub(crate) fn new(bytes_this_event: u64, total_bytes: u64, total_expected: Option<u64>) -> Self {
        Self {
            bytes_this_event,
            total_bytes,
            total_expected,
        }
    }

    /// Completed fraction in `0.0..=1.0`, when the total is known
    pub fn fraction(&self) -> Option<f64> {
        match self.total_expected {
            Some(0) => Some(1.0),
            Some(total) => Some((self.total_bytes as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Reactor's answer to a received response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDisposition {
    /// Keep receiving the body
    Allow,
    /// Stop the transfer
    Cancel,
}

/// One lifecycle signal from the transport
pub(crate) enum TransportEvent {
    /// Outbound body progress
    UploadProgress(Progress),
    /// Status and headers arrived. The transport waits on `reply` before
    /// reading the body.
    ResponseReceived {
        response: HttpResponse,
        reply: oneshot::Sender<ResponseDisposition>,
    },
    /// A body chunk, in arrival order
    DataReceived(Bytes),
    /// Bytes written to the download file
    DownloadProgress(Progress),
    /// Download file is complete and readable
    DownloadFinished { path: PathBuf },
    /// Terminal: the exchange finished, with or without error
    Completed { error: Option<Error> },
    /// Terminal: the exchange was cancelled by the caller
    Cancelled {
        resume_data: Option<Bytes>,
        on_resume_data: Option<ResumeDataCallback>,
    },
}

impl TransportEvent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            TransportEvent::UploadProgress(_) => "upload_progress",
            TransportEvent::ResponseReceived { .. } => "response_received",
            TransportEvent::DataReceived(_) => "data_received",
            TransportEvent::DownloadProgress(_) => "download_progress",
            TransportEvent::DownloadFinished { .. } => "download_finished",
            TransportEvent::Completed { .. } => "completed",
            TransportEvent::Cancelled { .. } => "cancelled",
        }
    }

    /// Whether this event ends the exchange
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransportEvent::Completed { .. } | TransportEvent::Cancelled { .. }
        )
    }
}

/// Cancellation message sent from the session to the transport
pub(crate) struct CancelRequest {
    /// Present when the caller wants a resume token instead of a completion
    pub on_resume_data: Option<ResumeDataCallback>,
}

pub(crate) type EventSender = mpsc::UnboundedSender<TransportEvent>;
pub(crate) type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

pub(crate) fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
