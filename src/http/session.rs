// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session manager: one request lifecycle at a time, reported through callbacks
//!
//! Every send spawns two tasks: the transport task, which talks to the
//! network, and a reactor, which consumes the transport's events in order
//! and runs the caller's callbacks. Because the reactor is the only place
//! callbacks and buffers are touched, no callback ever runs concurrently
//! with another one of the same send.
//!
//! All sends require a running tokio runtime.

use std::path::Path;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::cookie::CookieStore;
use super::event::{
    self, CancelRequest, CompletionCallback, DownloadCallback, EventReceiver, Progress,
    ProgressCallback, ResponseDisposition, TransportEvent,
};
use super::headers::COOKIE;
use super::request::{Request, RequestConfig};
use super::response::{Completion, HttpResponse};
use super::transport::{self, DataTask, DownloadSource, DownloadTask, ResumeState};
use crate::error::{Error, Result};

/// Which cancellation primitive applies to the running task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Data,
    Download,
}

struct InFlight {
    kind: TaskKind,
    cancel: oneshot::Sender<CancelRequest>,
}

impl InFlight {
    /// The transport drops its receiver after emitting the terminal event.
    fn is_running(&self) -> bool {
        !self.cancel.is_closed()
    }
}

/// Handle to the callbacks of one send
#[derive(Debug)]
pub struct TaskHandle {
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Wait until the last callback of this send has returned
    pub async fn join(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| Error::other(format!("callback task failed: {}", e)))
    }

    /// Check whether the last callback has already run
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Builder-style HTTP session with callback delivery.
///
/// ```no_run
/// use httpsession::{RequestConfig, Session};
///
/// # async fn run() -> httpsession::Result<()> {
/// let mut session = Session::new()?;
/// let handle = session
///     .configure("https://example.test/get", RequestConfig::new())?
///     .send_for_result(|completion| {
///         println!("{:?}", completion.text_lossy());
///     })?;
/// handle.join().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    config: SessionConfig,
    client: Client,
    /// Kept so a resumed download runs on the client that started it
    background_client: Option<Client>,
    cookie_store: CookieStore,
    request: Option<Request>,
    in_flight: Mutex<Option<InFlight>>,
}

impl Session {
    /// Create a session with default configuration and the shared cookie store
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Create a session with custom configuration and the shared cookie store
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        Self::with_cookie_store(config, CookieStore::shared())
    }

    /// Create a session with custom configuration and its own cookie store
    pub fn with_cookie_store(config: SessionConfig, cookie_store: CookieStore) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self {
            config,
            client,
            background_client: None,
            cookie_store,
            request: None,
            in_flight: Mutex::new(None),
        })
    }

    /// The cookie store this session captures into
    pub fn cookie_store(&self) -> &CookieStore {
        &self.cookie_store
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The currently configured request
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// Build the request the next send will issue.
    ///
    /// Replaces any previously configured request. A malformed URL fails here,
    /// before any network activity.
    pub fn configure(&mut self, url: impl AsRef<str>, config: RequestConfig) -> Result<&mut Self> {
        self.request = None;
        self.request = Some(Request::configure(url, config)?);
        Ok(self)
    }

    /// Send the configured request; `on_complete` runs exactly once.
    pub fn send_for_result<C>(&mut self, on_complete: C) -> Result<TaskHandle>
    where
        C: FnOnce(Completion) + Send + 'static,
    {
        self.send(None, Box::new(on_complete), None)
    }

    /// Send the configured request, streaming the body and reporting
    /// outbound progress to `on_progress`.
    pub fn upload<P, C>(&mut self, on_progress: Option<P>, on_complete: C) -> Result<TaskHandle>
    where
        P: FnMut(Progress) + Send + 'static,
        C: FnOnce(Completion) + Send + 'static,
    {
        let chunk_size = on_progress.as_ref().map(|_| self.config.upload_chunk_size);
        let on_progress = on_progress.map(|p| Box::new(p) as ProgressCallback);
        self.send(on_progress, Box::new(on_complete), chunk_size)
    }

    fn send(
        &mut self,
        on_progress: Option<ProgressCallback>,
        on_complete: CompletionCallback,
        upload_chunk_size: Option<usize>,
    ) -> Result<TaskHandle> {
        let request = self.request.clone().ok_or(Error::NotConfigured)?;
        self.ensure_idle()?;
        let cookie_header = self.cookie_header_for(&request);
        let capture_cookie = request.capture_cookie;

        info!(method = %request.method, url = %request.url, "Sending request");

        let (events_tx, events_rx) = event::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = DataTask {
            client: self.client.clone(),
            request,
            cookie_header,
            upload_chunk_size,
        };
        tokio::spawn(transport::run_data_task(task, events_tx, cancel_rx));

        let reactor = Reactor {
            events: events_rx,
            on_progress,
            on_download: None,
            on_complete: Some(on_complete),
            body: BytesMut::new(),
            response: None,
            capture_cookie,
            cookie_store: self.cookie_store.clone(),
            collect_body: true,
        };
        *self.in_flight.lock() = Some(InFlight {
            kind: TaskKind::Data,
            cancel: cancel_tx,
        });

        Ok(TaskHandle {
            handle: tokio::spawn(reactor.run()),
        })
    }

    /// Download into a temporary file.
    ///
    /// Without `resume_data` this issues the configured request on a fresh
    /// background client. With it, the download continues from where the
    /// token says, on the same client when this session started it.
    ///
    /// `on_download` receives the path of the finished file. The file is
    /// deleted once the callback returns, so move or copy it before then.
    pub fn download<P, D, C>(
        &mut self,
        resume_data: Option<Bytes>,
        on_progress: P,
        on_download: D,
        on_complete: C,
    ) -> Result<TaskHandle>
    where
        P: FnMut(Progress) + Send + 'static,
        D: FnOnce(&Path) + Send + 'static,
        C: FnOnce(Completion) + Send + 'static,
    {
        self.ensure_idle()?;
        let (source, client, cookie_header, capture_cookie) = match resume_data {
            None => {
                let request = self.request.clone().ok_or(Error::NotConfigured)?;
                let client = self.config.clone().no_timeout().build_client()?;
                self.background_client = Some(client.clone());
                let cookie_header = self.cookie_header_for(&request);
                let capture_cookie = request.capture_cookie;
                (DownloadSource::Fresh(request), client, cookie_header, capture_cookie)
            }
            Some(data) => {
                let resume = ResumeState::decode(&data)?;
                let client = match self.background_client {
                    Some(ref client) => client.clone(),
                    None => {
                        debug!("No background client to resume on, creating one");
                        let client = self.config.clone().no_timeout().build_client()?;
                        self.background_client = Some(client.clone());
                        client
                    }
                };
                let cookie_header = self.cookie_store.cookie_header(&resume.url);
                (DownloadSource::Resume(resume), client, cookie_header, false)
            }
        };

        match source {
            DownloadSource::Fresh(ref request) => {
                info!(url = %request.url, "Starting download")
            }
            DownloadSource::Resume(ref resume) => {
                info!(url = %resume.url, offset = resume.offset, "Resuming download")
            }
        }

        let (events_tx, events_rx) = event::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = DownloadTask {
            client,
            source,
            cookie_header,
            download_dir: self.config.download_dir.clone(),
        };
        tokio::spawn(transport::run_download_task(task, events_tx, cancel_rx));

        let reactor = Reactor {
            events: events_rx,
            on_progress: Some(Box::new(on_progress)),
            on_download: Some(Box::new(on_download)),
            on_complete: Some(Box::new(on_complete)),
            body: BytesMut::new(),
            response: None,
            capture_cookie,
            cookie_store: self.cookie_store.clone(),
            collect_body: false,
        };
        *self.in_flight.lock() = Some(InFlight {
            kind: TaskKind::Download,
            cancel: cancel_tx,
        });

        Ok(TaskHandle {
            handle: tokio::spawn(reactor.run()),
        })
    }

    /// Cancel the running request or upload.
    ///
    /// Returns true when the cancellation took effect: the completion callback
    /// then fires with [`Error::Cancelled`], even if the exchange finished at
    /// the same moment. Returns false when there was nothing to cancel.
    pub fn cancel(&self) -> bool {
        self.take_in_flight(TaskKind::Data)
            .map_or(false, |flight| {
                flight
                    .cancel
                    .send(CancelRequest {
                        on_resume_data: None,
                    })
                    .is_ok()
            })
    }

    /// Cancel the running download and receive a resume token instead of a
    /// completion.
    ///
    /// When this returns true, `on_resume_data` runs once the transport has
    /// torn the download down, with `None` when the download cannot be
    /// resumed, and the completion callback does not fire. When the download
    /// already finished, neither callback runs and this returns false.
    pub fn cancel_download<F>(&self, on_resume_data: F) -> bool
    where
        F: FnOnce(Option<Bytes>) + Send + 'static,
    {
        self.take_in_flight(TaskKind::Download)
            .map_or(false, |flight| {
                flight
                    .cancel
                    .send(CancelRequest {
                        on_resume_data: Some(Box::new(on_resume_data)),
                    })
                    .is_ok()
            })
    }

    fn ensure_idle(&self) -> Result<()> {
        match *self.in_flight.lock() {
            Some(ref flight) if flight.is_running() => Err(Error::InFlight),
            _ => Ok(()),
        }
    }

    fn take_in_flight(&self, kind: TaskKind) -> Option<InFlight> {
        let mut slot = self.in_flight.lock();
        match slot.as_ref() {
            Some(flight) if flight.kind == kind && flight.is_running() => slot.take(),
            _ => None,
        }
    }

    fn cookie_header_for(&self, request: &Request) -> Option<String> {
        if !request.use_default_headers || request.headers.contains_key(COOKIE) {
            return None;
        }
        self.cookie_store.cookie_header(&request.url)
    }
}

/// Consumes the events of one send and runs its callbacks
struct Reactor {
    events: EventReceiver,
    on_progress: Option<ProgressCallback>,
    on_download: Option<DownloadCallback>,
    on_complete: Option<CompletionCallback>,
    body: BytesMut,
    response: Option<HttpResponse>,
    capture_cookie: bool,
    cookie_store: CookieStore,
    collect_body: bool,
}

impl Reactor {
    async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            debug!(
                event = event.kind(),
                terminal = event.is_terminal(),
                "Transport event"
            );
            match event {
                TransportEvent::UploadProgress(progress)
                | TransportEvent::DownloadProgress(progress) => {
                    if let Some(ref mut on_progress) = self.on_progress {
                        on_progress(progress);
                    }
                }
                TransportEvent::ResponseReceived { response, reply } => {
                    self.response = Some(response);
                    let _ = reply.send(ResponseDisposition::Allow);
                }
                TransportEvent::DataReceived(chunk) => {
                    self.body.extend_from_slice(&chunk);
                }
                TransportEvent::DownloadFinished { path } => {
                    if let Some(on_download) = self.on_download.take() {
                        on_download(&path);
                    }
                    remove_download(&path).await;
                }
                TransportEvent::Completed { error } => {
                    self.complete(error);
                    return;
                }
                TransportEvent::Cancelled {
                    resume_data,
                    on_resume_data,
                } => {
                    match on_resume_data {
                        Some(on_resume_data) => on_resume_data(resume_data),
                        None => self.complete(Some(Error::Cancelled)),
                    }
                    return;
                }
            }
        }

        // Only reachable if the transport task died without a terminal event
        warn!("Transport ended without completing");
        self.complete(Some(Error::other("transport ended unexpectedly")));
    }

    fn complete(&mut self, error: Option<Error>) {
        if self.capture_cookie {
            self.capture_cookie = false;
            if let Some(ref response) = self.response {
                self.cookie_store.set(response);
            }
        }

        let response = self.response.take();
        if let Some(ref r) = response {
            info!(
                url = %r.url,
                status = r.status_code(),
                bytes = self.body.len(),
                error = error.is_some(),
                "Request finished"
            );
        }

        let completion = match error {
            None => {
                let body = self
                    .collect_body
                    .then(|| std::mem::take(&mut self.body).freeze());
                Completion::success(body, response)
            }
            Some(error) => Completion::failure(response, error),
        };

        if let Some(on_complete) = self.on_complete.take() {
            on_complete(completion);
        }
    }
}

async fn remove_download(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary download");
        }
    }
}

/// Shorthand for `Session::new()` followed by `configure`
pub fn configure(url: impl AsRef<str>, config: RequestConfig) -> Result<Session> {
    let mut session = Session::new()?;
    session.configure(url, config)?;
    Ok(session)
}
