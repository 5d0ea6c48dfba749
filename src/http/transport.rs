// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transport driver: runs one reqwest exchange and reports it as events

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use super::event::{CancelRequest, EventSender, Progress, ResponseDisposition, TransportEvent};
use super::headers::{CONTENT_LENGTH, COOKIE, ETAG, IF_RANGE, LAST_MODIFIED, RANGE};
use super::request::Request;
use super::response::HttpResponse;
use crate::error::{Error, ErrorContext, Result};

static DOWNLOAD_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A plain request/response exchange
pub(crate) struct DataTask {
    pub client: Client,
    pub request: Request,
    pub cookie_header: Option<String>,
    /// Stream the body in chunks of this size and report upload progress
    pub upload_chunk_size: Option<usize>,
}

/// A download into a temporary file
pub(crate) struct DownloadTask {
    pub client: Client,
    pub source: DownloadSource,
    pub cookie_header: Option<String>,
    pub download_dir: PathBuf,
}

pub(crate) enum DownloadSource {
    Fresh(Request),
    Resume(ResumeState),
}

/// Decoded resume token.
///
/// Serialized as JSON; callers only ever see the opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ResumeState {
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub path: PathBuf,
    pub offset: u64,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl ResumeState {
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::invalid_resume_data(e.to_string()))
    }

    /// Validator for If-Range; a strong ETag is preferred over a date.
    fn validator(&self) -> Option<&str> {
        self.etag
            .as_deref()
            .filter(|etag| !etag.starts_with("W/"))
            .or(self.last_modified.as_deref())
    }
}

/// Outcome of racing an exchange against a cancellation request
enum Outcome<T> {
    Finished(Result<T>),
    Cancelled(CancelRequest),
}

/// Race `exchange` against `cancel`. A dropped cancel sender only means
/// nobody can cancel any more; the exchange keeps running.
///
/// Once the exchange finishes the cancel channel is closed, so any request
/// the session managed to send wins and every later one is refused.
async fn race<F, T>(exchange: F, mut cancel: oneshot::Receiver<CancelRequest>) -> Outcome<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    tokio::pin!(exchange);
    let mut cancel_open = true;
    loop {
        tokio::select! {
            biased;
            result = &mut exchange => {
                if cancel_open {
                    cancel.close();
                    if let Ok(request) = cancel.try_recv() {
                        return Outcome::Cancelled(request);
                    }
                }
                return Outcome::Finished(result);
            }
            request = &mut cancel, if cancel_open => match request {
                Ok(request) => return Outcome::Cancelled(request),
                Err(_) => cancel_open = false,
            },
        }
    }
}

/// Run a data task to its single terminal event.
pub(crate) async fn run_data_task(
    task: DataTask,
    events: EventSender,
    cancel: oneshot::Receiver<CancelRequest>,
) {
    let outcome = race(data_exchange(&task, &events), cancel).await;
    let terminal = match outcome {
        Outcome::Finished(result) => {
            if let Err(ref e) = result {
                warn!(url = %task.request.url, error = %e, "Request failed");
            }
            TransportEvent::Completed {
                error: result.err(),
            }
        }
        Outcome::Cancelled(request) => {
            debug!(url = %task.request.url, "Request cancelled");
            TransportEvent::Cancelled {
                resume_data: None,
                on_resume_data: request.on_resume_data,
            }
        }
    };
    let _ = events.send(terminal);
}

async fn data_exchange(task: &DataTask, events: &EventSender) -> Result<()> {
    let request = &task.request;
    let mut builder = task
        .client
        .request(request.method.clone(), request.url.clone())
        .headers(request.headers.clone());

    if let Some(ref cookie) = task.cookie_header {
        builder = builder.header(COOKIE, cookie.as_str());
    }

    if let Some(ref body) = request.body {
        builder = match task.upload_chunk_size {
            Some(chunk_size) => builder
                .header(CONTENT_LENGTH, body.len())
                .body(upload_body(body.clone(), chunk_size, events.clone())),
            None => builder.body(body.clone()),
        };
    }

    let mut response = builder.send().await?;
    if !deliver_response(events, HttpResponse::from_reqwest(&response)).await {
        return Err(Error::Cancelled);
    }

    while let Some(chunk) = response.chunk().await? {
        if events.send(TransportEvent::DataReceived(chunk)).is_err() {
            return Err(Error::Cancelled);
        }
    }

    Ok(())
}

/// Body stream that reports each chunk as the transport pulls it.
fn upload_body(body: Bytes, chunk_size: usize, events: EventSender) -> reqwest::Body {
    let total = body.len() as u64;
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..body.len())
        .step_by(chunk_size)
        .map(|start| body.slice(start..(start + chunk_size).min(body.len())))
        .collect();

    let mut sent = 0u64;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        let len = chunk.len() as u64;
        sent += len;
        let _ = events.send(TransportEvent::UploadProgress(Progress::new(
            len,
            sent,
            Some(total),
        )));
        Ok::<Bytes, std::io::Error>(chunk)
    });

    reqwest::Body::wrap_stream(stream)
}

/// Hand response metadata to the reactor and wait for its go-ahead.
async fn deliver_response(events: &EventSender, response: HttpResponse) -> bool {
    let (reply, disposition) = oneshot::channel();
    if events
        .send(TransportEvent::ResponseReceived { response, reply })
        .is_err()
    {
        return false;
    }
    matches!(disposition.await, Ok(ResponseDisposition::Allow))
}

/// What the download has produced so far; survives cancellation.
#[derive(Debug, Default)]
struct DownloadState {
    url: Option<Url>,
    headers: Vec<(String, String)>,
    path: Option<PathBuf>,
    written: u64,
    etag: Option<String>,
    last_modified: Option<String>,
    /// Response was a success and the file holds a usable prefix
    resumable: bool,
}

impl DownloadState {
    /// Starting point of a task. A resumed download stays resumable from its
    /// token's offset until the server answers.
    fn start(task: &DownloadTask) -> Self {
        match task.source {
            DownloadSource::Fresh(ref request) => Self {
                url: Some(request.url.clone()),
                headers: header_pairs(&request.headers),
                path: Some(temp_download_path(&task.download_dir)),
                ..Self::default()
            },
            DownloadSource::Resume(ref resume) => Self {
                url: Some(resume.url.clone()),
                headers: resume.headers.clone(),
                path: Some(resume.path.clone()),
                written: resume.offset,
                etag: resume.etag.clone(),
                last_modified: resume.last_modified.clone(),
                resumable: true,
            },
        }
    }

    fn resume_state(&self) -> Option<ResumeState> {
        if !self.resumable {
            return None;
        }
        Some(ResumeState {
            url: self.url.clone()?,
            headers: self.headers.clone(),
            path: self.path.clone()?,
            offset: self.written,
            etag: self.etag.clone(),
            last_modified: self.last_modified.clone(),
        })
    }
}

/// Run a download task to its single terminal event.
pub(crate) async fn run_download_task(
    task: DownloadTask,
    events: EventSender,
    cancel: oneshot::Receiver<CancelRequest>,
) {
    let mut state = DownloadState::start(&task);
    let outcome = race(download_exchange(&task, &events, &mut state), cancel).await;

    let terminal = match outcome {
        Outcome::Finished(Ok(path)) => {
            let _ = events.send(TransportEvent::DownloadFinished { path });
            TransportEvent::Completed { error: None }
        }
        Outcome::Finished(Err(e)) => {
            warn!(error = %e, "Download failed");
            discard_partial(&state).await;
            TransportEvent::Completed { error: Some(e) }
        }
        Outcome::Cancelled(request) => {
            let resume_data = if request.on_resume_data.is_some() {
                state.resume_state().and_then(|s| s.encode().ok())
            } else {
                None
            };
            if resume_data.is_none() {
                discard_partial(&state).await;
            }
            debug!(
                written = state.written,
                resumable = resume_data.is_some(),
                "Download cancelled"
            );
            TransportEvent::Cancelled {
                resume_data,
                on_resume_data: request.on_resume_data,
            }
        }
    };
    let _ = events.send(terminal);
}

async fn discard_partial(state: &DownloadState) {
    if let Some(ref path) = state.path {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove partial download");
            }
        }
    }
}

async fn download_exchange(
    task: &DownloadTask,
    events: &EventSender,
    state: &mut DownloadState,
) -> Result<PathBuf> {
    let mut builder = match task.source {
        DownloadSource::Fresh(ref request) => {
            let mut builder = task
                .client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone());
            if let Some(ref body) = request.body {
                builder = builder.body(body.clone());
            }
            builder
        }
        DownloadSource::Resume(ref resume) => {
            let mut builder = task
                .client
                .request(Method::GET, resume.url.clone())
                .headers(header_map(&resume.headers)?);

            if prepare_partial(&resume.path, resume.offset).await? {
                builder = builder.header(RANGE, format!("bytes={}-", resume.offset));
                if let Some(validator) = resume.validator() {
                    builder = builder.header(IF_RANGE, validator);
                }
            } else {
                state.written = 0;
            }
            builder
        }
    };

    if let Some(ref cookie) = task.cookie_header {
        builder = builder.header(COOKIE, cookie.as_str());
    }

    let mut response = builder.send().await?;
    let meta = HttpResponse::from_reqwest(&response);
    let status = meta.status;

    // Anything but 206 means the server sent the whole entity again.
    let append = status == StatusCode::PARTIAL_CONTENT && state.written > 0;
    if !append {
        state.written = 0;
    }
    if status.is_success() {
        state.etag = meta.header(ETAG).map(str::to_string).or(state.etag.take());
        state.last_modified = meta
            .header(LAST_MODIFIED)
            .map(str::to_string)
            .or(state.last_modified.take());
    }
    let total_expected = response.content_length().map(|len| len + state.written);
    state.resumable = status.is_success();

    if !deliver_response(events, meta).await {
        return Err(Error::Cancelled);
    }

    let path = state
        .path
        .clone()
        .ok_or_else(|| Error::other("download path missing"))?;
    let mut file = open_download_file(&path, append)
        .await
        .context("opening download file")?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        // Progress only counts bytes that reached the file. Bytes that land
        // after a cancel are trimmed by the next resume.
        file.flush().await?;
        let len = chunk.len() as u64;
        state.written += len;
        let progress = Progress::new(len, state.written, total_expected);
        if events.send(TransportEvent::DownloadProgress(progress)).is_err() {
            return Err(Error::Cancelled);
        }
    }
    file.flush().await?;
    drop(file);

    debug!(path = %path.display(), bytes = state.written, "Download written");
    state.resumable = false;
    Ok(path)
}

/// Trim a partial download to the resume offset. Returns false when the
/// file cannot be continued and the download has to start over.
async fn prepare_partial(path: &Path, offset: u64) -> Result<bool> {
    if offset == 0 {
        return Ok(false);
    }
    let len = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Partial download missing, restarting");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };
    if len < offset {
        debug!(path = %path.display(), len, offset, "Partial download too short, restarting");
        return Ok(false);
    }
    if len > offset {
        debug!(path = %path.display(), len, offset, "Trimming partial download");
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .context("trimming partial download")?;
        file.set_len(offset).await?;
    }
    Ok(true)
}

async fn open_download_file(path: &Path, append: bool) -> std::io::Result<File> {
    if append {
        OpenOptions::new().append(true).open(path).await
    } else {
        File::create(path).await
    }
}

fn temp_download_path(dir: &Path) -> PathBuf {
    let seq = DOWNLOAD_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    dir.join(format!(
        "httpsession-{}-{:x}-{}.download",
        std::process::id(),
        nanos,
        seq
    ))
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn header_map(pairs: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| Error::invalid_resume_data(format!("header {}: {}", name, e)))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| Error::invalid_resume_data(format!("header value: {}", e)))?;
        headers.append(name, value);
    }
    Ok(headers)
}
