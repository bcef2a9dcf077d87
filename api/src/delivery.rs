/// Streaming produced files to the client as attachments.
///
/// The temp file guard travels inside the response body, so the file is
/// deleted when the body is dropped: after the last chunk, after a read
/// error, or when the client goes away mid-transfer.
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use futures_util::stream::Stream;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use tubeclip_shared::temp_storage::TempFile;

/// Body stream that owns the file it reads from.
pub struct CleanupStream<S> {
    // Declared before `guard` so the reader is closed before deletion.
    inner: S,
    guard: TempFile,
    sent: u64,
    finished: bool,
}

impl<S> CleanupStream<S> {
    pub fn new(inner: S, guard: TempFile) -> Self {
        Self {
            inner,
            guard,
            sent: 0,
            finished: false,
        }
    }
}

impl<S> Stream for CleanupStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = Pin::new(&mut self.inner).poll_next(cx);
        match &poll {
            Poll::Ready(Some(Ok(chunk))) => self.sent += chunk.len() as u64,
            Poll::Ready(Some(Err(e))) => {
                warn!("Error sending file {}: {}", self.guard.path().display(), e);
                self.finished = true;
            }
            Poll::Ready(None) => {
                debug!("Sent {} ({} bytes)", self.guard.path().display(), self.sent);
                self.finished = true;
            }
            Poll::Pending => {}
        }
        poll
    }
}

impl<S> Drop for CleanupStream<S> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                "Client went away after {} bytes of {}",
                self.sent,
                self.guard.path().display()
            );
        }
    }
}

/// Stream `file` as a download named `download_name`.
pub async fn attachment(file: TempFile, download_name: &str, content_type: &'static str) -> io::Result<Response> {
    let handle = tokio::fs::File::open(file.path()).await?;
    let len = handle.metadata().await?.len();

    let body = Body::from_stream(CleanupStream::new(ReaderStream::new(handle), file));
    let mut response = body.into_response();

    let disposition = format!("attachment; filename=\"{}\"", download_name.replace('"', "_"));
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response)
}
