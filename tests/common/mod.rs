#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use ndjson_stream::streaming::ByteStream;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

pub fn ndjson_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"));
    headers
}

/// Chunks delivered after the given delay in milliseconds, then end of stream.
pub fn scripted(steps: Vec<(u64, &'static str)>) -> ByteStream {
    Box::pin(stream::unfold(steps.into_iter(), |mut steps| async move {
        let (delay, chunk) = steps.next()?;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Some((Ok(Bytes::from_static(chunk.as_bytes())), steps))
    }))
}

/// Like [`scripted`], but the transport stays open forever afterwards.
pub fn scripted_then_hang(steps: Vec<(u64, &'static str)>) -> ByteStream {
    Box::pin(scripted(steps).chain(stream::pending()))
}

/// A body delivered in one go, split into fixed-size chunks.
pub fn chunked(body: &str, size: usize) -> ByteStream {
    let chunks: Vec<io::Result<Bytes>> = body
        .as_bytes()
        .chunks(size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(stream::iter(chunks))
}

/// Wraps a body and raises a flag when it is dropped.
pub struct Tracked {
    inner: ByteStream,
    dropped: Arc<AtomicBool>,
}

impl Tracked {
    pub fn new(inner: ByteStream) -> (Self, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner,
                dropped: Arc::clone(&dropped),
            },
            dropped,
        )
    }
}

impl Stream for Tracked {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

pub fn is_dropped(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}
