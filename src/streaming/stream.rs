use std::future::pending;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::FutureExt;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::HeaderMap;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::StreamOptions;
use crate::error::{CancelReason, Result, StreamError};
use crate::metrics::STREAM_STATS;
use crate::models::{EventKind, RawFrame, StreamEvent};

use super::decoder::FrameDecoder;
use super::guard;
use super::normalizer::EventNormalizer;
use super::timeout::{Deadline, TimeoutSupervisor};

/// Boxed transport body: any source of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Reading from the transport
    Reading,
    /// Transport ended; decoding what is left in the buffer
    Draining,
    /// Terminal: completed, failed or closed
    Done,
}

/// What woke a pending pull.
enum Wake {
    Cancelled(CancelReason),
    Expired(Deadline),
    Chunk(Option<io::Result<Bytes>>),
}

/// A single-consumer stream of typed events read from an NDJSON body.
///
/// Each [`recv`](Self::recv) races the next transport read against the caller's
/// cancellation, the caller's deadline and the stream clocks. Any terminal outcome
/// drops the byte source.
pub struct EventStream {
    id: Uuid,
    request_id: Option<String>,
    source: Option<ByteStream>,
    decoder: FrameDecoder,
    normalizer: EventNormalizer,
    supervisor: TimeoutSupervisor,
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
    phase: Phase,
    message_stopped: bool,
    frames: u64,
    events: u64,
}

impl EventStream {
    /// Validate the response headers and wrap the body.
    ///
    /// Nothing is read from `body` when the content type is rejected.
    pub fn open<S>(headers: &HeaderMap, body: S, options: StreamOptions) -> Result<Self>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let StreamOptions {
            config,
            cancel,
            deadline,
        } = options;
        config.validate()?;
        let header = config.request_id_header_name()?;

        if let Err(e) = guard::validate_content_type(headers) {
            STREAM_STATS.record_failure(e.kind());
            return Err(e);
        }

        let id = Uuid::new_v4();
        let request_id = guard::request_id(headers, &header);
        tracing::info!(
            stream_id = %id,
            request_id = request_id.as_deref().unwrap_or("-"),
            "Opened NDJSON event stream"
        );
        STREAM_STATS.record_open();

        Ok(Self {
            id,
            request_id,
            source: Some(Box::pin(body)),
            decoder: FrameDecoder::with_max_line_bytes(config.max_line_bytes),
            normalizer: EventNormalizer::new(),
            supervisor: TimeoutSupervisor::start(&config.timeouts),
            cancel,
            deadline,
            phase: Phase::Reading,
            message_stopped: false,
            frames: 0,
            events: 0,
        })
    }

    /// Pull the next event.
    ///
    /// `Ok(None)` marks the end of the stream. After an error, or after
    /// [`close`](Self::close), every further pull returns `Ok(None)`.
    pub async fn recv(&mut self) -> Result<Option<StreamEvent>> {
        if self.phase == Phase::Done {
            return Ok(None);
        }

        match self.next_event().await {
            Ok(Some(event)) => {
                self.events += 1;
                STREAM_STATS.record_event();
                if event.kind() == EventKind::MessageStop {
                    self.message_stopped = true;
                }
                Ok(Some(event))
            }
            Ok(None) => {
                self.complete();
                Ok(None)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    async fn next_event(&mut self) -> Result<Option<StreamEvent>> {
        loop {
            if self.phase == Phase::Draining {
                if let Some(frame) = self.decoder.finish()? {
                    return self.process(frame).map(Some);
                }
                return Ok(self.normalizer.flush());
            }

            if let Some(frame) = self.decoder.next_frame()? {
                return self.process(frame).map(Some);
            }

            match self.wait().await {
                Wake::Cancelled(reason) => return Err(StreamError::Cancelled(reason)),
                Wake::Expired(deadline) => return Err(deadline.into_error()),
                Wake::Chunk(Some(Ok(chunk))) => self.decoder.push(&chunk)?,
                Wake::Chunk(Some(Err(e))) => return Err(e.into()),
                Wake::Chunk(None) => {
                    tracing::debug!(
                        stream_id = %self.id,
                        buffered = self.decoder.buffered(),
                        "Transport ended"
                    );
                    self.source = None;
                    self.phase = Phase::Draining;
                }
            }
        }
    }

    async fn wait(&mut self) -> Wake {
        let Some(source) = self.source.as_mut() else {
            return Wake::Chunk(None);
        };
        let now = Instant::now();
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Wake::Cancelled(CancelReason::Token);
        }
        if self.deadline.is_some_and(|at| at <= now) {
            return Wake::Cancelled(CancelReason::Deadline);
        }
        if let Some(total) = self.supervisor.total_deadline()
            && total.at <= now
        {
            return Wake::Expired(total);
        }
        // a chunk the transport already delivered is not a stall
        if let Some(chunk) = source.next().now_or_never() {
            return Wake::Chunk(chunk);
        }

        let clock = self.supervisor.next_deadline();
        tokio::select! {
            biased;
            _ = cancelled(self.cancel.as_ref()) => Wake::Cancelled(CancelReason::Token),
            _ = sleep_until_some(self.deadline) => Wake::Cancelled(CancelReason::Deadline),
            deadline = expire(clock) => Wake::Expired(deadline),
            chunk = source.next() => Wake::Chunk(chunk),
        }
    }

    fn process(&mut self, frame: RawFrame) -> Result<StreamEvent> {
        let now = Instant::now();
        self.frames += 1;
        STREAM_STATS.record_frame();
        self.supervisor.record_frame(now);

        tracing::debug!(
            stream_id = %self.id,
            line = frame.line(),
            frame_type = frame.frame_type().unwrap_or("-"),
            "Decoded frame"
        );

        let event = self.normalizer.normalize(frame)?;
        if event.is_content() {
            self.supervisor.record_content(now);
        }
        Ok(event)
    }

    fn complete(&mut self) {
        self.release();
        STREAM_STATS.record_completion();
        tracing::info!(
            stream_id = %self.id,
            request_id = self.request_id.as_deref().unwrap_or("-"),
            frames = self.frames,
            events = self.events,
            elapsed_ms = self.opened_at().elapsed().as_millis() as u64,
            "Stream completed"
        );
    }

    fn fail(&mut self, error: &StreamError) {
        let line = self.decoder.lines_consumed();
        self.release();
        STREAM_STATS.record_failure(error.kind());
        if error.is_timeout() || error.is_cancelled() {
            tracing::warn!(
                stream_id = %self.id,
                request_id = self.request_id.as_deref().unwrap_or("-"),
                frames = self.frames,
                "Stream aborted: {}",
                error
            );
        } else {
            tracing::error!(
                stream_id = %self.id,
                request_id = self.request_id.as_deref().unwrap_or("-"),
                line,
                "Stream failed: {}",
                error
            );
        }
    }

    fn release(&mut self) {
        self.source = None;
        self.phase = Phase::Done;
        self.decoder.reset();
        self.normalizer.reset();
    }

    /// Finalize tool calls still being assembled, without reading further.
    pub fn flush_pending(&mut self) -> Option<StreamEvent> {
        if self.phase == Phase::Done {
            return None;
        }
        self.normalizer.flush()
    }

    /// Stop reading and drop the byte source. Safe to call more than once.
    pub fn close(&mut self) {
        if self.phase == Phase::Done {
            return;
        }
        if self.message_stopped {
            self.complete();
            return;
        }
        self.release();
        tracing::info!(
            stream_id = %self.id,
            request_id = self.request_id.as_deref().unwrap_or("-"),
            events = self.events,
            "Stream closed before completion"
        );
    }

    /// Adapt the pull API into a [`Stream`] that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<StreamEvent>> + Send {
        stream::unfold(self, |mut events| async move {
            match events.recv().await {
                Ok(Some(event)) => Some((Ok(event), events)),
                Ok(None) => None,
                Err(e) => Some((Err(e), events)),
            }
        })
    }

    /// Local id used to correlate log lines for this stream
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Correlation id echoed by the server, if the header was present
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn opened_at(&self) -> Instant {
        self.supervisor.started_at()
    }

    /// When the first content-bearing event was processed
    pub fn first_content_at(&self) -> Option<Instant> {
        self.supervisor.first_content_at()
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Done
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("id", &self.id)
            .field("request_id", &self.request_id)
            .field("phase", &self.phase)
            .field("frames", &self.frames)
            .field("events", &self.events)
            .finish()
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => pending().await,
    }
}

async fn sleep_until_some(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

async fn expire(deadline: Option<Deadline>) -> Deadline {
    match deadline {
        Some(deadline) => {
            sleep_until(deadline.at).await;
            deadline
        }
        None => pending().await,
    }
}
