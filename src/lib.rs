//! # NDJSON Stream
//!
//! A timeout-bounded engine for NDJSON event streams produced by text-generation
//! endpoints.
//!
//! ## Overview
//!
//! The crate turns an `application/x-ndjson` response body into typed
//! [`StreamEvent`]s:
//! - **Decoding** - frames are split on newlines regardless of how the transport
//!   chunks the bytes
//! - **Timeouts** - time-to-first-token, idle and total clocks bound every pull
//! - **Reconstruction** - tool-call arguments arriving in fragments are reassembled
//! - **Aggregation** - a whole [`Response`] plus [`StreamMetrics`] in one call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ndjson_stream::{EventStream, StreamConfig, StreamOptions};
//!
//! # async fn run() -> ndjson_stream::Result<()> {
//! let config = StreamConfig::from_env()?;
//!
//! let http = reqwest::Client::new();
//! let response = http
//!     .post("https://llm.example.com/v1/stream")
//!     .send()
//!     .await
//!     .map_err(std::io::Error::other)?;
//!
//! let mut events = EventStream::from_response(response, StreamOptions::new(config)).await?;
//! while let Some(event) = events.recv().await? {
//!     if let Some(text) = event.text_delta() {
//!         print!("{}", text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Stream configuration and per-stream options
//! - [`error`] - Error types and handling
//! - [`models`] - Events, wire frames and aggregated responses
//! - [`streaming`] - Decoder, normalizer, accumulator and the event stream itself
//! - [`metrics`] - Process-wide stream counters

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod streaming;

pub use config::{StreamConfig, StreamOptions, TimeoutConfig};
pub use error::{CancelReason, ErrorKind, Result, StreamError, TimeoutKind};
pub use models::{
    EventKind, FunctionCall, Response, StreamEvent, StreamMetrics, ToolCall, ToolCallDelta, Usage,
};
pub use streaming::EventStream;
