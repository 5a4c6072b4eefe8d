use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which of the three stream clocks fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// No content-bearing event arrived within the time-to-first-token limit.
    Ttft,
    /// No frame at all arrived within the idle limit.
    Idle,
    /// The stream as a whole ran longer than the total limit.
    Total,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutKind::Ttft => write!(f, "TTFT"),
            TimeoutKind::Idle => write!(f, "idle"),
            TimeoutKind::Total => write!(f, "total"),
        }
    }
}

/// Why a stream was cancelled by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Token,
    /// The caller's absolute deadline passed.
    Deadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Token => write!(f, "cancellation requested"),
            CancelReason::Deadline => write!(f, "caller deadline exceeded"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Unexpected content type: {content_type:?} (expected application/x-ndjson)")]
    UnexpectedContentType { content_type: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid JSON frame at line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} timeout: no progress within {limit:?}")]
    Timeout { kind: TimeoutKind, limit: Duration },

    #[error("Stream cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("Upstream error{}: {message}", .status.map(|s| format!(" {}", s)).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Fieldless discriminant of [`StreamError`], for branching without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Protocol,
    Decode,
    Timeout(TimeoutKind),
    Cancelled,
    Upstream,
    Transport,
    Config,
}

impl StreamError {
    pub fn protocol(message: impl Into<String>) -> Self {
        StreamError::Protocol(message.into())
    }

    pub fn upstream(status: Option<u16>, code: Option<String>, message: impl Into<String>) -> Self {
        StreamError::Upstream {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::UnexpectedContentType { .. } | StreamError::Protocol(_) => {
                ErrorKind::Protocol
            }
            StreamError::Decode { .. } => ErrorKind::Decode,
            StreamError::Timeout { kind, .. } => ErrorKind::Timeout(*kind),
            StreamError::Cancelled(_) => ErrorKind::Cancelled,
            StreamError::Upstream { .. } => ErrorKind::Upstream,
            StreamError::Transport(_) => ErrorKind::Transport,
            StreamError::Config(_) => ErrorKind::Config,
        }
    }

    /// The clock that fired, if this is a timeout.
    pub fn timeout_kind(&self) -> Option<TimeoutKind> {
        match self {
            StreamError::Timeout { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
