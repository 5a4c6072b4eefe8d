use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ErrorKind, TimeoutKind};

/// Counters for stream health across the process
///
/// Thread-safe atomic counters; every stream updates the global instance.
#[derive(Default)]
pub struct StreamStats {
    /// Streams that passed the content-type guard
    pub streams_opened: AtomicU64,

    /// Streams that reached end of stream without error
    pub streams_completed: AtomicU64,

    /// Frames decoded, pings included
    pub frames_decoded: AtomicU64,

    /// Events handed to callers
    pub events_emitted: AtomicU64,

    pub ttft_timeouts: AtomicU64,
    pub idle_timeouts: AtomicU64,
    pub total_timeouts: AtomicU64,

    /// Streams ended by the caller's token or deadline
    pub cancellations: AtomicU64,

    pub decode_errors: AtomicU64,
    pub protocol_errors: AtomicU64,
    pub upstream_errors: AtomicU64,
    pub transport_errors: AtomicU64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_open(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.streams_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the error that ended a stream
    pub fn record_failure(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::Timeout(TimeoutKind::Ttft) => &self.ttft_timeouts,
            ErrorKind::Timeout(TimeoutKind::Idle) => &self.idle_timeouts,
            ErrorKind::Timeout(TimeoutKind::Total) => &self.total_timeouts,
            ErrorKind::Cancelled => &self.cancellations,
            ErrorKind::Decode => &self.decode_errors,
            ErrorKind::Protocol | ErrorKind::Config => &self.protocol_errors,
            ErrorKind::Upstream => &self.upstream_errors,
            ErrorKind::Transport => &self.transport_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Streams that ended with any error
    pub fn failures(&self) -> u64 {
        [
            &self.ttft_timeouts,
            &self.idle_timeouts,
            &self.total_timeouts,
            &self.cancellations,
            &self.decode_errors,
            &self.protocol_errors,
            &self.upstream_errors,
            &self.transport_errors,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum()
    }

    /// Get completion rate as percentage of finished streams
    pub fn success_rate(&self) -> f64 {
        let completed = self.streams_completed.load(Ordering::Relaxed);
        let finished = completed + self.failures();
        if finished > 0 {
            (completed as f64 / finished as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Get snapshot of current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            streams_completed: self.streams_completed.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            timeouts: self.ttft_timeouts.load(Ordering::Relaxed)
                + self.idle_timeouts.load(Ordering::Relaxed)
                + self.total_timeouts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            failures: self.failures(),
            success_rate: self.success_rate(),
        }
    }

    /// Reset all counters (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.streams_opened,
            &self.streams_completed,
            &self.frames_decoded,
            &self.events_emitted,
            &self.ttft_timeouts,
            &self.idle_timeouts,
            &self.total_timeouts,
            &self.cancellations,
            &self.decode_errors,
            &self.protocol_errors,
            &self.upstream_errors,
            &self.transport_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Immutable snapshot of counters at a point in time
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub streams_opened: u64,
    pub streams_completed: u64,
    pub frames_decoded: u64,
    pub events_emitted: u64,
    pub timeouts: u64,
    pub cancellations: u64,
    pub failures: u64,
    pub success_rate: f64,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stream Stats: {} opened, {} completed ({:.1}% success), {} frames, {} timeouts, {} cancelled",
            self.streams_opened,
            self.streams_completed,
            self.success_rate,
            self.frames_decoded,
            self.timeouts,
            self.cancellations
        )
    }
}

lazy_static::lazy_static! {
    /// Global stats instance
    pub static ref STREAM_STATS: StreamStats = StreamStats::new();
}
