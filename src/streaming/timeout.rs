use std::time::Duration;

use tokio::time::Instant;

use crate::config::TimeoutConfig;
use crate::error::{StreamError, TimeoutKind};

/// The earliest clock that can end the current pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub at: Instant,
    pub kind: TimeoutKind,
    pub limit: Duration,
}

impl Deadline {
    pub fn into_error(self) -> StreamError {
        StreamError::Timeout {
            kind: self.kind,
            limit: self.limit,
        }
    }
}

/// Holds the three stream clocks as plain deadlines.
///
/// Nothing runs in the background: the caller asks for the next deadline before each
/// read and reports frames and content as they are processed.
#[derive(Debug, Clone)]
pub struct TimeoutSupervisor {
    ttft: Option<Duration>,
    idle: Option<Duration>,
    total: Option<Duration>,
    started: Instant,
    last_activity: Instant,
    first_content: Option<Instant>,
}

impl TimeoutSupervisor {
    pub fn start(config: &TimeoutConfig) -> Self {
        Self::start_at(config, Instant::now())
    }

    pub fn start_at(config: &TimeoutConfig, now: Instant) -> Self {
        Self {
            ttft: config.ttft_limit(),
            idle: config.idle_limit(),
            total: config.total_limit(),
            started: now,
            last_activity: now,
            first_content: None,
        }
    }

    /// Any decoded frame, pings included, resets the idle clock.
    pub fn record_frame(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// The first content-bearing event disarms the TTFT clock for good.
    pub fn record_content(&mut self, now: Instant) {
        if self.first_content.is_none() {
            self.first_content = Some(now);
            tracing::debug!(
                ttft_ms = (now - self.started).as_millis() as u64,
                "First content received"
            );
        }
    }

    /// Earliest armed deadline. On a tie, total beats TTFT beats idle.
    pub fn next_deadline(&self) -> Option<Deadline> {
        let candidates = [
            self.total_deadline(),
            self.ttft
                .filter(|_| self.first_content.is_none())
                .map(|limit| Deadline {
                    at: self.started + limit,
                    kind: TimeoutKind::Ttft,
                    limit,
                }),
            self.idle.map(|limit| Deadline {
                at: self.last_activity + limit,
                kind: TimeoutKind::Idle,
                limit,
            }),
        ];

        candidates
            .into_iter()
            .flatten()
            .fold(None, |earliest: Option<Deadline>, candidate| match earliest {
                Some(current) if current.at <= candidate.at => Some(current),
                _ => Some(candidate),
            })
    }

    /// The total budget alone; it holds even when data is waiting.
    pub fn total_deadline(&self) -> Option<Deadline> {
        self.total.map(|limit| Deadline {
            at: self.started + limit,
            kind: TimeoutKind::Total,
            limit,
        })
    }

    pub fn started_at(&self) -> Instant {
        self.started
    }

    pub fn first_content_at(&self) -> Option<Instant> {
        self.first_content
    }

    pub fn ttft(&self) -> Option<Duration> {
        self.first_content.map(|at| at - self.started)
    }
}
