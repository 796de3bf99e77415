// Transient notifications ("toasts") raised by the coordinator.
// Each toast disappears on its own once its time-to-live has passed.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
    /// A failure the user can fix themselves (e.g. a missing server tool).
    Actionable,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub raised_at: Instant,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Info)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Error)
    }

    pub fn actionable(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Actionable)
    }

    fn new(message: impl Into<String>, level: ToastLevel) -> Self {
        Self {
            message: message.into(),
            level,
            raised_at: Instant::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level != ToastLevel::Info
    }
}

#[derive(Debug)]
pub struct Notifications {
    ttl: Duration,
    active: VecDeque<Toast>,
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            active: VecDeque::new(),
        }
    }

    pub fn push(&mut self, toast: Toast) {
        self.active.push_back(toast);
    }

    /// Drop every toast older than the TTL.
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.active
            .retain(|t| now.saturating_duration_since(t.raised_at) < ttl);
    }

    /// The toast currently on screen: the most recent one still alive.
    pub fn visible(&self) -> Option<&Toast> {
        self.active.back()
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_TTL)
    }
}
