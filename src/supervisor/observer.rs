use std::sync::Arc;
use std::time::{Duration, Instant};

use super::control::SessionControl;
use crate::models::SessionState;

/// Status sink implemented by the front-end.
///
/// Called from the session worker thread; implementations should hand the
/// update to their own thread rather than block.
pub trait SessionObserver: Send + Sync {
    fn set_status(&self, text: &str);

    fn set_title(&self, title: &str);

    fn set_play_enabled(&self, enabled: bool);

    /// The worker needs a restart decision. Answer through
    /// [`ConfirmRequest::respond`]; an unanswered request restarts once its
    /// deadline passes.
    fn request_confirmation(&self, request: ConfirmRequest);

    fn state_changed(&self, _state: SessionState) {}
}

/// A pending yes/no restart question.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    reason: String,
    timeout: Duration,
    deadline: Instant,
    ticket: u64,
    control: Arc<SessionControl>,
}

impl ConfirmRequest {
    pub(crate) fn new(reason: String, timeout: Duration, ticket: u64, control: Arc<SessionControl>) -> Self {
        Self {
            reason,
            timeout,
            deadline: Instant::now() + timeout,
            ticket,
            control,
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the worker is still waiting on this request.
    pub fn is_open(&self) -> bool {
        self.control.is_pending(self.ticket)
    }

    /// Answer the question. Returns false if it was already answered,
    /// expired, or the session stopped.
    pub fn respond(&self, restart: bool) -> bool {
        self.control.answer(self.ticket, restart)
    }
}
