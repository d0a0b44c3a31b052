use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a supervised playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Selecting,
    Spawning,
    Monitoring,
    AwaitingUserConfirmation,
    Restarting,
    Stopped,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Selecting => "selecting",
            SessionState::Spawning => "spawning",
            SessionState::Monitoring => "monitoring",
            SessionState::AwaitingUserConfirmation => "awaiting_user_confirmation",
            SessionState::Restarting => "restarting",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// What the user currently wants played. Edited by the UI, read by the
/// session worker once per restart cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub url: String,
    pub divisions: u32,
}

impl PlaybackRequest {
    pub fn new(url: impl Into<String>, divisions: u32) -> Self {
        Self {
            url: url.into(),
            divisions,
        }
    }
}
