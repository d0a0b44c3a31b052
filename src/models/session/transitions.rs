use super::types::SessionState;

/// Attempted a state change the session lifecycle does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid session state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub to: SessionState,
}

impl SessionState {
    /// Check if transitioning from the current state to `next` is valid.
    ///
    /// `Stopped` is reachable from every live state; `Failed` from every
    /// non-terminal state. `Stopped` and `Failed` are terminal.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        if matches!(next, SessionState::Stopped | SessionState::Failed) {
            return true;
        }

        match self {
            SessionState::Idle => matches!(next, SessionState::Selecting),
            SessionState::Selecting => matches!(next, SessionState::Spawning),
            SessionState::Spawning => matches!(
                next,
                SessionState::Monitoring
                    | SessionState::Restarting
                    | SessionState::AwaitingUserConfirmation
            ),
            SessionState::Monitoring => matches!(
                next,
                SessionState::Restarting | SessionState::AwaitingUserConfirmation
            ),
            SessionState::AwaitingUserConfirmation => matches!(next, SessionState::Restarting),
            SessionState::Restarting => {
                matches!(next, SessionState::Spawning | SessionState::Selecting)
            }
            SessionState::Stopped | SessionState::Failed => false,
        }
    }

    pub fn try_transition(&self, next: SessionState) -> Result<SessionState, InvalidTransition> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// Returns true if this is a terminal state (no valid outgoing transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}
