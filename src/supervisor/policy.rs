use std::fmt;
use std::time::Duration;

/// What to do when a running pipeline fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Restart without asking.
    Automatic,
    /// Ask the user; no answer within `timeout` counts as "restart".
    Confirm { timeout: Duration },
}

impl RestartPolicy {
    pub fn from_preference(auto_restart: bool, confirm_timeout: Duration) -> Self {
        if auto_restart {
            RestartPolicy::Automatic
        } else {
            RestartPolicy::Confirm {
                timeout: confirm_timeout,
            }
        }
    }

    /// Decide how to recover from `cause`.
    ///
    /// A downloader exit always restarts directly: the stream ended or broke
    /// and there is nothing for the user to judge. A lost renderer window or
    /// a failed spawn goes through the policy.
    pub fn decide(&self, cause: &FailureCause) -> RestartDecision {
        match (self, cause) {
            (_, FailureCause::DownloaderExited { .. }) => RestartDecision::RestartNow,
            (RestartPolicy::Automatic, _) => RestartDecision::RestartNow,
            (RestartPolicy::Confirm { timeout }, _) => RestartDecision::AskUser { timeout: *timeout },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    RestartNow,
    AskUser { timeout: Duration },
}

/// Why a playback attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The downloader process exited. `detail` is its last stderr line.
    DownloaderExited { detail: Option<String> },
    /// The renderer process or its window disappeared.
    RendererLost,
    /// The OS refused to start one of the processes.
    SpawnFailed(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::DownloaderExited { detail: Some(detail) } => {
                write!(f, "downloader exited early: {detail}")
            }
            FailureCause::DownloaderExited { detail: None } => write!(f, "downloader exited early"),
            FailureCause::RendererLost => write!(f, "video player window is not running"),
            FailureCause::SpawnFailed(message) => write!(f, "playback did not start: {message}"),
        }
    }
}

/// Delay before restart attempt `attempt` (1-based).
///
/// Formula: base * 2^(attempt-1), capped at max. Zero attempts or a zero
/// base means no delay.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let multiplier = 2u32.saturating_pow(attempt - 1);
    base.saturating_mul(multiplier).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirm() -> RestartPolicy {
        RestartPolicy::Confirm {
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_from_preference() {
        assert_eq!(
            RestartPolicy::from_preference(true, Duration::from_secs(3)),
            RestartPolicy::Automatic
        );
        assert_eq!(
            RestartPolicy::from_preference(false, Duration::from_secs(3)),
            RestartPolicy::Confirm {
                timeout: Duration::from_secs(3)
            }
        );
    }

    #[test]
    fn test_downloader_exit_never_asks() {
        let cause = FailureCause::DownloaderExited { detail: None };
        assert_eq!(confirm().decide(&cause), RestartDecision::RestartNow);
        assert_eq!(RestartPolicy::Automatic.decide(&cause), RestartDecision::RestartNow);
    }

    #[test]
    fn test_renderer_loss_follows_policy() {
        for cause in [FailureCause::RendererLost, FailureCause::SpawnFailed("ENOENT".into())] {
            assert_eq!(RestartPolicy::Automatic.decide(&cause), RestartDecision::RestartNow);
            assert_eq!(
                confirm().decide(&cause),
                RestartDecision::AskUser {
                    timeout: Duration::from_secs(10)
                }
            );
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(3);
        assert_eq!(calculate_backoff(0, base, max), Duration::ZERO);
        assert_eq!(calculate_backoff(1, base, max), Duration::from_millis(500));
        assert_eq!(calculate_backoff(2, base, max), Duration::from_secs(1));
        assert_eq!(calculate_backoff(3, base, max), Duration::from_secs(2));
        assert_eq!(calculate_backoff(4, base, max), Duration::from_secs(3));
        assert_eq!(calculate_backoff(60, base, max), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_base_disables_backoff() {
        assert_eq!(
            calculate_backoff(5, Duration::ZERO, Duration::from_secs(30)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_cause_display() {
        let cause = FailureCause::DownloaderExited {
            detail: Some("ERROR: HTTP Error 403".into()),
        };
        assert_eq!(cause.to_string(), "downloader exited early: ERROR: HTTP Error 403");
    }
}
