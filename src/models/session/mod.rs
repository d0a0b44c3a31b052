mod transitions;
mod types;

pub use transitions::InvalidTransition;
pub use types::{PlaybackRequest, SessionState};
