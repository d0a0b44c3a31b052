//! Interactive front-end
//!
//! The terminal stands in for the control panel: it shows status and title
//! updates, answers restart confirmations and forwards edits to the running
//! session. All of it runs on the main thread; the session worker and the
//! stdin reader only send events to it.

pub mod terminal;

pub use terminal::{parse_answer, parse_command, run_front_end, TerminalObserver, UiCommand, UiEvent};
