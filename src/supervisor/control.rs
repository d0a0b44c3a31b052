//! Play flag and confirmation handoff shared between the UI and the
//! session worker
//!
//! One mutex guards both so that a stop and a confirmation answer can never
//! be observed in the wrong order. Every blocking wait in the worker goes
//! through the condition variable here, so a stop wakes it immediately.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of waiting for a restart confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The session was stopped while waiting. Wins over any answer.
    Stopped,
    Answered(bool),
    TimedOut,
}

#[derive(Debug)]
struct ControlState {
    playing: bool,
    pending: Option<u64>,
    answer: Option<bool>,
    next_ticket: u64,
}

#[derive(Debug)]
pub struct SessionControl {
    state: Mutex<ControlState>,
    changed: Condvar,
}

impl Default for SessionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionControl {
    /// A control with the play flag set.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ControlState {
                playing: true,
                pending: None,
                answer: None,
                next_ticket: 1,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Clear the play flag and wake every waiter. Returns whether the flag
    /// was still set.
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        let was_playing = state.playing;
        state.playing = false;
        state.pending = None;
        drop(state);
        self.changed.notify_all();
        was_playing
    }

    /// Sleep for `duration` unless stopped first. Returns whether the
    /// session is still playing afterwards.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut state = self.lock();
        loop {
            if !state.playing {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Open a new confirmation and return its ticket. Any earlier
    /// unanswered confirmation is superseded.
    pub fn begin_confirmation(&self) -> u64 {
        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.pending = Some(ticket);
        state.answer = None;
        ticket
    }

    /// Answer confirmation `ticket`. Stale tickets and answers after a stop
    /// are ignored; returns whether the answer was accepted.
    pub fn answer(&self, ticket: u64, restart: bool) -> bool {
        let mut state = self.lock();
        if !state.playing || state.pending != Some(ticket) || state.answer.is_some() {
            return false;
        }
        state.answer = Some(restart);
        drop(state);
        self.changed.notify_all();
        true
    }

    pub fn is_pending(&self, ticket: u64) -> bool {
        self.lock().pending == Some(ticket)
    }

    /// Block until `ticket` is answered, the session is stopped, or
    /// `deadline` passes.
    pub fn wait_for_decision(&self, ticket: u64, deadline: Instant) -> Decision {
        let mut state = self.lock();
        loop {
            if !state.playing {
                state.pending = None;
                return Decision::Stopped;
            }
            if state.pending != Some(ticket) {
                // Superseded by a newer confirmation
                return Decision::TimedOut;
            }
            if let Some(answer) = state.answer.take() {
                state.pending = None;
                return Decision::Answered(answer);
            }
            let now = Instant::now();
            if now >= deadline {
                state.pending = None;
                return Decision::TimedOut;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
