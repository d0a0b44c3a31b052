//! State shared by one session's worker and its handles

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use super::control::{Decision, SessionControl};
use super::observer::{ConfirmRequest, SessionObserver};
use crate::error::{ConfigurationError, SpawnError};
use crate::models::constants::divisions_in_range;
use crate::models::{PipelineSpec, PlaybackRequest, SessionState};
use crate::pipeline::{PipelineLauncher, RunningPipeline};

/// Status shown whenever no session is playing.
pub const READY_STATUS: &str = "Ready";

type PipelineSlot = Option<Box<dyn RunningPipeline>>;

/// Result of asking the user whether to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Confirmation {
    Restart,
    Decline,
    Stopped,
}

pub(crate) struct SessionShared {
    id: String,
    pub(crate) control: Arc<SessionControl>,
    state: Mutex<SessionState>,
    request: RwLock<PlaybackRequest>,
    pipeline: Mutex<PipelineSlot>,
    pub(crate) observer: Arc<dyn SessionObserver>,
}

impl SessionShared {
    pub(crate) fn new(request: PlaybackRequest, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            id: generate_id(),
            control: Arc::new(SessionControl::new()),
            state: Mutex::new(SessionState::Idle),
            request: RwLock::new(request),
            pipeline: Mutex::new(None),
            observer,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next` if the lifecycle allows it.
    ///
    /// Returns false when the transition is rejected, which for the worker
    /// means the session was stopped or failed underneath it.
    pub(crate) fn transition(&self, next: SessionState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *state;
        if current == next {
            return true;
        }
        match current.try_transition(next) {
            Ok(next) => {
                *state = next;
                drop(state);
                tracing::info!(from = %current, to = %next, "session state changed");
                self.observer.state_changed(next);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "transition ignored");
                false
            }
        }
    }

    /// Snapshot of what should be played next.
    pub(crate) fn request(&self) -> PlaybackRequest {
        self.request
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_request(&self, request: PlaybackRequest) {
        *self.request.write().unwrap_or_else(PoisonError::into_inner) = request;
    }

    fn slot(&self) -> MutexGuard<'_, PipelineSlot> {
        self.pipeline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the live pipeline with a new one built from `spec`.
    ///
    /// The previous pipeline is torn down first and the play flag is
    /// re-checked under the slot lock, so a concurrent stop either prevents
    /// the launch or terminates what was launched. Returns `Ok(false)` if
    /// the session was stopped.
    pub(crate) fn spawn_pipeline(
        &self,
        launcher: &dyn PipelineLauncher,
        spec: &PipelineSpec,
    ) -> Result<bool, SpawnError> {
        let mut slot = self.slot();
        if let Some(mut previous) = slot.take() {
            previous.terminate();
        }
        if !self.control.is_playing() {
            return Ok(false);
        }
        *slot = Some(launcher.launch(spec)?);
        Ok(true)
    }

    /// `None` if no pipeline is held, else whether its downloader runs.
    pub(crate) fn downloader_alive(&self) -> Option<(bool, Option<String>)> {
        let mut slot = self.slot();
        let pipeline = slot.as_mut()?;
        let alive = pipeline.is_downloader_alive();
        let detail = if alive { None } else { pipeline.last_error() };
        Some((alive, detail))
    }

    /// `None` if no pipeline is held, else whether its renderer runs.
    pub(crate) fn renderer_alive(&self) -> Option<bool> {
        self.slot().as_mut().map(|pipeline| pipeline.is_renderer_alive())
    }

    pub(crate) fn terminate_pipeline(&self) {
        if let Some(mut pipeline) = self.slot().take() {
            pipeline.terminate();
        }
    }

    /// Ask the front-end whether to restart and wait for the answer.
    pub(crate) fn confirm_restart(&self, reason: String, timeout: Duration) -> Confirmation {
        let ticket = self.control.begin_confirmation();
        let request = ConfirmRequest::new(reason, timeout, ticket, Arc::clone(&self.control));
        let deadline = request.deadline();
        self.observer.request_confirmation(request);

        match self.control.wait_for_decision(ticket, deadline) {
            Decision::Stopped => Confirmation::Stopped,
            Decision::Answered(false) => Confirmation::Decline,
            Decision::Answered(true) | Decision::TimedOut => {
                if self.control.is_playing() {
                    Confirmation::Restart
                } else {
                    Confirmation::Stopped
                }
            }
        }
    }

    /// Stop playback: clear the flag, kill the pipeline, report "Ready".
    /// Idempotent.
    pub(crate) fn stop(&self) {
        let was_playing = self.control.stop();
        self.terminate_pipeline();
        let stopped = self.transition(SessionState::Stopped);

        if was_playing && stopped {
            tracing::info!("session stopped");
            self.observer.set_status(READY_STATUS);
            self.observer.set_play_enabled(true);
        }
    }

    /// Unrecoverable failure: no retry, reported once.
    pub(crate) fn fail(&self, message: &str) {
        self.control.stop();
        self.terminate_pipeline();
        if self.transition(SessionState::Failed) {
            tracing::error!(reason = message, "session failed");
            self.observer.set_status(&format!("Error: {message}"));
            self.observer.set_play_enabled(true);
        }
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        self.terminate_pipeline();
    }
}

/// Front-end view of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) shared: Arc<SessionShared>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        self.shared.id()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.control.is_playing()
    }

    /// What the session will play on its next cycle.
    pub fn request(&self) -> PlaybackRequest {
        self.shared.request()
    }

    /// Replace URL and divisions. Takes effect on the next restart; the
    /// running pipeline is left alone.
    pub fn update_request(&self, request: PlaybackRequest) -> Result<(), ConfigurationError> {
        if !divisions_in_range(request.divisions) {
            return Err(ConfigurationError::InvalidDivisions(request.divisions));
        }
        tracing::info!(url = %request.url, divisions = request.divisions, "playback request updated");
        self.shared.replace_request(request);
        Ok(())
    }

    pub fn set_divisions(&self, divisions: u32) -> Result<(), ConfigurationError> {
        let mut request = self.request();
        request.divisions = divisions;
        self.update_request(request)
    }

    pub fn set_url(&self, url: impl Into<String>) -> Result<(), ConfigurationError> {
        let mut request = self.request();
        request.url = url.into();
        self.update_request(request)
    }

    pub fn stop(&self) {
        self.shared.stop();
    }
}

fn generate_id() -> String {
    let timestamp = Utc::now().timestamp();
    let uuid_short = uuid::Uuid::new_v4()
        .to_string()
        .split('-')
        .next()
        .unwrap_or("")
        .to_string();
    format!("session-{uuid_short}-{timestamp}")
}
