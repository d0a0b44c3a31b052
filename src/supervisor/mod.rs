//! Playback session supervisor
//!
//! Owns at most one session at a time. [`SessionSupervisor::start_session`]
//! validates preconditions synchronously, then hands the session to a
//! dedicated worker thread that keeps the pipeline alive according to the
//! [`RestartPolicy`]. The front-end observes progress through a
//! [`SessionObserver`] and controls the session through a [`SessionHandle`].

pub mod control;
pub mod observer;
pub mod policy;
pub mod session;
mod worker;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::catalog::StreamCatalog;
use crate::config::DivisionsStore;
use crate::error::{ConfigurationError, TilerError};
use crate::models::{PlaybackRequest, ScreenSize, SessionState, TileGeometry};
use crate::pipeline::{PipelineBuilder, PipelineLauncher};
use crate::probe::WindowProbe;
use crate::selector::FormatSelector;
use crate::tools::{MissingTool, ToolPaths};

pub use control::{Decision, SessionControl};
pub use observer::{ConfirmRequest, SessionObserver};
pub use policy::{calculate_backoff, FailureCause, RestartDecision, RestartPolicy};
pub use session::{SessionHandle, READY_STATUS};

use session::SessionShared;
use worker::Worker;

/// Timing and policy for supervised sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Gap between health checks while monitoring.
    pub poll_interval: Duration,
    /// How long the probe waits for a renderer window to appear.
    pub window_timeout: Duration,
    pub restart_policy: RestartPolicy,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub screen: ScreenSize,
}

impl SupervisorConfig {
    pub fn new(screen: ScreenSize) -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            window_timeout: Duration::from_secs(15),
            restart_policy: RestartPolicy::Automatic,
            backoff_base: Duration::ZERO,
            backoff_max: Duration::from_secs(30),
            screen,
        }
    }
}

/// Collaborators a supervisor drives.
pub struct SupervisorDeps {
    pub catalog: Arc<dyn StreamCatalog>,
    pub launcher: Arc<dyn PipelineLauncher>,
    pub probe: Arc<dyn WindowProbe>,
    pub observer: Arc<dyn SessionObserver>,
    /// Result of tool discovery; a missing tool fails every session start.
    pub tools: Result<ToolPaths, MissingTool>,
    pub selector: FormatSelector,
    pub user_agent: Option<String>,
    /// Where the divisions preference is saved on start, if anywhere.
    pub preferences: Option<DivisionsStore>,
}

struct ActiveSession {
    shared: Arc<SessionShared>,
    worker: Option<JoinHandle<()>>,
}

pub struct SessionSupervisor {
    deps: Arc<SupervisorDeps>,
    config: SupervisorConfig,
    current: Mutex<Option<ActiveSession>>,
}

impl SessionSupervisor {
    pub fn new(deps: SupervisorDeps, config: SupervisorConfig) -> Self {
        Self {
            deps: Arc::new(deps),
            config,
            current: Mutex::new(None),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start playing `url` on a `divisions`×`divisions` grid.
    ///
    /// Any session already running is stopped first. Errors are returned
    /// only for problems found before the worker starts: missing tools,
    /// invalid divisions, or a stream the catalog cannot resolve. In each
    /// case the new session is left in `Failed`.
    pub fn start_session(&self, url: &str, divisions: u32) -> Result<SessionHandle, TilerError> {
        self.stop_and_join();

        let observer = Arc::clone(&self.deps.observer);
        let shared = Arc::new(SessionShared::new(PlaybackRequest::new(url, divisions), observer));
        *self.current() = Some(ActiveSession {
            shared: Arc::clone(&shared),
            worker: None,
        });

        let span = tracing::info_span!("session", id = %shared.id());
        let _entered = span.enter();
        tracing::info!(url, divisions, "starting session");

        let tools = match &self.deps.tools {
            Ok(tools) => tools.clone(),
            Err(missing) => {
                let err = ConfigurationError::from(missing.clone());
                shared.fail(&err.to_string());
                return Err(err.into());
            }
        };

        if let Err(e) = TileGeometry::new(divisions, self.config.screen) {
            shared.fail(&e.to_string());
            return Err(e.into());
        }

        shared.transition(SessionState::Selecting);
        let title = match self.deps.catalog.title_of(url) {
            Ok(title) => title,
            Err(e) => {
                shared.fail(&format!("invalid or unreachable stream: {e}"));
                return Err(e.into());
            }
        };

        if let Some(store) = &self.deps.preferences {
            store.save_best_effort(divisions);
        }

        shared.observer.set_title(&title);
        shared
            .observer
            .set_status(&format!("Starting video player '{title}'"));
        shared.observer.set_play_enabled(false);

        let mut builder = PipelineBuilder::new(tools);
        if let Some(user_agent) = &self.deps.user_agent {
            builder = builder.with_user_agent(user_agent.clone());
        }
        let worker = Worker {
            shared: Arc::clone(&shared),
            deps: Arc::clone(&self.deps),
            config: self.config.clone(),
            builder,
            title,
        };

        let worker_span = span.clone();
        let handle = thread::Builder::new()
            .name("videotiler-session".to_string())
            .spawn(move || {
                let _entered = worker_span.enter();
                worker.run();
            })
            .map_err(|e| {
                shared.fail("failed to start session worker");
                TilerError::Worker(e)
            })?;

        if let Some(active) = self.current().as_mut() {
            if Arc::ptr_eq(&active.shared, &shared) {
                active.worker = Some(handle);
            }
        }

        Ok(SessionHandle { shared })
    }

    /// Stop the current session, if any. Idempotent; does not wait for the
    /// worker thread to exit.
    pub fn stop_session(&self) {
        let shared = self.current().as_ref().map(|active| Arc::clone(&active.shared));
        if let Some(shared) = shared {
            shared.stop();
        }
    }

    /// Block until the current session's worker has exited.
    pub fn wait(&self) {
        let worker = self.current().as_mut().and_then(|active| active.worker.take());
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!("session worker panicked");
            }
        }
    }

    fn stop_and_join(&self) {
        self.stop_session();
        self.wait();
    }

    /// State of the current session; `Idle` if none was ever started.
    pub fn state(&self) -> SessionState {
        self.current()
            .as_ref()
            .map_or(SessionState::Idle, |active| active.shared.state())
    }

    pub fn handle(&self) -> Option<SessionHandle> {
        self.current().as_ref().map(|active| SessionHandle {
            shared: Arc::clone(&active.shared),
        })
    }

    /// Stop the current session and wait for its worker.
    pub fn shutdown(&self) {
        self.stop_and_join();
    }
}

impl Drop for SessionSupervisor {
    fn drop(&mut self) {
        self.stop_session();
    }
}
