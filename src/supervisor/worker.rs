//! The session worker loop
//!
//! Selecting → Spawning → Monitoring, and on failure either straight to
//! Restarting or through AwaitingUserConfirmation first. Every blocking
//! wait is a [`SessionControl`](super::control::SessionControl) wait, so a
//! stop ends the loop within one wake-up.

use std::sync::Arc;

use super::policy::{calculate_backoff, FailureCause, RestartDecision};
use super::session::{Confirmation, SessionShared};
use super::{SupervisorConfig, SupervisorDeps};
use crate::models::{Encoding, PlaybackRequest, SessionState, TileGeometry};
use crate::pipeline::PipelineBuilder;

pub(crate) struct Worker {
    pub(crate) shared: Arc<SessionShared>,
    pub(crate) deps: Arc<SupervisorDeps>,
    pub(crate) config: SupervisorConfig,
    pub(crate) builder: PipelineBuilder,
    pub(crate) title: String,
}

/// Why monitoring ended.
enum MonitorExit {
    Stopped,
    Failed(FailureCause),
}

impl Worker {
    pub(crate) fn run(mut self) {
        tracing::info!(title = %self.title, "session worker started");
        self.run_cycles();
        self.shared.observer.set_play_enabled(true);
        tracing::info!(state = %self.shared.state(), "session worker finished");
    }

    fn run_cycles(&mut self) {
        let mut encodings: Vec<Encoding> = Vec::new();
        let mut selected_url: Option<String> = None;
        let mut consecutive_failures: u32 = 0;

        while self.shared.control.is_playing() {
            let request = self.shared.request();

            if selected_url.as_deref() != Some(request.url.as_str()) {
                if !self.shared.transition(SessionState::Selecting) {
                    return;
                }
                let Some(list) = self.query_catalog(&request, selected_url.is_some()) else {
                    return;
                };
                encodings = list;
                selected_url = Some(request.url.clone());
            }

            let tile = match TileGeometry::new(request.divisions, self.config.screen) {
                Ok(tile) => tile,
                Err(e) => {
                    self.shared.fail(&e.to_string());
                    return;
                }
            };
            let format = self.deps.selector.select(&encodings, &tile);
            match &format {
                Some(format) => tracing::info!(
                    %format,
                    divisions = tile.divisions(),
                    tile_width = tile.tile_width(),
                    tile_height = tile.tile_height(),
                    "format selected"
                ),
                None => tracing::warn!(
                    divisions = tile.divisions(),
                    "no encoding satisfies the tile size, using best available"
                ),
            }
            let spec = self.builder.build(&request.url, format.as_ref(), &tile);

            if !self.shared.transition(SessionState::Spawning) {
                return;
            }
            let cause = match self.shared.spawn_pipeline(self.deps.launcher.as_ref(), &spec) {
                Ok(false) => return,
                Ok(true) => {
                    if !self.shared.transition(SessionState::Monitoring) {
                        return;
                    }
                    match self.monitor(&mut consecutive_failures) {
                        MonitorExit::Stopped => return,
                        MonitorExit::Failed(cause) => cause,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "pipeline spawn failed");
                    FailureCause::SpawnFailed(e.to_string())
                }
            };

            tracing::warn!(cause = %cause, "playback interrupted");
            if !self.recover(&cause) {
                return;
            }

            consecutive_failures += 1;
            let backoff = calculate_backoff(
                consecutive_failures,
                self.config.backoff_base,
                self.config.backoff_max,
            );
            if backoff > self.config.poll_interval {
                tracing::info!(attempt = consecutive_failures, ?backoff, "delaying restart");
            }
            // Every respawn waits at least one poll interval
            if !self.shared.control.sleep(backoff.max(self.config.poll_interval)) {
                return;
            }
        }
    }

    /// Fetch encodings for `request.url`. On a URL change mid-session the
    /// title is refreshed too. `None` means the session failed.
    fn query_catalog(&mut self, request: &PlaybackRequest, url_changed: bool) -> Option<Vec<Encoding>> {
        let catalog = &self.deps.catalog;

        if url_changed {
            match catalog.title_of(&request.url) {
                Ok(title) => {
                    self.title = title;
                    self.shared.observer.set_title(&self.title);
                    self.shared
                        .observer
                        .set_status(&format!("Starting video player '{}'", self.title));
                }
                Err(e) => {
                    self.shared
                        .fail(&format!("invalid or unreachable stream: {e}"));
                    return None;
                }
            }
        }

        match catalog.list_encodings(&request.url) {
            Ok(encodings) => {
                tracing::debug!(count = encodings.len(), url = %request.url, "encodings listed");
                Some(encodings)
            }
            Err(e) => {
                self.shared
                    .fail(&format!("invalid or unreachable stream: {e}"));
                None
            }
        }
    }

    /// Poll the pipeline until it fails or the session stops.
    fn monitor(&self, consecutive_failures: &mut u32) -> MonitorExit {
        let root_pid = std::process::id();
        let mut announced = false;

        loop {
            if !self.shared.control.is_playing() {
                return MonitorExit::Stopped;
            }

            match self.shared.downloader_alive() {
                None => return MonitorExit::Stopped,
                Some((false, detail)) => {
                    return MonitorExit::Failed(FailureCause::DownloaderExited { detail })
                }
                Some((true, _)) => {}
            }

            match self.shared.renderer_alive() {
                None => return MonitorExit::Stopped,
                Some(false) => return MonitorExit::Failed(FailureCause::RendererLost),
                Some(true) => {}
            }

            let probed = self
                .deps
                .probe
                .probe_renderer_alive(root_pid, self.config.window_timeout);
            if !self.shared.control.is_playing() {
                return MonitorExit::Stopped;
            }

            match probed {
                Ok(true) => {
                    if !announced {
                        announced = true;
                        *consecutive_failures = 0;
                        tracing::info!(title = %self.title, "renderer window confirmed");
                        self.shared
                            .observer
                            .set_status(&format!("Playing video '{}'", self.title));
                    }
                }
                Ok(false) => return MonitorExit::Failed(FailureCause::RendererLost),
                Err(e) => tracing::warn!(error = %e, "window probe failed, will retry"),
            }

            if !self.shared.control.sleep(self.config.poll_interval) {
                return MonitorExit::Stopped;
            }
        }
    }

    /// Apply the restart policy to `cause` and, if restarting, tear down
    /// the old pipeline. Returns false if the session ended instead.
    fn recover(&self, cause: &FailureCause) -> bool {
        match self.config.restart_policy.decide(cause) {
            RestartDecision::RestartNow => {}
            RestartDecision::AskUser { timeout } => {
                if !self.shared.transition(SessionState::AwaitingUserConfirmation) {
                    return false;
                }
                match self.shared.confirm_restart(cause.to_string(), timeout) {
                    Confirmation::Restart => {}
                    Confirmation::Decline => {
                        tracing::info!("restart declined");
                        self.shared.stop();
                        return false;
                    }
                    Confirmation::Stopped => return false,
                }
            }
        }

        if !self.shared.control.is_playing() || !self.shared.transition(SessionState::Restarting) {
            return false;
        }
        self.shared.terminate_pipeline();
        true
    }
}
