//! Integration tests for the session supervisor lifecycle, driven through
//! scripted catalog, launcher and probe doubles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use videotiler::catalog::StreamCatalog;
use videotiler::error::{CatalogError, ConfigurationError, ProbeError, SpawnError, TilerError};
use videotiler::models::{Encoding, PipelineSpec, ScreenSize, SessionState};
use videotiler::pipeline::{PipelineLauncher, RunningPipeline};
use videotiler::probe::WindowProbe;
use videotiler::selector::FormatSelector;
use videotiler::supervisor::{
    ConfirmRequest, RestartPolicy, SessionObserver, SessionSupervisor, SupervisorConfig,
    SupervisorDeps, READY_STATUS,
};
use videotiler::tools::{MissingTool, ToolPaths};

const WAIT: Duration = Duration::from_secs(5);

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

struct FakeCatalog {
    listed: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn new() -> Self {
        Self {
            listed: Mutex::new(Vec::new()),
        }
    }

    fn listed(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }
}

impl StreamCatalog for FakeCatalog {
    fn list_encodings(&self, url: &str) -> Result<Vec<Encoding>, CatalogError> {
        if url.contains("missing") {
            return Err(CatalogError::NotFound {
                url: url.to_string(),
                message: "no such video".to_string(),
            });
        }
        self.listed.lock().unwrap().push(url.to_string());
        Ok(vec![
            Encoding::combined("18", 640, 360),
            Encoding::combined("22", 1280, 720),
        ])
    }

    fn title_of(&self, url: &str) -> Result<String, CatalogError> {
        if url.contains("missing") {
            return Err(CatalogError::NotFound {
                url: url.to_string(),
                message: "no such video".to_string(),
            });
        }
        Ok(format!("Title of {}", url.rsplit('/').next().unwrap_or(url)))
    }
}

struct FakePipeline {
    alive: Arc<AtomicBool>,
    renderer_alive: Arc<AtomicBool>,
    terminations: Arc<AtomicUsize>,
}

impl RunningPipeline for FakePipeline {
    fn is_downloader_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn is_renderer_alive(&mut self) -> bool {
        self.renderer_alive.load(Ordering::SeqCst)
    }

    fn terminate(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.renderer_alive.store(false, Ordering::SeqCst);
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

struct Launched {
    spec: PipelineSpec,
    alive: Arc<AtomicBool>,
    renderer_alive: Arc<AtomicBool>,
    terminations: Arc<AtomicUsize>,
}

#[derive(Default)]
struct FakeLauncher {
    launched: Mutex<Vec<Launched>>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl FakeLauncher {
    fn failing_first(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    fn count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    fn spec(&self, index: usize) -> PipelineSpec {
        self.launched.lock().unwrap()[index].spec.clone()
    }

    fn terminations(&self, index: usize) -> usize {
        self.launched.lock().unwrap()[index]
            .terminations
            .load(Ordering::SeqCst)
    }

    fn kill_downloader(&self, index: usize) {
        self.launched.lock().unwrap()[index]
            .alive
            .store(false, Ordering::SeqCst);
    }

    fn kill_renderer(&self, index: usize) {
        self.launched.lock().unwrap()[index]
            .renderer_alive
            .store(false, Ordering::SeqCst);
    }

    fn any_running(&self) -> bool {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.alive.load(Ordering::SeqCst) || l.renderer_alive.load(Ordering::SeqCst))
    }
}

impl PipelineLauncher for FakeLauncher {
    fn launch(&self, spec: &PipelineSpec) -> Result<Box<dyn RunningPipeline>, SpawnError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(SpawnError::Renderer(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "ffplay vanished",
            )));
        }

        let alive = Arc::new(AtomicBool::new(true));
        let renderer_alive = Arc::new(AtomicBool::new(true));
        let terminations = Arc::new(AtomicUsize::new(0));
        self.launched.lock().unwrap().push(Launched {
            spec: spec.clone(),
            alive: Arc::clone(&alive),
            renderer_alive: Arc::clone(&renderer_alive),
            terminations: Arc::clone(&terminations),
        });
        Ok(Box::new(FakePipeline {
            alive,
            renderer_alive,
            terminations,
        }))
    }
}

/// Answers from a script, then reports the window as visible.
#[derive(Default)]
struct ScriptedProbe {
    script: Mutex<VecDeque<Result<bool, ProbeError>>>,
}

impl ScriptedProbe {
    fn with(results: Vec<Result<bool, ProbeError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
        }
    }
}

impl WindowProbe for ScriptedProbe {
    fn probe_renderer_alive(&self, _root_pid: u32, _timeout: Duration) -> Result<bool, ProbeError> {
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(true))
    }
}

#[derive(Default)]
struct Recorder {
    statuses: Mutex<Vec<String>>,
    titles: Mutex<Vec<String>>,
    play_enabled: Mutex<Vec<bool>>,
    confirmations: Mutex<Vec<ConfirmRequest>>,
}

impl Recorder {
    fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    fn confirmations(&self) -> Vec<ConfirmRequest> {
        self.confirmations.lock().unwrap().clone()
    }
}

impl SessionObserver for Recorder {
    fn set_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }

    fn set_title(&self, title: &str) {
        self.titles.lock().unwrap().push(title.to_string());
    }

    fn set_play_enabled(&self, enabled: bool) {
        self.play_enabled.lock().unwrap().push(enabled);
    }

    fn request_confirmation(&self, request: ConfirmRequest) {
        self.confirmations.lock().unwrap().push(request);
    }
}

struct Harness {
    catalog: Arc<FakeCatalog>,
    launcher: Arc<FakeLauncher>,
    observer: Arc<Recorder>,
    supervisor: SessionSupervisor,
}

struct HarnessBuilder {
    launcher: FakeLauncher,
    probe: ScriptedProbe,
    policy: RestartPolicy,
    tools: Result<ToolPaths, MissingTool>,
}

impl HarnessBuilder {
    fn new() -> Self {
        Self {
            launcher: FakeLauncher::default(),
            probe: ScriptedProbe::default(),
            policy: RestartPolicy::Automatic,
            tools: Ok(ToolPaths {
                downloader: "/opt/tools/yt-dlp".into(),
                muxer: "/opt/tools/ffmpeg".into(),
                renderer: "/opt/tools/ffplay".into(),
            }),
        }
    }

    fn probe(mut self, probe: ScriptedProbe) -> Self {
        self.probe = probe;
        self
    }

    fn launcher(mut self, launcher: FakeLauncher) -> Self {
        self.launcher = launcher;
        self
    }

    fn policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn tools(mut self, tools: Result<ToolPaths, MissingTool>) -> Self {
        self.tools = tools;
        self
    }

    fn build(self) -> Harness {
        let catalog = Arc::new(FakeCatalog::new());
        let launcher = Arc::new(self.launcher);
        let observer = Arc::new(Recorder::default());

        let deps = SupervisorDeps {
            catalog: catalog.clone(),
            launcher: launcher.clone(),
            probe: Arc::new(self.probe),
            observer: observer.clone(),
            tools: self.tools,
            selector: FormatSelector::default(),
            user_agent: None,
            preferences: None,
        };
        let mut config = SupervisorConfig::new(ScreenSize::new(1920, 1080));
        config.poll_interval = Duration::from_millis(10);
        config.window_timeout = Duration::from_millis(50);
        config.restart_policy = self.policy;

        Harness {
            catalog,
            launcher,
            observer,
            supervisor: SessionSupervisor::new(deps, config),
        }
    }
}

fn confirm(timeout: Duration) -> RestartPolicy {
    RestartPolicy::Confirm { timeout }
}

#[test]
fn test_session_reaches_monitoring_and_reports_playing() {
    let h = HarnessBuilder::new().build();
    let handle = h
        .supervisor
        .start_session("https://videos.example/clip", 3)
        .expect("Should start session");

    assert!(wait_until(|| h
        .observer
        .statuses()
        .contains(&"Playing video 'Title of clip'".to_string())));
    assert_eq!(handle.state(), SessionState::Monitoring);
    assert_eq!(h.launcher.count(), 1);

    let statuses = h.observer.statuses();
    assert_eq!(statuses[0], "Starting video player 'Title of clip'");
    assert_eq!(*h.observer.play_enabled.lock().unwrap(), vec![false]);
    assert_eq!(*h.observer.titles.lock().unwrap(), vec!["Title of clip"]);

    let spec = h.launcher.spec(0);
    assert_eq!(spec.downloader.args.last().unwrap(), "https://videos.example/clip");

    handle.stop();
    h.supervisor.wait();
    assert_eq!(handle.state(), SessionState::Stopped);
    assert_eq!(h.observer.statuses().last().unwrap(), READY_STATUS);
    assert_eq!(h.launcher.terminations(0), 1);
}

#[test]
fn test_lost_renderer_restarts_automatically() {
    let h = HarnessBuilder::new()
        .probe(ScriptedProbe::with(vec![Ok(false)]))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 4).unwrap();

    assert!(wait_until(|| h.launcher.count() == 2 && handle.state() == SessionState::Monitoring));
    assert!(h.launcher.terminations(0) >= 1);
    assert!(h.observer.confirmations().is_empty());
    // The catalog is only queried once while the URL is unchanged
    assert_eq!(h.catalog.listed().len(), 1);

    // One lost window means exactly one restart
    thread::sleep(Duration::from_millis(100));
    assert_eq!(h.launcher.count(), 2);
    assert_eq!(handle.state(), SessionState::Monitoring);

    h.supervisor.shutdown();
    assert_eq!(h.supervisor.state(), SessionState::Stopped);
}

#[test]
fn test_transient_probe_error_keeps_monitoring() {
    let h = HarnessBuilder::new()
        .probe(ScriptedProbe::with(vec![Err(ProbeError::WindowQuery {
            tool: "xdotool".to_string(),
            message: "cannot open display".to_string(),
        })]))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 2).unwrap();

    assert!(wait_until(|| h
        .observer
        .statuses()
        .iter()
        .any(|s| s.starts_with("Playing video"))));
    assert_eq!(h.launcher.count(), 1);
    assert_eq!(handle.state(), SessionState::Monitoring);

    h.supervisor.shutdown();
}

#[test]
fn test_downloader_exit_restarts_without_asking() {
    let h = HarnessBuilder::new()
        .policy(confirm(Duration::from_secs(30)))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();

    assert!(wait_until(|| handle.state() == SessionState::Monitoring));
    h.launcher.kill_downloader(0);

    assert!(wait_until(|| h.launcher.count() == 2));
    assert!(h.observer.confirmations().is_empty());

    h.supervisor.shutdown();
}

#[test]
fn test_declined_restart_stops_session() {
    let h = HarnessBuilder::new()
        .probe(ScriptedProbe::with(vec![Ok(false)]))
        .policy(confirm(Duration::from_secs(30)))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();

    assert!(wait_until(|| !h.observer.confirmations().is_empty()));
    assert_eq!(handle.state(), SessionState::AwaitingUserConfirmation);

    let request = h.observer.confirmations()[0].clone();
    assert!(request.is_open());
    assert!(request.respond(false));

    h.supervisor.wait();
    assert_eq!(handle.state(), SessionState::Stopped);
    assert_eq!(h.launcher.count(), 1);
    assert_eq!(h.observer.statuses().last().unwrap(), READY_STATUS);
    assert_eq!(h.observer.play_enabled.lock().unwrap().last(), Some(&true));
}

#[test]
fn test_accepted_restart_relaunches() {
    let h = HarnessBuilder::new()
        .probe(ScriptedProbe::with(vec![Ok(false)]))
        .policy(confirm(Duration::from_secs(30)))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();

    assert!(wait_until(|| !h.observer.confirmations().is_empty()));
    assert!(h.observer.confirmations()[0].respond(true));

    assert!(wait_until(|| h.launcher.count() == 2 && handle.state() == SessionState::Monitoring));
    h.supervisor.shutdown();
}

#[test]
fn test_unanswered_confirmation_restarts_after_deadline() {
    let h = HarnessBuilder::new()
        .probe(ScriptedProbe::with(vec![Ok(false)]))
        .policy(confirm(Duration::from_millis(50)))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();

    assert!(wait_until(|| h.launcher.count() == 2));
    assert_eq!(h.observer.confirmations().len(), 1);
    assert!(!h.observer.confirmations()[0].is_open());
    assert!(wait_until(|| handle.state() == SessionState::Monitoring));

    h.supervisor.shutdown();
}

#[test]
fn test_stop_while_awaiting_confirmation() {
    let h = HarnessBuilder::new()
        .probe(ScriptedProbe::with(vec![Ok(false)]))
        .policy(confirm(Duration::from_secs(30)))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();

    assert!(wait_until(|| handle.state() == SessionState::AwaitingUserConfirmation));
    handle.stop();
    h.supervisor.wait();

    assert_eq!(handle.state(), SessionState::Stopped);
    assert_eq!(h.launcher.count(), 1);
    assert!(h.launcher.terminations(0) >= 1);

    // A late answer is ignored
    assert!(!h.observer.confirmations()[0].respond(true));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(h.launcher.count(), 1);
}

#[test]
fn test_stop_is_idempotent() {
    let h = HarnessBuilder::new().build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();
    assert!(wait_until(|| handle.state() == SessionState::Monitoring));

    handle.stop();
    handle.stop();
    h.supervisor.stop_session();
    h.supervisor.wait();

    let readies = h
        .observer
        .statuses()
        .iter()
        .filter(|s| *s == READY_STATUS)
        .count();
    assert_eq!(readies, 1);
    assert_eq!(h.launcher.terminations(0), 1);
    assert!(!handle.is_playing());
}

#[test]
fn test_unknown_stream_fails_start() {
    let h = HarnessBuilder::new().build();
    let result = h.supervisor.start_session("https://videos.example/missing", 3);

    assert!(matches!(
        result,
        Err(TilerError::Catalog(CatalogError::NotFound { .. }))
    ));
    assert_eq!(h.supervisor.state(), SessionState::Failed);
    assert_eq!(h.launcher.count(), 0);

    let statuses = h.observer.statuses();
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].starts_with("Error: invalid or unreachable stream"));
}

#[test]
fn test_missing_tool_fails_start() {
    let h = HarnessBuilder::new()
        .tools(Err(MissingTool {
            tool: "ffplay".to_string(),
        }))
        .build();
    let result = h.supervisor.start_session("https://videos.example/a", 3);

    match result {
        Err(TilerError::Configuration(ConfigurationError::MissingExecutable { tool })) => {
            assert_eq!(tool, "ffplay")
        }
        other => panic!("expected missing executable, got {:?}", other.err()),
    }
    assert_eq!(h.supervisor.state(), SessionState::Failed);
    assert_eq!(h.launcher.count(), 0);
}

#[test]
fn test_invalid_divisions_fail_start() {
    let h = HarnessBuilder::new().build();

    for divisions in [0, 51] {
        let result = h.supervisor.start_session("https://videos.example/a", divisions);
        assert!(matches!(
            result,
            Err(TilerError::Configuration(ConfigurationError::InvalidDivisions(d))) if d == divisions
        ));
        assert_eq!(h.supervisor.state(), SessionState::Failed);
    }
    assert_eq!(h.launcher.count(), 0);
}

#[test]
fn test_spawn_failure_is_retried() {
    let h = HarnessBuilder::new()
        .launcher(FakeLauncher::failing_first(1))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();

    assert!(wait_until(|| handle.state() == SessionState::Monitoring));
    assert_eq!(h.launcher.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(h.launcher.count(), 1);

    h.supervisor.shutdown();
}

#[test]
fn test_request_change_applies_on_next_restart() {
    let h = HarnessBuilder::new().build();
    let handle = h.supervisor.start_session("https://videos.example/first", 3).unwrap();
    assert!(wait_until(|| handle.state() == SessionState::Monitoring));

    handle.set_url("https://videos.example/second").unwrap();
    handle.set_divisions(6).unwrap();
    assert!(handle.set_divisions(0).is_err());

    // Nothing restarts until the pipeline fails
    thread::sleep(Duration::from_millis(50));
    assert_eq!(h.launcher.count(), 1);

    h.launcher.kill_downloader(0);
    assert!(wait_until(|| h.launcher.count() == 2));

    assert_eq!(
        h.catalog.listed(),
        vec!["https://videos.example/first", "https://videos.example/second"]
    );
    let spec = h.launcher.spec(1);
    assert_eq!(spec.downloader.args.last().unwrap(), "https://videos.example/second");
    assert_ne!(h.launcher.spec(0).renderer, spec.renderer);
    assert!(h
        .observer
        .titles
        .lock()
        .unwrap()
        .contains(&"Title of second".to_string()));

    h.supervisor.shutdown();
}

#[test]
fn test_new_session_replaces_previous() {
    let h = HarnessBuilder::new().build();
    let first = h.supervisor.start_session("https://videos.example/a", 3).unwrap();
    assert!(wait_until(|| first.state() == SessionState::Monitoring));

    let second = h.supervisor.start_session("https://videos.example/b", 3).unwrap();
    assert_eq!(first.state(), SessionState::Stopped);
    assert_ne!(first.id(), second.id());
    assert_eq!(h.launcher.terminations(0), 1);

    assert!(wait_until(|| second.state() == SessionState::Monitoring));
    assert_eq!(h.launcher.count(), 2);
    h.supervisor.shutdown();
}

#[test]
fn test_exited_renderer_restarts_without_waiting_for_probe() {
    let h = HarnessBuilder::new().build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();
    assert!(wait_until(|| handle.state() == SessionState::Monitoring));

    h.launcher.kill_renderer(0);
    assert!(wait_until(|| h.launcher.count() == 2));
    assert_eq!(h.launcher.terminations(0), 1);

    h.supervisor.shutdown();
}

#[test]
fn test_failing_spawns_are_paced_by_poll_interval() {
    let h = HarnessBuilder::new()
        .launcher(FakeLauncher::failing_first(usize::MAX))
        .build();
    let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();

    thread::sleep(Duration::from_millis(300));
    let attempts = h.launcher.attempts.load(Ordering::SeqCst);
    handle.stop();
    h.supervisor.wait();

    // 10ms poll interval: about 30 attempts, never a busy loop
    assert!(attempts >= 2, "only {attempts} attempts");
    assert!(attempts <= 40, "{attempts} attempts in 300ms");
    assert_eq!(h.launcher.count(), 0);
    assert_eq!(handle.state(), SessionState::Stopped);
}

#[test]
fn test_stop_racing_confirmation_deadline() {
    for _ in 0..10 {
        let h = HarnessBuilder::new()
            .probe(ScriptedProbe::with(vec![Ok(false)]))
            .policy(confirm(Duration::from_millis(20)))
            .build();
        let handle = h.supervisor.start_session("https://videos.example/a", 3).unwrap();

        assert!(wait_until(|| !h.observer.confirmations().is_empty()));
        let request = h.observer.confirmations()[0].clone();
        thread::sleep(request.remaining());
        handle.stop();
        h.supervisor.wait();

        assert_eq!(handle.state(), SessionState::Stopped);
        assert!(!h.launcher.any_running());

        // Nothing is launched once the stop has landed
        let launched = h.launcher.count();
        assert!(launched <= 2);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(h.launcher.count(), launched);
        assert!(!request.respond(true));
    }
}
