//! Live downloader → renderer process pair
//!
//! The downloader's stdout is handed directly to the renderer's stdin, so
//! stream data only ever lives in the OS pipe buffer. Both stderr streams
//! are drained on background threads; an unread stderr pipe would
//! eventually block the writer and stall the whole pipeline.

use nix::sys::signal::Signal;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

use super::tree::{descendant_pids, is_process_alive, signal_group, signal_process};
use super::RunningPipeline;
use crate::error::SpawnError;
use crate::models::{CommandSpec, PipelineSpec};

/// Last non-empty stderr line seen from a child process.
type StderrTail = Arc<Mutex<Option<String>>>;

pub struct ProcessPipeline {
    downloader: Option<Child>,
    renderer: Option<Child>,
    downloader_tail: StderrTail,
    renderer_tail: StderrTail,
    grace: Duration,
}

impl ProcessPipeline {
    /// Spawn both processes and wire the pipe between them.
    ///
    /// Each process leads its own process group so the whole subtree can be
    /// signalled at once. If the renderer fails to start, the downloader is
    /// torn down before the error is returned.
    pub fn spawn(spec: &PipelineSpec, grace: Duration) -> Result<Self, SpawnError> {
        let mut downloader = command(&spec.downloader)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SpawnError::Downloader)?;

        let downloader_tail = StderrTail::default();
        drain_stderr("downloader", downloader.stderr.take(), Arc::clone(&downloader_tail));

        let mut pipeline = Self {
            downloader: None,
            renderer: None,
            downloader_tail,
            renderer_tail: StderrTail::default(),
            grace,
        };

        let Some(stdout) = downloader.stdout.take() else {
            pipeline.downloader = Some(downloader);
            pipeline.terminate();
            return Err(SpawnError::MissingPipe);
        };
        let downloader_pid = downloader.id();
        pipeline.downloader = Some(downloader);

        let renderer = command(&spec.renderer)
            .stdin(Stdio::from(stdout))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();

        let mut renderer = match renderer {
            Ok(child) => child,
            Err(e) => {
                pipeline.terminate();
                return Err(SpawnError::Renderer(e));
            }
        };
        drain_stderr(
            "renderer",
            renderer.stderr.take(),
            Arc::clone(&pipeline.renderer_tail),
        );

        tracing::info!(
            downloader_pid,
            renderer_pid = renderer.id(),
            "pipeline started"
        );
        pipeline.renderer = Some(renderer);

        Ok(pipeline)
    }

    pub fn downloader_pid(&self) -> Option<u32> {
        self.downloader.as_ref().map(Child::id)
    }

    pub fn renderer_pid(&self) -> Option<u32> {
        self.renderer.as_ref().map(Child::id)
    }

    /// True until the downloader has exited (it is reaped on first
    /// observation).
    pub fn is_downloader_alive(&mut self) -> bool {
        child_running(self.downloader.as_mut())
    }

    pub fn is_renderer_alive(&mut self) -> bool {
        child_running(self.renderer.as_mut())
    }

    /// Kill both process subtrees.
    ///
    /// SIGTERM first, SIGKILL for anything still around after the grace
    /// period. Idempotent; already-exited processes are fine.
    pub fn terminate(&mut self) {
        let children: Vec<(&'static str, Child)> = [
            ("renderer", self.renderer.take()),
            ("downloader", self.downloader.take()),
        ]
        .into_iter()
        .filter_map(|(role, child)| child.map(|c| (role, c)))
        .collect();

        if children.is_empty() {
            return;
        }

        terminate_children(children, self.grace);
    }

    /// Most recent stderr line, preferring the downloader's.
    pub fn last_error(&self) -> Option<String> {
        read_tail(&self.downloader_tail).or_else(|| read_tail(&self.renderer_tail))
    }
}

impl RunningPipeline for ProcessPipeline {
    fn is_downloader_alive(&mut self) -> bool {
        ProcessPipeline::is_downloader_alive(self)
    }

    fn is_renderer_alive(&mut self) -> bool {
        ProcessPipeline::is_renderer_alive(self)
    }

    fn terminate(&mut self) {
        ProcessPipeline::terminate(self)
    }

    fn last_error(&self) -> Option<String> {
        ProcessPipeline::last_error(self)
    }
}

impl Drop for ProcessPipeline {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn command(spec: &CommandSpec) -> Command {
    tracing::debug!(command = %spec, "spawning");
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args).process_group(0);
    cmd
}

fn child_running(child: Option<&mut Child>) -> bool {
    match child {
        Some(child) => matches!(child.try_wait(), Ok(None)),
        None => false,
    }
}

fn terminate_children(mut children: Vec<(&'static str, Child)>, grace: Duration) {
    // Collect grandchildren before the parents die and they get reparented
    let mut subtree: Vec<u32> = Vec::new();
    for (_, child) in &children {
        subtree.extend(descendant_pids(child.id()));
    }

    for (role, child) in &children {
        let pid = child.id();
        if let Err(e) = signal_group(pid, Signal::SIGTERM) {
            tracing::debug!(role, pid, error = %e, "SIGTERM to process group failed");
        }
    }
    for pid in &subtree {
        let _ = signal_process(*pid, Signal::SIGTERM);
    }

    let deadline = Instant::now() + grace;
    for (role, child) in children.iter_mut() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match child.wait_timeout(remaining) {
            Ok(Some(status)) => tracing::debug!(role, %status, "process exited"),
            Ok(None) => {
                tracing::warn!(role, pid = child.id(), "no exit after SIGTERM, killing");
                let _ = signal_group(child.id(), Signal::SIGKILL);
                let _ = child.kill();
                let _ = child.wait();
            }
            Err(e) => {
                tracing::debug!(role, error = %e, "wait failed, killing");
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }

    for pid in subtree {
        if is_process_alive(pid) {
            let _ = signal_process(pid, Signal::SIGKILL);
        }
    }
}

fn drain_stderr<R: Read + Send + 'static>(role: &'static str, stream: Option<R>, tail: StderrTail) {
    let Some(stream) = stream else {
        return;
    };

    let spawned = thread::Builder::new()
        .name(format!("{role}-stderr"))
        .spawn(move || {
            let reader = BufReader::new(stream);
            for line in reader.split(b'\n').map_while(Result::ok) {
                let line = String::from_utf8_lossy(&line).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                match role {
                    "downloader" => tracing::debug!(target: "videotiler::downloader", "{line}"),
                    _ => tracing::debug!(target: "videotiler::renderer", "{line}"),
                }
                *tail.lock().unwrap_or_else(PoisonError::into_inner) = Some(line);
            }
        });

    if let Err(e) = spawned {
        tracing::warn!(role, error = %e, "failed to start stderr drain thread");
    }
}

fn read_tail(tail: &StderrTail) -> Option<String> {
    tail.lock().unwrap_or_else(PoisonError::into_inner).clone()
}
