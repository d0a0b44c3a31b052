//! Renderer liveness probing
//!
//! A renderer process that exists is not proof of playback: it can survive
//! after its window died (codec negotiation failure, closed by the user).
//! Probes walk the process tree below the supervisor and, where the desktop
//! allows it, require a visible top-level window owned by the renderer.

pub mod desktop;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ProbeError;
use crate::pipeline::tree::{descendants_of, is_instance_of, read_process_table, ProcessEntry};
use crate::tools::ToolPaths;

pub use desktop::{DesktopWindowProbe, WindowLister};

/// Interval between inspections while waiting for a window.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Capability the supervisor uses to decide whether playback is healthy.
pub trait WindowProbe: Send + Sync {
    /// `Ok(true)` once a live renderer below `root_pid` is confirmed, within
    /// `timeout`. `Ok(false)` on timeout or as soon as either pipeline
    /// process is found missing.
    fn probe_renderer_alive(&self, root_pid: u32, timeout: Duration) -> Result<bool, ProbeError>;
}

/// Outcome of a single look at the process tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inspection {
    DownloaderMissing,
    RendererMissing,
    NoWindow,
    WindowVisible,
}

/// Repeat `inspect` every `interval` until a window shows up or `timeout`
/// elapses. A missing process ends the wait immediately.
pub fn poll_inspection<F>(interval: Duration, timeout: Duration, mut inspect: F) -> Result<bool, ProbeError>
where
    F: FnMut() -> Result<Inspection, ProbeError>,
{
    let deadline = Instant::now() + timeout;

    loop {
        match inspect()? {
            Inspection::WindowVisible => return Ok(true),
            Inspection::DownloaderMissing | Inspection::RendererMissing => return Ok(false),
            Inspection::NoWindow => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        thread::sleep(interval.min(deadline - now));
    }
}

/// Names of the two pipeline executables as they appear in the process
/// table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineNames {
    pub downloader: String,
    pub renderer: String,
}

impl Default for PipelineNames {
    fn default() -> Self {
        Self {
            downloader: crate::tools::DOWNLOADER.to_string(),
            renderer: crate::tools::RENDERER.to_string(),
        }
    }
}

impl PipelineNames {
    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self {
            downloader: crate::models::pipeline::program_name(&tools.downloader),
            renderer: crate::models::pipeline::program_name(&tools.renderer),
        }
    }

    /// Locate both pipeline processes below `root_pid`.
    ///
    /// Returns the matching renderer processes, or the inspection result
    /// explaining which one is missing. Exited processes still waiting to be
    /// reaped count as missing.
    pub fn locate(&self, root_pid: u32) -> Result<Result<Vec<ProcessEntry>, Inspection>, ProbeError> {
        let table = read_process_table().map_err(ProbeError::ProcessTable)?;
        let subtree: Vec<ProcessEntry> = descendants_of(&table, root_pid)
            .into_iter()
            .filter(|p| !p.is_exited())
            .collect();

        if !subtree.iter().any(|p| is_instance_of(p, &self.downloader)) {
            return Ok(Err(Inspection::DownloaderMissing));
        }

        let renderers: Vec<ProcessEntry> = subtree
            .into_iter()
            .filter(|p| is_instance_of(p, &self.renderer))
            .collect();
        if renderers.is_empty() {
            return Ok(Err(Inspection::RendererMissing));
        }

        Ok(Ok(renderers))
    }
}

/// Probe for targets without window enumeration: a running renderer is
/// taken as proof of playback.
#[derive(Debug, Clone)]
pub struct ProcessOnlyProbe {
    names: PipelineNames,
}

impl ProcessOnlyProbe {
    pub fn new(names: PipelineNames) -> Self {
        Self { names }
    }
}

impl WindowProbe for ProcessOnlyProbe {
    fn probe_renderer_alive(&self, root_pid: u32, timeout: Duration) -> Result<bool, ProbeError> {
        poll_inspection(PROBE_INTERVAL, timeout, || {
            Ok(match self.names.locate(root_pid)? {
                Ok(_) => Inspection::WindowVisible,
                Err(missing) => missing,
            })
        })
    }
}

/// Pick the strongest probe available on this machine.
///
/// Falls back to [`ProcessOnlyProbe`] when window checks are disabled or no
/// window tool is installed.
pub fn for_desktop(check_windows: bool, tools: &ToolPaths) -> Arc<dyn WindowProbe> {
    let names = PipelineNames::from_tools(tools);

    if check_windows {
        match WindowLister::detect() {
            Some(lister) => {
                tracing::debug!(lister = %lister, "using desktop window probe");
                return Arc::new(DesktopWindowProbe::new(names, lister));
            }
            None => tracing::warn!(
                "neither wmctrl nor xdotool found; renderer windows will not be verified"
            ),
        }
    }

    Arc::new(ProcessOnlyProbe::new(names))
}
