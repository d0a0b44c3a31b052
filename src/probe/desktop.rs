//! Desktop window enumeration (X11)
//!
//! Uses `wmctrl -lp` when installed, since one call lists every managed
//! window with its owning PID. `xdotool` is the fallback and is queried
//! per renderer PID.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use super::{poll_inspection, Inspection, PipelineNames, WindowProbe, PROBE_INTERVAL};
use crate::error::ProbeError;

/// External tool used to list top-level windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowLister {
    Wmctrl(PathBuf),
    Xdotool(PathBuf),
}

impl WindowLister {
    /// Locate `wmctrl`, else `xdotool`.
    pub fn detect() -> Option<Self> {
        if let Ok(path) = which::which("wmctrl") {
            return Some(WindowLister::Wmctrl(path));
        }
        if let Ok(path) = which::which("xdotool") {
            return Some(WindowLister::Xdotool(path));
        }
        None
    }

    fn tool_name(&self) -> &'static str {
        match self {
            WindowLister::Wmctrl(_) => "wmctrl",
            WindowLister::Xdotool(_) => "xdotool",
        }
    }

    /// Whether any of `pids` owns a visible top-level window.
    pub fn any_window_owned_by(&self, pids: &[u32]) -> Result<bool, ProbeError> {
        match self {
            WindowLister::Wmctrl(path) => {
                let stdout = self.run(Command::new(path).arg("-lp"), false)?;
                let owners = parse_wmctrl_owners(&stdout);
                Ok(pids.iter().any(|pid| owners.contains(pid)))
            }
            WindowLister::Xdotool(path) => {
                for pid in pids {
                    let stdout = self.run(
                        Command::new(path).args(["search", "--onlyvisible", "--pid", &pid.to_string()]),
                        true,
                    )?;
                    if stdout.lines().any(|line| !line.trim().is_empty()) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Run the lister and return its stdout.
    ///
    /// `xdotool search` exits 1 when nothing matches, which is not an error
    /// as long as it printed nothing on stderr.
    fn run(&self, command: &mut Command, empty_exit_ok: bool) -> Result<String, ProbeError> {
        let output = command.output().map_err(|e| ProbeError::WindowQuery {
            tool: self.tool_name().to_string(),
            message: e.to_string(),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let quiet_miss = empty_exit_ok && output.status.code() == Some(1) && stderr.trim().is_empty();
        if !output.status.success() && !quiet_miss {
            return Err(ProbeError::WindowQuery {
                tool: self.tool_name().to_string(),
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl fmt::Display for WindowLister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Owning PIDs from `wmctrl -lp` output.
///
/// Columns: window id, desktop, pid, host, title. Windows without a known
/// owner report pid 0 and are skipped.
pub fn parse_wmctrl_owners(output: &str) -> HashSet<u32> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(2))
        .filter_map(|pid| pid.parse::<u32>().ok())
        .filter(|pid| *pid != 0)
        .collect()
}

/// Requires the renderer to own a visible window.
#[derive(Debug, Clone)]
pub struct DesktopWindowProbe {
    names: PipelineNames,
    lister: WindowLister,
}

impl DesktopWindowProbe {
    pub fn new(names: PipelineNames, lister: WindowLister) -> Self {
        Self { names, lister }
    }

    fn inspect(&self, root_pid: u32) -> Result<Inspection, ProbeError> {
        let renderers = match self.names.locate(root_pid)? {
            Ok(renderers) => renderers,
            Err(missing) => return Ok(missing),
        };

        let pids: Vec<u32> = renderers.iter().map(|p| p.pid).collect();
        if self.lister.any_window_owned_by(&pids)? {
            Ok(Inspection::WindowVisible)
        } else {
            Ok(Inspection::NoWindow)
        }
    }
}

impl WindowProbe for DesktopWindowProbe {
    fn probe_renderer_alive(&self, root_pid: u32, timeout: Duration) -> Result<bool, ProbeError> {
        let alive = poll_inspection(PROBE_INTERVAL, timeout, || self.inspect(root_pid))?;
        if !alive {
            tracing::debug!(renderer = %self.names.renderer, lister = %self.lister, "no renderer window found");
        }
        Ok(alive)
    }
}
