//! External tool discovery
//!
//! Locates the downloader (`yt-dlp`), muxer (`ffmpeg`) and renderer
//! (`ffplay`). Search order per tool: explicit override, `PATH`, the
//! directory of the running executable, then its `bin/` subdirectory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

pub const DOWNLOADER: &str = "yt-dlp";
pub const MUXER: &str = "ffmpeg";
pub const RENDERER: &str = "ffplay";

/// Optional explicit tool locations from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOverrides {
    pub yt_dlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ffplay: Option<PathBuf>,
}

/// Resolved paths of all three tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub downloader: PathBuf,
    pub muxer: PathBuf,
    pub renderer: PathBuf,
}

/// A tool that could not be located anywhere.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("required executable not found: {tool}")]
pub struct MissingTool {
    pub tool: String,
}

impl From<MissingTool> for ConfigurationError {
    fn from(missing: MissingTool) -> Self {
        ConfigurationError::MissingExecutable { tool: missing.tool }
    }
}

impl ToolPaths {
    /// Resolve every tool, failing on the first one that is absent.
    pub fn discover(overrides: &ToolOverrides) -> Result<Self, MissingTool> {
        let dirs = application_dirs();
        Ok(Self {
            downloader: resolve(DOWNLOADER, overrides.yt_dlp.as_deref(), &dirs)?,
            muxer: resolve(MUXER, overrides.ffmpeg.as_deref(), &dirs)?,
            renderer: resolve(RENDERER, overrides.ffplay.as_deref(), &dirs)?,
        })
    }
}

/// Availability of one tool, for the `tools` command.
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: &'static str,
    pub path: Option<PathBuf>,
}

pub fn check_all(overrides: &ToolOverrides) -> Vec<ToolStatus> {
    let dirs = application_dirs();
    [
        (DOWNLOADER, overrides.yt_dlp.as_deref()),
        (MUXER, overrides.ffmpeg.as_deref()),
        (RENDERER, overrides.ffplay.as_deref()),
    ]
    .into_iter()
    .map(|(name, custom)| ToolStatus {
        name,
        path: resolve(name, custom, &dirs).ok(),
    })
    .collect()
}

/// Resolve only the downloader, for commands that just query the catalog.
pub fn discover_downloader(overrides: &ToolOverrides) -> Result<PathBuf, MissingTool> {
    resolve(DOWNLOADER, overrides.yt_dlp.as_deref(), &application_dirs())
}

fn resolve(name: &str, custom: Option<&Path>, dirs: &[PathBuf]) -> Result<PathBuf, MissingTool> {
    if let Some(path) = custom {
        if is_executable(path) {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            tool = name,
            path = %path.display(),
            "configured tool path is not an executable file, searching instead"
        );
    }
    find_executable(name, dirs).ok_or_else(|| MissingTool {
        tool: name.to_string(),
    })
}

/// Search `PATH`, then each of `dirs` in order.
pub fn find_executable(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    if let Ok(path) = which::which(name) {
        if is_executable(&path) {
            return Some(path);
        }
    }
    search_dirs(name, dirs)
}

fn search_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let file_name = format!("{name}{}", std::env::consts::EXE_SUFFIX);
    dirs.iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| is_executable(candidate))
}

/// Directory of the running executable and its `bin/` subdirectory.
pub fn application_dirs() -> Vec<PathBuf> {
    let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    else {
        return Vec::new();
    };
    let bin_dir = exe_dir.join("bin");
    vec![exe_dir, bin_dir]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
