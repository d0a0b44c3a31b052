//! Downloader → renderer pipeline
//!
//! [`builder`] turns a stream URL, a chosen format and a tile geometry into
//! two command lines. [`process`] runs them as a connected pair and tears
//! them down again. The supervisor only talks to the traits below, so tests
//! can substitute a scripted launcher.

pub mod builder;
pub mod process;
pub mod tree;

use std::time::Duration;

use crate::error::SpawnError;
use crate::models::PipelineSpec;

pub use builder::{tile_filter, PipelineBuilder};
pub use process::ProcessPipeline;

/// A started pipeline the supervisor can observe and kill.
pub trait RunningPipeline: Send {
    /// False once the downloader has exited for any reason.
    fn is_downloader_alive(&mut self) -> bool;

    /// False once the renderer has exited. Reaps it, so an exited renderer
    /// never lingers in the process table.
    fn is_renderer_alive(&mut self) -> bool {
        true
    }

    /// Stop both processes and everything they spawned. Must be safe to
    /// call repeatedly.
    fn terminate(&mut self);

    /// Last diagnostic line emitted by a child, if any.
    fn last_error(&self) -> Option<String> {
        None
    }
}

/// Starts pipelines from a [`PipelineSpec`].
pub trait PipelineLauncher: Send + Sync {
    fn launch(&self, spec: &PipelineSpec) -> Result<Box<dyn RunningPipeline>, SpawnError>;
}

/// Launches real OS processes.
#[derive(Debug, Clone)]
pub struct OsLauncher {
    grace: Duration,
}

impl OsLauncher {
    /// `grace` is how long terminated processes get to exit before SIGKILL.
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }
}

impl PipelineLauncher for OsLauncher {
    fn launch(&self, spec: &PipelineSpec) -> Result<Box<dyn RunningPipeline>, SpawnError> {
        let pipeline = ProcessPipeline::spawn(spec, self.grace)?;
        Ok(Box::new(pipeline))
    }
}
