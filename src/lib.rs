//! Tiled video wall playback
//!
//! Pipes a network stream through a downloader into a renderer that tiles
//! each frame across an N×N grid on the primary display, and supervises the
//! pair: format selection, process wiring, liveness checks and restarts.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod probe;
pub mod selector;
pub mod supervisor;
pub mod tools;
pub mod ui;

pub use error::{CatalogError, ConfigurationError, ProbeError, SpawnError, TilerError};
pub use supervisor::{SessionHandle, SessionSupervisor, SupervisorConfig, SupervisorDeps};
