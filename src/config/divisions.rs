//! Persisted grid divisions preference
//!
//! A one-line text file holding the last used divisions count. Anything
//! unreadable or out of range loads as the default; saves are best effort.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::constants::{divisions_in_range, DEFAULT_DIVISIONS};

const FILE_NAME: &str = "divisions.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionsStore {
    path: PathBuf,
}

impl DivisionsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the user's data directory, if one exists.
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|dir| Self::new(dir.join("videotiler").join(FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored divisions, or the default when absent or invalid.
    pub fn load(&self) -> u32 {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_divisions(&content).unwrap_or_else(|| {
                tracing::debug!(
                    path = %self.path.display(),
                    content = content.trim(),
                    "ignoring invalid divisions preference"
                );
                DEFAULT_DIVISIONS
            }),
            Err(_) => DEFAULT_DIVISIONS,
        }
    }

    pub fn save(&self, divisions: u32) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, divisions.to_string())
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Save, logging instead of failing.
    pub fn save_best_effort(&self, divisions: u32) {
        if let Err(e) = self.save(divisions) {
            tracing::debug!(error = %e, "divisions preference not saved");
        }
    }
}

/// Parse a divisions value, accepting only 1..=50.
pub fn parse_divisions(text: &str) -> Option<u32> {
    text.trim().parse().ok().filter(|d| divisions_in_range(*d))
}
