//! Helpers shared by the command handlers

use anyhow::{Context, Result};
use std::path::Path;

use crate::catalog::YtDlpCatalog;
use crate::config::{DivisionsStore, TilerConfig};
use crate::display;
use crate::models::constants::DEFAULT_DIVISIONS;
use crate::models::ScreenSize;
use crate::tools::{discover_downloader, DOWNLOADER};

pub fn load_config(path: Option<&Path>) -> Result<TilerConfig> {
    TilerConfig::load(path).context("Failed to load configuration")
}

/// `--screen` if given, else the config override, else the primary
/// monitor.
pub fn resolve_screen(cli: Option<ScreenSize>, config: &TilerConfig) -> Result<ScreenSize> {
    let configured = config.screen_override()?;
    let screen = display::primary_screen(cli.or(configured))?;
    tracing::debug!(%screen, "screen resolution");
    Ok(screen)
}

/// Catalog backed by the configured or discovered downloader.
pub fn downloader_catalog(config: &TilerConfig) -> Result<YtDlpCatalog> {
    let program = discover_downloader(&config.tools)
        .with_context(|| format!("{DOWNLOADER} is required to query streams"))?;
    tracing::debug!(program = %program.display(), "using downloader for catalog queries");
    Ok(YtDlpCatalog::new(program))
}

/// `-d` if given, else the persisted preference.
pub fn resolve_divisions(cli: Option<u32>, store: Option<&DivisionsStore>) -> u32 {
    cli.unwrap_or_else(|| store.map_or(DEFAULT_DIVISIONS, DivisionsStore::load))
}
