use anyhow::{Context, Result};
use std::path::Path;

use super::common::{downloader_catalog, load_config};
use crate::catalog::StreamCatalog;

/// Print the stream title.
pub fn execute(config_path: Option<&Path>, url: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let title = downloader_catalog(&config)?
        .title_of(url)
        .context("Failed to query stream")?;
    println!("{title}");
    Ok(())
}
