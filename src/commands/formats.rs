//! Formats command - shows what the selector sees and what it picks

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use super::common::{downloader_catalog, load_config, resolve_divisions, resolve_screen};
use crate::catalog::StreamCatalog;
use crate::config::DivisionsStore;
use crate::models::constants::FALLBACK_FORMAT_SELECTOR;
use crate::models::{ScreenSize, TileGeometry};
use crate::selector::{format_listing, select_from_partition};

pub fn execute(
    config_path: Option<&Path>,
    url: &str,
    divisions: Option<u32>,
    screen: Option<ScreenSize>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let screen = resolve_screen(screen, &config)?;
    let divisions = resolve_divisions(divisions, DivisionsStore::default_location().as_ref());
    let tile = TileGeometry::new(divisions, screen)?;

    let catalog = downloader_catalog(&config)?;

    let title = catalog.title_of(url).context("Failed to query stream")?;
    let encodings = catalog.list_encodings(url).context("Failed to query stream")?;

    let selector = config.selector();
    let partition = selector.partition(&encodings);

    println!("{} {}", "Title:".bold(), title);
    println!();
    print!("{}", format_listing(&partition));
    println!();
    println!(
        "{} {}x{} grid ({} tiles) on {} → tile {:.0}x{:.0}",
        "Geometry:".bold(),
        divisions,
        divisions,
        tile.tile_count(),
        screen,
        tile.tile_width(),
        tile.tile_height()
    );

    match select_from_partition(&partition, &tile) {
        Some(format) => {
            let kind = if format.is_composite() {
                "composite"
            } else {
                "combined"
            };
            println!("{} {} ({kind})", "Selected:".bold(), format.to_string().green().bold());
        }
        None => println!(
            "{} no usable encoding, falling back to {}",
            "Selected:".bold(),
            FALLBACK_FORMAT_SELECTOR.yellow()
        ),
    }

    Ok(())
}
