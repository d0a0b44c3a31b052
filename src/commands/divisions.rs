//! Divisions command - shows or sets the persisted grid preference

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::config::DivisionsStore;
use crate::models::constants::{divisions_in_range, MAX_DIVISIONS, MIN_DIVISIONS};

pub fn execute(value: Option<u32>) -> Result<()> {
    let store = DivisionsStore::default_location().context("No user data directory available")?;
    run(&store, value)
}

pub fn run(store: &DivisionsStore, value: Option<u32>) -> Result<()> {
    match value {
        None => {
            println!("{}", store.load());
        }
        Some(divisions) => {
            if !divisions_in_range(divisions) {
                bail!("Divisions must be between {MIN_DIVISIONS} and {MAX_DIVISIONS}, got {divisions}");
            }
            store.save(divisions)?;
            println!("{} Divisions set to {divisions}", "✓".green().bold());
        }
    }
    Ok(())
}
