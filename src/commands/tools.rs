//! Tools command - reports where each external tool was found

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;

use super::common::load_config;
use crate::tools::{check_all, ToolStatus};

pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let statuses = check_all(&config.tools);

    for status in &statuses {
        println!("{}", status_line(status));
    }

    let missing: Vec<&str> = statuses
        .iter()
        .filter(|s| s.path.is_none())
        .map(|s| s.name)
        .collect();
    if !missing.is_empty() {
        bail!("Missing required tools: {}", missing.join(", "));
    }
    Ok(())
}

fn status_line(status: &ToolStatus) -> String {
    match &status.path {
        Some(path) => format!(
            "{} {:<8} {}",
            "✓".green().bold(),
            status.name,
            path.display()
        ),
        None => format!("{} {:<8} {}", "✗".red().bold(), status.name, "not found".dimmed()),
    }
}
