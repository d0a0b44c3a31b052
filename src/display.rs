//! Primary display resolution
//!
//! Reads the primary monitor geometry from `xrandr`. Only one monitor is
//! considered; multi-monitor layout is not handled.

use regex::Regex;
use std::process::Command;
use std::sync::OnceLock;

use crate::error::ConfigurationError;
use crate::models::ScreenSize;

fn output_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\S+ connected (primary )?(\d+)x(\d+)\+\d+\+\d+").expect("valid regex")
    })
}

fn screen_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"current (\d+) x (\d+)").expect("valid regex"))
}

/// Resolution of the primary monitor, or `override_size` when given.
pub fn primary_screen(override_size: Option<ScreenSize>) -> Result<ScreenSize, ConfigurationError> {
    if let Some(size) = override_size {
        return Ok(size);
    }

    if which::which("xrandr").is_err() {
        return Err(ConfigurationError::Display(
            "xrandr not found; pass --screen WIDTHxHEIGHT".to_string(),
        ));
    }

    let output = Command::new("xrandr")
        .arg("--current")
        .output()
        .map_err(|e| ConfigurationError::Display(format!("failed to run xrandr: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConfigurationError::Display(format!(
            "xrandr failed: {}",
            stderr.trim()
        )));
    }

    parse_xrandr(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        ConfigurationError::Display("no connected output reported by xrandr".to_string())
    })
}

/// Pick the primary output, else the first connected output, else the
/// overall screen size.
pub fn parse_xrandr(output: &str) -> Option<ScreenSize> {
    let mut first_connected = None;

    for line in output.lines() {
        let Some(caps) = output_pattern().captures(line) else {
            continue;
        };
        let (Ok(width), Ok(height)) = (caps[2].parse(), caps[3].parse()) else {
            continue;
        };
        let size = ScreenSize::new(width, height);
        if caps.get(1).is_some() {
            return Some(size);
        }
        first_connected.get_or_insert(size);
    }

    first_connected.or_else(|| {
        let caps = screen_pattern().captures(output)?;
        Some(ScreenSize::new(caps[1].parse().ok()?, caps[2].parse().ok()?))
    })
}
