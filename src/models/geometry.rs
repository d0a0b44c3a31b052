use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::constants::divisions_in_range;
use crate::error::ConfigurationError;

/// Resolution of the display the wall is rendered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ScreenSize {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigurationError::Display(format!("expected WIDTHxHEIGHT, got '{s}'"));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Grid configuration for one playback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    divisions: u32,
    screen: ScreenSize,
}

impl TileGeometry {
    pub fn new(divisions: u32, screen: ScreenSize) -> Result<Self, ConfigurationError> {
        if !divisions_in_range(divisions) {
            return Err(ConfigurationError::InvalidDivisions(divisions));
        }
        Ok(Self { divisions, screen })
    }

    pub fn divisions(&self) -> u32 {
        self.divisions
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn tile_width(&self) -> f64 {
        f64::from(self.screen.width) / f64::from(self.divisions)
    }

    pub fn tile_height(&self) -> f64 {
        f64::from(self.screen.height) / f64::from(self.divisions)
    }

    /// Number of source frames packed into each rendered frame.
    pub fn tile_count(&self) -> u32 {
        self.divisions * self.divisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_size_for_three_divisions() {
        let geometry = TileGeometry::new(3, ScreenSize::new(1920, 1080)).unwrap();
        assert_eq!(geometry.tile_width(), 640.0);
        assert_eq!(geometry.tile_height(), 360.0);
        assert_eq!(geometry.tile_count(), 9);
    }

    #[test]
    fn test_divisions_out_of_range_rejected() {
        let screen = ScreenSize::new(1920, 1080);
        assert!(matches!(
            TileGeometry::new(0, screen),
            Err(ConfigurationError::InvalidDivisions(0))
        ));
        assert!(matches!(
            TileGeometry::new(51, screen),
            Err(ConfigurationError::InvalidDivisions(51))
        ));
        assert!(TileGeometry::new(50, screen).is_ok());
    }

    #[test]
    fn test_screen_size_parse() {
        assert_eq!("1920x1080".parse::<ScreenSize>().unwrap(), ScreenSize::new(1920, 1080));
        assert_eq!(" 3840X2160 ".parse::<ScreenSize>().unwrap(), ScreenSize::new(3840, 2160));
        assert!("1920".parse::<ScreenSize>().is_err());
        assert!("0x1080".parse::<ScreenSize>().is_err());
        assert!("axb".parse::<ScreenSize>().is_err());
    }
}
