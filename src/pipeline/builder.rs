//! Command construction for the downloader and renderer
//!
//! Pure: produces a [`PipelineSpec`] without touching the OS.

use crate::models::constants::{DESKTOP_USER_AGENT, FALLBACK_FORMAT_SELECTOR};
use crate::models::{CommandSpec, PipelineSpec, SelectedFormat, TileGeometry};
use crate::tools::ToolPaths;

#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    tools: ToolPaths,
    user_agent: String,
}

impl PipelineBuilder {
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            tools,
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build both invocations for one attempt.
    ///
    /// `format == None` requests the downloader's generic best-available
    /// selector; no resolution guarantee applies then.
    pub fn build(
        &self,
        url: &str,
        format: Option<&SelectedFormat>,
        tile: &TileGeometry,
    ) -> PipelineSpec {
        PipelineSpec {
            downloader: self.downloader(url, format),
            renderer: self.renderer(tile),
        }
    }

    fn downloader(&self, url: &str, format: Option<&SelectedFormat>) -> CommandSpec {
        let selector = format
            .map(SelectedFormat::specifier)
            .unwrap_or_else(|| FALLBACK_FORMAT_SELECTOR.to_string());

        CommandSpec::new(&self.tools.downloader)
            .args(["--user-agent", self.user_agent.as_str()])
            // IPv4 only: the source throttles or rejects some IPv6 ranges
            .arg("-4")
            .args(["-f", selector.as_str()])
            .args(["-o", "-"])
            .args(["--quiet", "--no-warnings"])
            .arg("--ffmpeg-location")
            .arg(self.tools.muxer.to_string_lossy())
            .arg("--")
            .arg(url)
    }

    fn renderer(&self, tile: &TileGeometry) -> CommandSpec {
        CommandSpec::new(&self.tools.renderer)
            .arg("-")
            .args(["-vf", tile_filter(tile.divisions()).as_str()])
            .arg("-autoexit")
            .args(["-loglevel", "error"])
            .arg("-hide_banner")
            .arg("-fs")
    }
}

/// Filter chain replicating each source frame across a `d`x`d` grid.
///
/// `tile` packs `d²` consecutive frames into one output frame, so the
/// frame rate is multiplied by `d²` first to keep playback speed.
pub fn tile_filter(divisions: u32) -> String {
    let d = divisions;
    format!("scale=w=iw*{d}/{d}:h=ih*{d}/{d},fps=source_fps*{d}*{d},tile={d}x{d}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScreenSize;
    use std::path::PathBuf;

    fn builder() -> PipelineBuilder {
        PipelineBuilder::new(ToolPaths {
            downloader: PathBuf::from("/usr/bin/yt-dlp"),
            muxer: PathBuf::from("/usr/bin/ffmpeg"),
            renderer: PathBuf::from("/usr/bin/ffplay"),
        })
    }

    fn tile(divisions: u32) -> TileGeometry {
        TileGeometry::new(divisions, ScreenSize::new(1920, 1080)).unwrap()
    }

    #[test]
    fn test_downloader_with_selected_format() {
        let format = SelectedFormat::Single("18".into());
        let spec = builder().build("https://example.com/watch?v=x", Some(&format), &tile(3));
        let d = &spec.downloader;

        assert_eq!(d.program, PathBuf::from("/usr/bin/yt-dlp"));
        assert_eq!(d.value_of("-f"), Some("18"));
        assert_eq!(d.value_of("-o"), Some("-"));
        assert_eq!(d.value_of("--user-agent"), Some(DESKTOP_USER_AGENT));
        assert_eq!(d.value_of("--ffmpeg-location"), Some("/usr/bin/ffmpeg"));
        assert!(d.args.contains(&"-4".to_string()));
        assert!(d.args.contains(&"--quiet".to_string()));
        assert!(d.args.contains(&"--no-warnings".to_string()));
        assert_eq!(d.args.last().map(String::as_str), Some("https://example.com/watch?v=x"));
        assert_eq!(d.value_of("--"), Some("https://example.com/watch?v=x"));
    }

    #[test]
    fn test_downloader_composite_and_fallback() {
        let composite = SelectedFormat::Composite {
            video: "137".into(),
            audio: "140".into(),
        };
        let spec = builder().build("u", Some(&composite), &tile(2));
        assert_eq!(spec.downloader.value_of("-f"), Some("137+140"));

        let spec = builder().build("u", None, &tile(2));
        assert_eq!(spec.downloader.value_of("-f"), Some(FALLBACK_FORMAT_SELECTOR));
        // Degraded mode still forces IPv4 and the browser user-agent
        assert!(spec.downloader.args.contains(&"-4".to_string()));
        assert!(spec.downloader.value_of("--user-agent").is_some());
    }

    #[test]
    fn test_custom_user_agent() {
        let spec = builder()
            .with_user_agent("Agent/1.0")
            .build("u", None, &tile(1));
        assert_eq!(spec.downloader.value_of("--user-agent"), Some("Agent/1.0"));
    }

    #[test]
    fn test_renderer_arguments() {
        let spec = builder().build("u", None, &tile(3));
        let r = &spec.renderer;

        assert_eq!(r.args.first().map(String::as_str), Some("-"));
        assert_eq!(
            r.value_of("-vf"),
            Some("scale=w=iw*3/3:h=ih*3/3,fps=source_fps*3*3,tile=3x3")
        );
        assert_eq!(r.value_of("-loglevel"), Some("error"));
        for flag in ["-autoexit", "-hide_banner", "-fs"] {
            assert!(r.args.contains(&flag.to_string()), "missing {flag}");
        }
    }

    #[test]
    fn test_filter_multiplier_and_grid_for_all_divisions() {
        for d in 1..=50u32 {
            let filter = tile_filter(d);
            let fps = filter
                .split(',')
                .find_map(|part| part.strip_prefix("fps=source_fps*"))
                .unwrap();
            let product: u32 = fps.split('*').map(|n| n.parse::<u32>().unwrap()).product();
            assert_eq!(product, d * d, "fps multiplier for {d}");

            let grid = filter
                .split(',')
                .find_map(|part| part.strip_prefix("tile="))
                .unwrap();
            assert_eq!(grid, format!("{d}x{d}"));
        }
    }
}
