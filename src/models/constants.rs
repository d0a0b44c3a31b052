/// Smallest grid: a single tile showing the source frame once.
pub const MIN_DIVISIONS: u32 = 1;

/// Largest grid the renderer filter chain is driven with.
pub const MAX_DIVISIONS: u32 = 50;

/// Divisions used when no valid preference has been persisted.
pub const DEFAULT_DIVISIONS: u32 = 3;

/// Video codec families excluded from selection by default.
/// VP9 streams mis-tile when piped through the renderer's tile filter.
pub const DEFAULT_DENIED_CODECS: &[&str] = &["vp09"];

/// Selector handed to the downloader when no explicit encoding was chosen.
pub const FALLBACK_FORMAT_SELECTOR: &str = "bestvideo+bestaudio/best";

/// Desktop browser user-agent sent by the downloader.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Returns true if `divisions` lies within the supported grid range.
pub fn divisions_in_range(divisions: u32) -> bool {
    (MIN_DIVISIONS..=MAX_DIVISIONS).contains(&divisions)
}
