//! `yt-dlp` backed catalog
//!
//! Runs `yt-dlp -J` (metadata only, no download) and parses the JSON. The
//! last response is cached briefly so that a title lookup followed by an
//! encoding listing for the same URL costs one network round trip.

use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{mpsc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

use super::{StreamCatalog, UNKNOWN_TITLE};
use crate::error::CatalogError;
use crate::models::Encoding;

/// Upper bound on one metadata query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// How long a response is reused for the same URL.
const CACHE_TTL: Duration = Duration::from_secs(30);

/// Time allowed for reader threads to hand over output after exit.
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Error fragments meaning the URL itself is bad, as opposed to the source
/// being unreachable.
const NOT_FOUND_MARKERS: &[&str] = &[
    "Unsupported URL",
    "is not a valid URL",
    "Video unavailable",
    "HTTP Error 404",
    "Private video",
    "This video has been removed",
];

#[derive(Debug, Clone, Deserialize)]
pub struct RawInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub abr: Option<f64>,
    pub tbr: Option<f64>,
}

impl RawFormat {
    /// Validate into a typed [`Encoding`].
    ///
    /// A codec reported as `"none"` marks the track as absent; an unreported
    /// codec is assumed present.
    pub fn into_encoding(self) -> Encoding {
        let has_video = self.vcodec.as_deref() != Some("none");
        let has_audio = self.acodec.as_deref() != Some("none");
        let known = |codec: Option<String>| codec.filter(|c| c != "none");

        Encoding {
            id: self.format_id,
            width: self.width.unwrap_or(0),
            height: self.height.unwrap_or(0),
            video_codec: known(self.vcodec),
            audio_codec: known(self.acodec),
            bitrate_kbps: self.abr.or(self.tbr),
            has_video,
            has_audio,
        }
    }
}

impl RawInfo {
    pub fn title(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }

    pub fn encodings(&self) -> Vec<Encoding> {
        self.formats.iter().cloned().map(RawFormat::into_encoding).collect()
    }
}

struct CachedInfo {
    url: String,
    fetched_at: Instant,
    info: RawInfo,
}

pub struct YtDlpCatalog {
    program: PathBuf,
    timeout: Duration,
    cache: Mutex<Option<CachedInfo>>,
}

impl YtDlpCatalog {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_QUERY_TIMEOUT,
            cache: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn info(&self, url: &str) -> Result<RawInfo, CatalogError> {
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = cache.as_ref() {
                if cached.url == url && cached.fetched_at.elapsed() < CACHE_TTL {
                    return Ok(cached.info.clone());
                }
            }
        }

        let info = self.query(url)?;
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(CachedInfo {
            url: url.to_string(),
            fetched_at: Instant::now(),
            info: info.clone(),
        });
        Ok(info)
    }

    fn query(&self, url: &str) -> Result<RawInfo, CatalogError> {
        tracing::debug!(url, program = %self.program.display(), "querying stream catalog");

        let unreachable = |message: String| CatalogError::Unreachable {
            url: url.to_string(),
            message,
        };

        let mut child = Command::new(&self.program)
            .args(["-J", "--no-warnings", "--quiet", "--no-playlist", "--"])
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unreachable(format!("failed to run {}: {e}", self.program.display())))?;

        // Drain both pipes while waiting; a full pipe would block the child
        let stdout_rx = read_in_background(child.stdout.take());
        let stderr_rx = read_in_background(child.stderr.take());

        let status = child
            .wait_timeout(self.timeout)
            .map_err(|e| unreachable(format!("failed to wait for catalog query: {e}")))?;

        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(unreachable(format!(
                "catalog query timed out after {}s",
                self.timeout.as_secs()
            )));
        };

        let stdout = stdout_rx.recv_timeout(OUTPUT_COLLECTION_TIMEOUT).unwrap_or_default();
        let stderr = stderr_rx.recv_timeout(OUTPUT_COLLECTION_TIMEOUT).unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr);

        if !status.success() {
            return Err(classify_failure(url, &stderr));
        }

        parse_info(&stdout)
    }
}

impl StreamCatalog for YtDlpCatalog {
    fn list_encodings(&self, url: &str) -> Result<Vec<Encoding>, CatalogError> {
        Ok(self.info(url)?.encodings())
    }

    fn title_of(&self, url: &str) -> Result<String, CatalogError> {
        Ok(self.info(url)?.title())
    }
}

fn read_in_background<R: Read + Send + 'static>(stream: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    match stream {
        Some(mut stream) => {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stream.read_to_end(&mut buf);
                let _ = tx.send(buf);
            });
        }
        None => {
            let _ = tx.send(Vec::new());
        }
    }
    rx
}

pub fn parse_info(json: &[u8]) -> Result<RawInfo, CatalogError> {
    serde_json::from_slice(json).map_err(|e| CatalogError::Malformed(e.to_string()))
}

/// Map a failed query's stderr to an error kind.
pub fn classify_failure(url: &str, stderr: &str) -> CatalogError {
    let message = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("catalog query failed")
        .to_string();

    if NOT_FOUND_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        CatalogError::NotFound {
            url: url.to_string(),
            message,
        }
    } else {
        CatalogError::Unreachable {
            url: url.to_string(),
            message,
        }
    }
}
