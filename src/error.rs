//! Error taxonomy for videotiler
//!
//! Of the domain errors only [`ConfigurationError`] and [`CatalogError`]
//! reach the caller of `start_session`. Spawn and probe failures are
//! absorbed by the session worker and surface as status text.

use std::io;
use std::path::PathBuf;

/// Errors returned synchronously from session start.
#[derive(Debug, thiserror::Error)]
pub enum TilerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to start session worker: {0}")]
    Worker(#[source] io::Error),
}

/// Fatal preconditions. A session that hits one of these goes to `Failed`
/// and is never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A required external tool could not be located.
    #[error("required executable not found: {tool}")]
    MissingExecutable { tool: String },

    /// Divisions outside the supported 1..=50 range.
    #[error("invalid grid divisions {0}: expected a value between 1 and 50")]
    InvalidDivisions(u32),

    /// Screen geometry could not be determined.
    #[error("cannot determine screen resolution: {0}")]
    Display(String),

    /// Config file exists but cannot be read or parsed.
    #[error("invalid config file {}: {message}", path.display())]
    ConfigFile { path: PathBuf, message: String },
}

/// Failures of the stream catalog query.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The source rejected the URL or has no such stream.
    #[error("invalid or unsupported stream URL {url}: {message}")]
    NotFound { url: String, message: String },

    /// The source could not be reached or the query did not finish.
    #[error("stream source unreachable for {url}: {message}")]
    Unreachable { url: String, message: String },

    /// The catalog answered with something we could not interpret.
    #[error("malformed catalog response: {0}")]
    Malformed(String),
}

/// OS-level failure creating one of the pipeline processes.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("failed to spawn downloader: {0}")]
    Downloader(#[source] io::Error),

    #[error("failed to spawn renderer: {0}")]
    Renderer(#[source] io::Error),

    #[error("downloader has no stdout pipe")]
    MissingPipe,
}

/// Transient failure while inspecting the process tree or window list.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("process table unavailable: {0}")]
    ProcessTable(#[source] io::Error),

    #[error("window query via {tool} failed: {message}")]
    WindowQuery { tool: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiler_error_is_transparent() {
        let err: TilerError = ConfigurationError::MissingExecutable {
            tool: "ffplay".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "required executable not found: ffplay");
    }
}
