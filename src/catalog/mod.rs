//! Stream catalog: which encodings a stream offers, and its title
//!
//! The supervisor depends on the [`StreamCatalog`] trait only. The
//! production implementation asks `yt-dlp` for the stream's metadata as
//! JSON and validates it into typed [`Encoding`]s at this boundary.

pub mod ytdlp;

use crate::error::CatalogError;
use crate::models::Encoding;

pub use ytdlp::YtDlpCatalog;

/// Title used when the source does not report one.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

pub trait StreamCatalog: Send + Sync {
    /// Every encoding the source offers for `url`.
    fn list_encodings(&self, url: &str) -> Result<Vec<Encoding>, CatalogError>;

    /// Human-readable title of the stream.
    fn title_of(&self, url: &str) -> Result<String, CatalogError>;
}
