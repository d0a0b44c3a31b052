pub mod constants;
pub mod encoding;
pub mod format;
pub mod geometry;
pub mod pipeline;
pub mod session;

pub use encoding::{Encoding, EncodingKind};
pub use format::SelectedFormat;
pub use geometry::{ScreenSize, TileGeometry};
pub use pipeline::{CommandSpec, PipelineSpec};
pub use session::{PlaybackRequest, SessionState};
