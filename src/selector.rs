//! Format selection
//!
//! Maps the encodings offered for a stream and the tile geometry to the
//! format the downloader should fetch. Pure: no I/O, no clocks, no state.

use std::fmt::Write;

use crate::models::constants::DEFAULT_DENIED_CODECS;
use crate::models::{Encoding, EncodingKind, SelectedFormat, TileGeometry};

/// Encodings split by track layout, each class sorted ascending.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    /// Ascending by (height, width)
    pub combined: Vec<&'a Encoding>,
    /// Ascending by (height, width)
    pub video_only: Vec<&'a Encoding>,
    /// Ascending by bitrate, missing bitrate sorts as 0
    pub audio_only: Vec<&'a Encoding>,
}

#[derive(Debug, Clone)]
pub struct FormatSelector {
    denied_codecs: Vec<String>,
}

impl Default for FormatSelector {
    fn default() -> Self {
        Self::new(DEFAULT_DENIED_CODECS.iter().map(|c| c.to_string()).collect())
    }
}

impl FormatSelector {
    pub fn new(denied_codecs: Vec<String>) -> Self {
        Self { denied_codecs }
    }

    pub fn denied_codecs(&self) -> &[String] {
        &self.denied_codecs
    }

    /// Partition and sort encodings, dropping denied codec families.
    pub fn partition<'a>(&self, encodings: &'a [Encoding]) -> Partition<'a> {
        let mut partition = Partition::default();

        for encoding in encodings {
            if encoding.has_denied_codec(&self.denied_codecs) {
                continue;
            }
            match encoding.kind() {
                EncodingKind::Combined => partition.combined.push(encoding),
                EncodingKind::VideoOnly => partition.video_only.push(encoding),
                EncodingKind::AudioOnly => partition.audio_only.push(encoding),
                EncodingKind::Unusable => {}
            }
        }

        partition.combined.sort_by_key(|e| e.resolution_key());
        partition.video_only.sort_by_key(|e| e.resolution_key());
        partition
            .audio_only
            .sort_by(|a, b| a.bitrate_or_zero().total_cmp(&b.bitrate_or_zero()));

        partition
    }

    /// Choose the format for `tile`.
    ///
    /// Returns `None` when neither a sufficient combined encoding nor a
    /// video-only/audio-only pair exists; the caller then falls back to the
    /// downloader's generic best-available selector.
    pub fn select(&self, encodings: &[Encoding], tile: &TileGeometry) -> Option<SelectedFormat> {
        let partition = self.partition(encodings);
        select_from_partition(&partition, tile)
    }
}

/// Smallest sufficient combined encoding, else a video/audio composite.
pub fn select_from_partition(partition: &Partition<'_>, tile: &TileGeometry) -> Option<SelectedFormat> {
    let (min_width, min_height) = (tile.tile_width(), tile.tile_height());

    if let Some(combined) = partition
        .combined
        .iter()
        .find(|e| e.covers(min_width, min_height))
    {
        return Some(SelectedFormat::Single(combined.id.clone()));
    }

    let video = partition
        .video_only
        .iter()
        .find(|e| e.covers(min_width, min_height))
        .or_else(|| partition.video_only.last())?;
    let audio = partition.audio_only.last()?;

    Some(SelectedFormat::Composite {
        video: video.id.clone(),
        audio: audio.id.clone(),
    })
}

/// Human-readable table of the partitioned encodings.
pub fn format_listing(partition: &Partition<'_>) -> String {
    let header = [
        "Format ID",
        "Resolution",
        "Type",
        "VCodec",
        "ACodec",
        "Bitrate (kbps)",
    ];

    let rows: Vec<[String; 6]> = partition
        .combined
        .iter()
        .chain(partition.video_only.iter())
        .chain(partition.audio_only.iter())
        .map(|e| {
            let na = || "N/A".to_string();
            [
                e.id.clone(),
                e.resolution_label(),
                e.kind().to_string(),
                e.video_codec.clone().filter(|_| e.has_video).unwrap_or_else(na),
                e.audio_codec.clone().filter(|_| e.has_audio).unwrap_or_else(na),
                e.bitrate_kbps
                    .map(|b| format!("{b:.0}"))
                    .unwrap_or_else(na),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let separator = {
        let mut line = String::from("+");
        for width in widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let mut out = String::new();
    let _ = writeln!(out, "{separator}");
    let _ = writeln!(out, "{}", table_row(&header.map(String::from), &widths));
    let _ = writeln!(out, "{separator}");
    for row in &rows {
        let _ = writeln!(out, "{}", table_row(row, &widths));
    }
    let _ = write!(out, "{separator}");
    out
}

fn table_row(cells: &[String; 6], widths: &[usize; 6]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(widths.iter()) {
        line.push_str(&format!(" {cell:<width$} |"));
    }
    line
}
