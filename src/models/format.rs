use std::fmt;

/// The encoding choice handed to the downloader.
///
/// A composite is only formed when no combined encoding satisfies the tile
/// bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedFormat {
    Single(String),
    Composite { video: String, audio: String },
}

impl SelectedFormat {
    pub fn is_composite(&self) -> bool {
        matches!(self, SelectedFormat::Composite { .. })
    }

    /// The downloader's format specifier (`id` or `video+audio`).
    pub fn specifier(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SelectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectedFormat::Single(id) => write!(f, "{id}"),
            SelectedFormat::Composite { video, audio } => write!(f, "{video}+{audio}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specifier() {
        assert_eq!(SelectedFormat::Single("18".into()).specifier(), "18");
        let composite = SelectedFormat::Composite {
            video: "video720".into(),
            audio: "audio128".into(),
        };
        assert_eq!(composite.specifier(), "video720+audio128");
        assert!(composite.is_composite());
    }
}
