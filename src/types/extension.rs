use std::path::{Path, PathBuf};

/// Containers handled by the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// Video container, also the container of the muxed output
    Mp4,
    /// Audio container, used for audio-only outputs
    M4a,
}

impl Extension {
    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Mp4 => "mp4",
            Extension::M4a => "m4a",
        }
    }

    /// Return the extension with the leading dot.
    /// e.g. ".ext"
    pub fn with_dot(self) -> &'static str {
        match self {
            Extension::Mp4 => ".mp4",
            Extension::M4a => ".m4a",
        }
    }

    /// Parse the path file extension.
    /// Return None in case of no or unknown extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_name)
    }

    pub fn from_name(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "m4a" => Some(Self::M4a),
            _ => None,
        }
    }

    /// Replace the extension of the path by this one
    pub fn apply(self, path: &Path) -> PathBuf {
        path.with_extension(self.as_str())
    }
}
