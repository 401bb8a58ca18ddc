use std::fmt::Display;

/// What a stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    VideoOnly,
    AudioOnly,
    /// Audio and video interleaved in one stream. Never selected.
    Progressive,
}

impl MediaKind {
    pub fn is_progressive(self) -> bool {
        self == MediaKind::Progressive
    }
}

/// One downloadable track of a [`MediaSource`](super::MediaSource)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Identifier understood by the provider that listed it
    pub id: String,
    pub kind: MediaKind,
    /// Container extension, without the dot
    pub extension: String,
    /// Codec of the main track, e.g. `avc1.640028` or `mp4a.40.2`
    pub codec: String,
    /// Height in pixels
    pub resolution: Option<u32>,
    /// Bits per second
    pub bitrate: Option<u32>,
    /// Size in bytes, when announced
    pub file_size: Option<u64>,
}

impl Display for StreamDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?}, {}, {}", self.id, self.kind, self.extension, self.codec)?;
        if let Some(res) = self.resolution {
            write!(f, ", {res}p")?;
        }
        if let Some(rate) = self.bitrate {
            write!(f, ", {}kbps", rate / 1000)?;
        }
        write!(f, ")")
    }
}
