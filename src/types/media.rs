use super::StreamDescriptor;

/// A chapter as listed by the provider, its start already formatted as `HH:MM:SS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRecord {
    pub start: String,
    pub title: String,
}

/// A resolved remote video. Immutable once built.
#[derive(Debug, Clone)]
pub struct MediaSource {
    url: String,
    title: String,
    description: String,
    streams: Vec<StreamDescriptor>,
    chapters: Vec<ChapterRecord>,
}

impl MediaSource {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        streams: Vec<StreamDescriptor>,
        chapters: Vec<ChapterRecord>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
            streams,
            chapters,
        }
    }

    /// The canonical page URL of the video
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Streams in the order the provider listed them
    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    pub fn chapters(&self) -> &[ChapterRecord] {
        &self.chapters
    }
}
