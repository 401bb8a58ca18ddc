mod chapter;
mod extension;
mod media;
mod stream;

pub use chapter::{ChapterEntry, ChapterTime, Chapters};
pub use extension::Extension;
pub use media::{ChapterRecord, MediaSource};
pub use stream::{MediaKind, StreamDescriptor};
