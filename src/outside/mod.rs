mod command;
mod ffmpeg;
mod mp4box;
mod ytdl;

pub use ffmpeg::{Ffmpeg, Muxer};
pub use mp4box::{ChapterInjector, Mp4Box};
pub use ytdl::{StreamProvider, Ytdl};
