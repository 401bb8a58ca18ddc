use std::cmp::Reverse;

use tracing::debug;

use crate::{
    error::{Error, Result},
    types::{Extension, MediaKind, StreamDescriptor},
};

/// Codec of the AAC-LC audio tracks
pub const DEFAULT_AUDIO_CODEC: &str = "mp4a.40.2";

/// Whether a run keeps the video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    AudioOnly,
    AudioVideo,
}

impl Mode {
    pub fn from_audio_only(audio_only: bool) -> Self {
        if audio_only {
            Mode::AudioOnly
        } else {
            Mode::AudioVideo
        }
    }
}

/// The streams picked for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub audio: StreamDescriptor,
    /// Always `None` in [`Mode::AudioOnly`]
    pub video: Option<StreamDescriptor>,
}

#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub audio_codec: String,
    pub video_extension: Extension,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            audio_codec: DEFAULT_AUDIO_CODEC.to_owned(),
            video_extension: Extension::Mp4,
        }
    }
}

impl SelectionPolicy {
    pub fn select(&self, streams: &[StreamDescriptor], mode: Mode) -> Result<Selection> {
        let video = match mode {
            Mode::AudioOnly => None,
            Mode::AudioVideo => Some(self.select_video(streams)?.clone()),
        };
        let audio = self.select_audio(streams)?.clone();

        debug!("Selected audio stream {audio}");
        if let Some(video) = &video {
            debug!("Selected video stream {video}");
        }

        Ok(Selection { audio, video })
    }

    /// Highest resolution among the non-progressive streams in the video container
    pub fn select_video<'s>(&self, streams: &'s [StreamDescriptor]) -> Result<&'s StreamDescriptor> {
        let candidates = streams.iter().filter(|s| {
            !s.kind.is_progressive()
                && s.resolution.is_some()
                && s.extension.eq_ignore_ascii_case(self.video_extension.as_str())
        });

        best_by(candidates, |s| s.resolution).ok_or(Error::NoVideoStreamFound)
    }

    /// Highest bitrate among the audio-only streams with the target codec
    pub fn select_audio<'s>(&self, streams: &'s [StreamDescriptor]) -> Result<&'s StreamDescriptor> {
        let candidates = streams
            .iter()
            .filter(|s| s.kind == MediaKind::AudioOnly && s.codec == self.audio_codec);

        best_by(candidates, |s| s.bitrate).ok_or(Error::NoAudioStreamFound)
    }
}

/// First stream with the highest key. The sort is stable so ties keep provider order.
fn best_by<'s, I, K, F>(candidates: I, key: F) -> Option<&'s StreamDescriptor>
where
    I: Iterator<Item = &'s StreamDescriptor>,
    K: Ord,
    F: Fn(&StreamDescriptor) -> K,
{
    let mut candidates: Vec<_> = candidates.collect();
    candidates.sort_by_key(|s| Reverse(key(s)));
    candidates.first().copied()
}
