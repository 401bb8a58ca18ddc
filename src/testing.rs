//! Stand-ins for the external programs

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{
    error::{Error, Result},
    outside::{ChapterInjector, Muxer, StreamProvider},
    types::{ChapterRecord, MediaKind, MediaSource, StreamDescriptor},
};

pub fn video_stream(id: &str, extension: &str, resolution: u32) -> StreamDescriptor {
    StreamDescriptor {
        id: id.to_owned(),
        kind: MediaKind::VideoOnly,
        extension: extension.to_owned(),
        codec: "avc1.640028".to_owned(),
        resolution: Some(resolution),
        bitrate: None,
        file_size: None,
    }
}

pub fn audio_stream(id: &str, extension: &str, codec: &str, bitrate: u32) -> StreamDescriptor {
    StreamDescriptor {
        id: id.to_owned(),
        kind: MediaKind::AudioOnly,
        extension: extension.to_owned(),
        codec: codec.to_owned(),
        resolution: None,
        bitrate: Some(bitrate),
        file_size: None,
    }
}

/// "My Video" with 360p/1080p mp4 video streams and a 128kbps AAC audio stream
pub fn sample_source(description: &str) -> MediaSource {
    source_with_chapters(description, vec![])
}

pub fn source_with_chapters(description: &str, chapters: Vec<ChapterRecord>) -> MediaSource {
    MediaSource::new(
        "https://www.example.com/watch?v=abc",
        "My Video",
        description,
        vec![
            video_stream("360", "mp4", 360),
            audio_stream("140", "m4a", "mp4a.40.2", 128_000),
            video_stream("1080", "mp4", 1080),
        ],
        chapters,
    )
}

/// Serves one source. Downloads write "video" or "audio" to the destination.
#[derive(Debug)]
pub struct FakeProvider {
    source: Option<MediaSource>,
    failing_stream: Option<String>,
    downloaded: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(source: MediaSource) -> Self {
        Self {
            source: Some(source),
            failing_stream: None,
            downloaded: Mutex::default(),
        }
    }

    /// Every resolution fails
    pub fn unavailable() -> Self {
        Self {
            source: None,
            failing_stream: None,
            downloaded: Mutex::default(),
        }
    }

    pub fn failing_download(mut self, stream_id: &str) -> Self {
        self.failing_stream = Some(stream_id.to_owned());
        self
    }

    /// Ids of the streams downloaded so far
    pub fn downloaded(&self) -> Vec<String> {
        self.downloaded.lock().unwrap().clone()
    }
}

impl StreamProvider for FakeProvider {
    fn resolve(&self, url: &str) -> Result<MediaSource> {
        self.source.clone().ok_or_else(|| Error::SourceUnavailable {
            url: url.to_owned(),
            reason: "Video unavailable".to_owned(),
        })
    }

    fn download(
        &self,
        _source: &MediaSource,
        stream: &StreamDescriptor,
        dest: &Path,
        progress: &(dyn Fn(u64, Option<u64>) + Sync),
    ) -> Result<()> {
        if self.failing_stream.as_deref() == Some(stream.id.as_str()) {
            return Err(Error::DownloadFailed {
                stream: stream.id.clone(),
                reason: "connection reset".to_owned(),
            });
        }

        let data = match stream.kind {
            MediaKind::VideoOnly => "video",
            MediaKind::AudioOnly => "audio",
            MediaKind::Progressive => "both",
        };
        progress(0, Some(data.len() as u64));
        fs::write(dest, data).unwrap();
        progress(data.len() as u64, Some(data.len() as u64));

        self.downloaded.lock().unwrap().push(stream.id.clone());
        Ok(())
    }
}

/// Writes "<video>+<audio>" to the output
#[derive(Debug, Default)]
pub struct FakeMuxer {
    fail: bool,
    /// Report success without writing anything
    silent: bool,
    unmovable: bool,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeMuxer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    /// Writes a directory at the output, which can not be renamed onto a file
    pub fn unmovable() -> Self {
        Self {
            unmovable: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    /// Handle on the calls that stays usable once the muxer is boxed
    pub fn shared_calls(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        self.calls.clone()
    }
}

impl Muxer for FakeMuxer {
    fn combine(&self, audio: &Path, video: &Path, output: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(output.to_path_buf());
        if self.fail {
            return Err(Error::MuxFailed {
                reason: "ffmpeg did run but was not successful (exit status: 1)".to_owned(),
            });
        }
        if self.unmovable {
            fs::create_dir(output).unwrap();
            fs::write(output.join("track"), "video+audio").unwrap();
        } else if !self.silent {
            let data = format!(
                "{}+{}",
                fs::read_to_string(video).unwrap(),
                fs::read_to_string(audio).unwrap()
            );
            fs::write(output, data).unwrap();
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeInjector {
    fail: bool,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeInjector {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Targets the chapters were injected into
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shared_calls(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        self.calls.clone()
    }
}

impl ChapterInjector for FakeInjector {
    fn inject(&self, chapters: &Path, target: &Path) -> Result<()> {
        assert!(chapters.exists(), "chapters file must exist when injecting");
        if self.fail {
            return Err(Error::ChapterInjectionFailed {
                reason: "MP4Box did run but was not successful (exit status: 1)".to_owned(),
            });
        }
        self.calls.lock().unwrap().push(target.to_path_buf());
        Ok(())
    }
}
