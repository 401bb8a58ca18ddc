use std::{
    fs,
    path::{Path, PathBuf},
};

use miette::{Context, IntoDiagnostic};
use tracing::{debug, info, trace};

use crate::{
    chapters::{derive_chapters, ChapterSource},
    error::{Error, Result},
    io::{strip_extension, with_suffix},
    outside::StreamProvider,
    progress::{DownloadStage, Progress, ProgressEvent},
    selector::{Mode, SelectionPolicy},
    state::{RunState, RunTracker},
    types::{Extension, MediaSource, StreamDescriptor},
};

/// Files written by [`Downloader::download_streams`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub audio: PathBuf,
    /// Present if and only if the run is not audio-only
    pub video: Option<PathBuf>,
    /// Present if and only if at least one chapter was found
    pub chapters: Option<PathBuf>,
    /// The description sidecar file
    pub description: PathBuf,
    pub chapter_source: ChapterSource,
}

impl DownloadResult {
    pub fn mode(&self) -> Mode {
        if self.video.is_some() {
            Mode::AudioVideo
        } else {
            Mode::AudioOnly
        }
    }
}

pub struct Downloader<'a> {
    provider: &'a dyn StreamProvider,
    policy: &'a SelectionPolicy,
    progress: &'a dyn Progress,
    tracker: &'a RunTracker,
}

impl<'a> Downloader<'a> {
    pub fn new(
        provider: &'a dyn StreamProvider,
        policy: &'a SelectionPolicy,
        progress: &'a dyn Progress,
        tracker: &'a RunTracker,
    ) -> Self {
        Self {
            provider,
            policy,
            progress,
            tracker,
        }
    }

    /// Resolve the URL, download the selected streams into `work_dir`, then write the
    /// description sidecar and the chapters file next to them.
    pub fn download_streams(&self, url: &str, mode: Mode, work_dir: &Path) -> Result<DownloadResult> {
        self.tracker.enter(RunState::Resolving);
        let source = self.provider.resolve(url).map_err(|err| match err {
            err @ Error::SourceUnavailable { .. } => err,
            err => Error::SourceUnavailable {
                url: url.to_owned(),
                reason: err.to_string(),
            },
        })?;
        info!(
            "Resolved '{}' ({} streams, {} chapter records)",
            source.title(),
            source.streams().len(),
            source.chapters().len()
        );

        self.tracker.enter(RunState::SelectingStreams);
        let selection = self.policy.select(source.streams(), mode)?;

        self.tracker.enter(RunState::Downloading);
        let (audio, video) = match &selection.video {
            Some(video_stream) => {
                let video = work_dir.join(self.provider.default_file_name(&source, video_stream));
                self.fetch(&source, video_stream, &video, DownloadStage::Video)?;

                // Same base name as the video, so both can be matched when muxing
                let audio = Extension::M4a.apply(&video);
                self.fetch(&source, &selection.audio, &audio, DownloadStage::Audio)?;

                (audio, Some(video))
            }
            None => {
                let audio = work_dir.join(self.provider.default_file_name(&source, &selection.audio));
                self.fetch(&source, &selection.audio, &audio, DownloadStage::Audio)?;

                (self.normalize_audio_extension(audio)?, None)
            }
        };

        self.tracker.enter(RunState::DerivingChapters);
        let base = strip_extension(&audio);
        let description = write_description(&base, &source)?;

        let (chapter_source, chapters) = derive_chapters(&source);
        info!("{} chapters found, source: {chapter_source}", chapters.len());
        trace!("Chapters: {chapters}");

        let chapters = if chapters.is_empty() {
            None
        } else {
            let path = with_suffix(&base, "_chapter.txt");
            fs::write(&path, chapters.to_ogm())
                .into_diagnostic()
                .wrap_err_with(|| format!("Could not write chapters file {}", path.display()))?;
            Some(path)
        };

        Ok(DownloadResult {
            audio,
            video,
            chapters,
            description,
            chapter_source,
        })
    }

    fn fetch(
        &self,
        source: &MediaSource,
        stream: &StreamDescriptor,
        dest: &Path,
        stage: DownloadStage,
    ) -> Result<()> {
        info!("Downloading {stage} stream {stream}");

        let progress = self.progress;
        let on_progress = move |bytes_done: u64, bytes_total: Option<u64>| {
            progress.on_progress(&ProgressEvent {
                stage,
                bytes_done,
                bytes_total,
            })
        };

        self.provider
            .download(source, stream, dest, &on_progress)
            .map_err(|err| match err {
                err @ Error::DownloadFailed { .. } => err,
                err => Error::DownloadFailed {
                    stream: stream.id.clone(),
                    reason: err.to_string(),
                },
            })?;

        debug!("Downloaded {}", dest.display());
        Ok(())
    }

    /// Audio streams are sometimes delivered in the video container, give them the
    /// audio extension instead
    fn normalize_audio_extension(&self, audio: PathBuf) -> Result<PathBuf> {
        if Extension::from_path(&audio) != Some(self.policy.video_extension) {
            return Ok(audio);
        }

        let renamed = Extension::M4a.apply(&audio);
        debug!("Renaming {} to {}", audio.display(), renamed.display());
        fs::rename(&audio, &renamed)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not rename {}", audio.display()))?;

        Ok(renamed)
    }
}

/// Write `<base>.txt` with the page URL and the raw description
fn write_description(base: &Path, source: &MediaSource) -> Result<PathBuf> {
    let path = with_suffix(base, ".txt");
    let contents = format!(
        "From: {}\n\nDescription:\n\n{}",
        source.url(),
        source.description()
    );

    fs::write(&path, contents.as_bytes())
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not write description file {}", path.display()))?;

    Ok(path)
}
