use std::{fs, path::Path};

use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    outside::{ChapterInjector, Muxer},
    state::{RunState, RunTracker},
};

/// What happened to the chapters of a muxed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterInjection {
    /// There was no chapter to add
    Skipped,
    Injected,
    /// The file was kept without chapters
    Failed(String),
}

pub struct MuxPipeline<'a> {
    muxer: &'a dyn Muxer,
    injector: &'a dyn ChapterInjector,
    tracker: &'a RunTracker,
}

impl<'a> MuxPipeline<'a> {
    pub fn new(
        muxer: &'a dyn Muxer,
        injector: &'a dyn ChapterInjector,
        tracker: &'a RunTracker,
    ) -> Self {
        Self {
            muxer,
            injector,
            tracker,
        }
    }

    /// Produce `output` from the downloaded streams, then add the chapters to it.
    ///
    /// With a video, both tracks are copied into a new container and the inputs are left
    /// untouched. Without one, the audio file is moved to `output`.
    ///
    /// A failed chapter injection does not fail the call.
    pub fn mux(
        &self,
        audio: &Path,
        video: Option<&Path>,
        chapters: Option<&Path>,
        output: &Path,
    ) -> Result<ChapterInjection> {
        self.tracker.enter(RunState::Muxing);

        match video {
            Some(video) => self.combine(audio, video, output)?,
            None => {
                debug!("No video, moving {} to {}", audio.display(), output.display());
                fs::rename(audio, output).map_err(|err| Error::FinalizeFailed {
                    path: audio.to_path_buf(),
                    reason: err.to_string(),
                })?
            }
        }

        let Some(chapters) = chapters else {
            debug!("No chapters to add");
            return Ok(ChapterInjection::Skipped);
        };

        self.tracker.enter(RunState::InjectingChapters);
        match self.injector.inject(chapters, output) {
            Ok(()) => {
                info!("Chapters added to {}", output.display());
                Ok(ChapterInjection::Injected)
            }
            Err(err) => {
                warn!("{err}. Keeping {} without chapters", output.display());
                Ok(ChapterInjection::Failed(err.to_string()))
            }
        }
    }

    fn combine(&self, audio: &Path, video: &Path, output: &Path) -> Result<()> {
        self.muxer
            .combine(audio, video, output)
            .map_err(|err| match err {
                err @ Error::MuxFailed { .. } => err,
                err => Error::MuxFailed {
                    reason: err.to_string(),
                },
            })?;

        if !output.exists() {
            return Err(Error::MuxFailed {
                reason: format!("{} was not created", output.display()),
            });
        }

        Ok(())
    }
}
