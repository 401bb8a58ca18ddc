use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};

use crate::{
    chapters::ChapterSource,
    download::Downloader,
    error::Result,
    finalize::{cleanup, place_output, relocate_sidecar, remove_run_dir},
    io::create_run_dir,
    mux::{ChapterInjection, MuxPipeline},
    outside::{ChapterInjector, Muxer, StreamProvider},
    progress::Progress,
    selector::{Mode, SelectionPolicy},
    state::{RunState, RunTracker},
    types::Extension,
};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub output: PathBuf,
    pub description: PathBuf,
    pub chapter_source: ChapterSource,
    pub chapters: ChapterInjection,
}

/// Owns the external capabilities and drives runs with them.
///
/// Runs share nothing but the output directory, so one runner can serve
/// several runs at the same time.
pub struct Runner {
    provider: Box<dyn StreamProvider>,
    muxer: Box<dyn Muxer>,
    injector: Box<dyn ChapterInjector>,
    progress: Box<dyn Progress>,
    policy: SelectionPolicy,
    out_dir: PathBuf,
}

impl Runner {
    pub fn new(
        provider: Box<dyn StreamProvider>,
        muxer: Box<dyn Muxer>,
        injector: Box<dyn ChapterInjector>,
        progress: Box<dyn Progress>,
        policy: SelectionPolicy,
        out_dir: PathBuf,
    ) -> Self {
        Self {
            provider,
            muxer,
            injector,
            progress,
            policy,
            out_dir,
        }
    }

    /// Download the video at `url` and save it in the output directory.
    ///
    /// Intermediate files live in a directory of their own, which is kept with its
    /// contents when the run fails.
    pub fn run(&self, url: &str, mode: Mode) -> Result<RunReport> {
        let span = info_span!("run", url, ?mode);
        let _enter = span.enter();

        let tracker = RunTracker::new();
        let res = create_run_dir(&self.out_dir).and_then(|work_dir| {
            let res = self.run_tracked(url, mode, &work_dir, &tracker);
            if res.is_err() {
                // Only goes away if the run failed before writing anything
                remove_run_dir(&work_dir);
            }
            res
        });
        if let Err(err) = &res {
            tracker.fail(err);
        }
        res
    }

    fn run_tracked(
        &self,
        url: &str,
        mode: Mode,
        work_dir: &Path,
        tracker: &RunTracker,
    ) -> Result<RunReport> {
        let downloader = Downloader::new(
            self.provider.as_ref(),
            &self.policy,
            self.progress.as_ref(),
            tracker,
        );
        let download = downloader.download_streams(url, mode, work_dir)?;

        let extension = match download.mode() {
            Mode::AudioVideo => Extension::Mp4,
            Mode::AudioOnly => Extension::M4a,
        };
        let kept = download.video.as_ref().unwrap_or(&download.audio);
        let stem = kept
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_owned());
        let muxed = work_dir.join(format!("{stem} - muxed{}", extension.with_dot()));

        let pipeline = MuxPipeline::new(self.muxer.as_ref(), self.injector.as_ref(), tracker);
        let chapters = pipeline.mux(
            &download.audio,
            download.video.as_deref(),
            download.chapters.as_deref(),
            &muxed,
        )?;

        tracker.enter(RunState::CleaningUp);
        cleanup(&download);

        tracker.enter(RunState::Finalizing);
        let canonical = place_output(&muxed, &self.out_dir, &stem, extension)?;

        let description = relocate_sidecar(&download.description, &canonical);
        remove_run_dir(work_dir);
        tracker.enter(RunState::Finalized);
        debug!("Run went through {:?}", tracker.history());

        info!(
            "Done: {} (chapters from {}: {:?})",
            canonical.display(),
            download.chapter_source,
            chapters
        );

        Ok(RunReport {
            output: canonical,
            description,
            chapter_source: download.chapter_source,
            chapters,
        })
    }
}
