mod chapters;
mod cli;
mod download;
mod error;
mod finalize;
mod io;
mod logging;
mod mux;
mod outside;
mod progress;
mod run;
mod selector;
mod server;
mod settings;
mod state;
#[cfg(test)]
mod testing;
mod types;

use std::sync::Arc;

use clap::Parser;
use miette::{miette, Context, IntoDiagnostic, Result};
use tracing::{debug, info, warn};

use crate::{
    cli::{Args, Command},
    logging::init_logging,
    mux::ChapterInjection,
    outside::{Ffmpeg, Mp4Box, Ytdl},
    progress::{LogProgress, NoProgress, Progress},
    run::Runner,
    selector::{Mode, SelectionPolicy},
    settings::Settings,
};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(out) = args.out.clone() {
        settings.out_dir = out;
    }
    debug!("{settings:?}");

    std::fs::create_dir_all(&settings.out_dir)
        .into_diagnostic()
        .wrap_err("Could not create out directory")?;

    match args.command {
        Some(Command::Serve { bind }) => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            // Requests run concurrently, a shared progress log would interleave them
            let runner = load_runner(&settings, Box::new(NoProgress))?;
            server::serve(Arc::new(runner), &bind)
        }
        None => {
            let url = args
                .url
                .ok_or_else(|| miette!("A video URL is required"))?;
            let runner = load_runner(&settings, Box::new(LogProgress::default()))?;
            let report = runner.run(&url, Mode::from_audio_only(args.audio_only))?;

            info!("Description in {}", report.description.display());
            match report.chapters {
                ChapterInjection::Injected => info!("Chapters added from the {}", report.chapter_source),
                ChapterInjection::Skipped => info!("No chapters found"),
                ChapterInjection::Failed(reason) => warn!("Chapters not added: {reason}"),
            }
            Ok(())
        }
    }
}

/// Find the external programs and build the runner around them
fn load_runner(settings: &Settings, progress: Box<dyn Progress>) -> Result<Runner> {
    // Probing runs each program once, do it concurrently
    let tools = settings.tools.clone();
    let (ytdl, ffmpeg, mp4box) = std::thread::scope(|scope| {
        let ytdl = scope.spawn(|| Ytdl::new(tools.ytdl.as_deref()));
        let ffmpeg = scope.spawn(|| Ffmpeg::new(tools.ffmpeg.as_deref()));
        let mp4box = scope.spawn(|| Mp4Box::detect(tools.mp4box.as_deref()));

        (ytdl.join(), ffmpeg.join(), mp4box.join())
    });

    let joined = || miette!("Could not join tool probing thread");
    let ytdl = ytdl.map_err(|_| joined())??;
    let ffmpeg = ffmpeg.map_err(|_| joined())??;
    let mp4box = mp4box.map_err(|_| joined())?;

    let policy = SelectionPolicy {
        audio_codec: settings.audio_codec.clone(),
        ..SelectionPolicy::default()
    };

    Ok(Runner::new(
        Box::new(ytdl),
        Box::new(ffmpeg),
        Box::new(mp4box),
        progress,
        policy,
        settings.out_dir.clone(),
    ))
}
