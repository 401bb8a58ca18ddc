use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("YTMUX_", $v)
    };
}

/// Download the audio and video streams of a web video, mux them into a single file
/// and add the chapters listed in its description.
#[derive(Parser, Debug)]
#[command(version, about, subcommand_negates_reqs = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// The URL of the video to download
    #[arg(required = true)]
    pub url: Option<String>,

    /// Only keep the audio stream, saved as an m4a file
    #[arg(short, long, env=arg_env!("AUDIO_ONLY"))]
    pub audio_only: bool,

    /// The path to the output directory. Overrides the configuration file
    #[arg(long, global = true, env=arg_env!("OUT"))]
    pub out: Option<PathBuf>,

    /// The path to the TOML configuration file.
    /// Defaults to `ytmux.toml` in the current directory, if it exists
    #[arg(long, global = true, env=arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// The most verbose level of the logs to print
    #[arg(long, global = true, default_value_t = Level::INFO, env=arg_env!("LOG_LEVEL"))]
    pub log_level: Level,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve `POST /download` requests taking `{"url": ..., "audioOnly": ...}`
    Serve {
        /// The address to listen on. Overrides the configuration file
        #[arg(long, env=arg_env!("BIND"))]
        bind: Option<String>,
    },
}
