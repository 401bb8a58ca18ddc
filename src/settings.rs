use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use miette::{Context, IntoDiagnostic, Result};
use serde::Deserialize;

use crate::selector::DEFAULT_AUDIO_CODEC;

const DEFAULT_CONFIG_FILE: &str = "ytmux.toml";
const DEFAULT_OUT_DIR: &str = "downloads";
const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Application settings.
///
/// Read from the configuration file, then from the `YTMUX_*` environment variables
/// (`__` separating nested keys, e.g. `YTMUX_TOOLS__FFMPEG`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Where the final files are saved
    pub out_dir: PathBuf,
    /// Codec an audio stream must have to be selected
    pub audio_codec: String,
    #[serde(default)]
    pub tools: ToolSettings,
    pub server: ServerSettings,
}

/// Programs to run instead of the ones found in `PATH`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolSettings {
    pub ytdl: Option<String>,
    pub ffmpeg: Option<String>,
    pub mp4box: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind: String,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder()
            .set_default("out_dir", DEFAULT_OUT_DIR)
            .and_then(|b| b.set_default("audio_codec", DEFAULT_AUDIO_CODEC))
            .and_then(|b| b.set_default("server.bind", DEFAULT_BIND))
            .into_diagnostic()?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml)),
            None => builder
                .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false)),
        };

        builder
            .add_source(
                Environment::with_prefix("YTMUX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .into_diagnostic()
            .wrap_err("Could not read the configuration")?
            .try_deserialize()
            .into_diagnostic()
            .wrap_err("Invalid configuration")
    }
}
