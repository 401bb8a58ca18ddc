use std::{ffi::OsStr, fmt::Debug, path::Path};

use tracing::debug;

use super::command::{assert_success_command, FFMPEG, FFXXX_DEFAULT_ARGS};
use crate::error::{Error, Result};

pub trait Muxer: Send + Sync + Debug {
    /// Copy the video track of `video` and the audio track of `audio` into `output`,
    /// without re-encoding either of them.
    ///
    /// An existing `output` is overwritten.
    fn combine(&self, audio: &Path, video: &Path, output: &Path) -> Result<()>;
}

/// Interface for the [ffmpeg](https://ffmpeg.org) program
#[derive(Debug)]
pub struct Ffmpeg {
    program: String,
}

impl Ffmpeg {
    /// Verify that the `ffmpeg` binary is reachable
    pub fn new(program: Option<&str>) -> Result<Self> {
        let program = program.unwrap_or(FFMPEG);
        assert_success_command(program, |cmd| cmd.arg("-version"))
            .map_err(|err| err.wrap_err_with(|| format!("{program} is not usable")))?;

        Ok(Self {
            program: program.to_owned(),
        })
    }
}

impl Muxer for Ffmpeg {
    fn combine(&self, audio: &Path, video: &Path, output: &Path) -> Result<()> {
        debug!(
            "Muxing {} and {} into {}",
            video.display(),
            audio.display(),
            output.display()
        );

        assert_success_command(&self.program, |cmd| {
            cmd.args(FFXXX_DEFAULT_ARGS)
                .arg("-y")
                .args([OsStr::new("-i"), video.as_os_str()])
                .args([OsStr::new("-i"), audio.as_os_str()])
                .args(["-map", "0:v:0", "-map", "1:a:0"])
                .args(["-c", "copy"])
                .arg(output)
        })
        .map_err(|err| Error::MuxFailed {
            reason: err.to_string(),
        })
    }
}
