use std::{ffi::OsStr, fmt::Debug, path::Path};

use tracing::{debug, warn};

use super::command::{assert_success_command, run_command, Capture, MP4BOX};
use crate::error::{Error, Result};

pub trait ChapterInjector: Send + Sync + Debug {
    /// Write the chapters described by the OGM file `chapters` into `target`, in place
    fn inject(&self, chapters: &Path, target: &Path) -> Result<()>;
}

/// Interface for the [MP4Box](https://gpac.io) program
#[derive(Debug)]
pub struct Mp4Box {
    program: String,
    available: bool,
}

impl Mp4Box {
    /// Look for the program.
    ///
    /// A missing `MP4Box` is not an error: chapters can not be injected,
    /// which only degrades the output.
    pub fn detect(program: Option<&str>) -> Self {
        let program = program.unwrap_or(MP4BOX);
        // Its exit status for `-version` differs between releases, running at all is enough
        let available = run_command(program, |cmd| cmd.arg("-version"), Capture::empty()).is_ok();
        if !available {
            warn!("{program} not found, chapters will not be added to the outputs");
        }

        Self {
            program: program.to_owned(),
            available,
        }
    }
}

impl ChapterInjector for Mp4Box {
    fn inject(&self, chapters: &Path, target: &Path) -> Result<()> {
        if !self.available {
            return Err(Error::ChapterInjectionFailed {
                reason: format!("{} is not available", self.program),
            });
        }

        debug!(
            "Adding chapters of {} to {}",
            chapters.display(),
            target.display()
        );
        assert_success_command(&self.program, |cmd| {
            cmd.args([OsStr::new("-chap"), chapters.as_os_str()])
                .arg(target)
        })
        .map_err(|err| Error::ChapterInjectionFailed {
            reason: err.to_string(),
        })
    }
}
