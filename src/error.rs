use std::{fmt::Display, path::PathBuf};

use miette::miette;

/// Failures of a download/mux run.
///
/// Every variant but [`Error::Miette`] maps to one stage of the run. Infrastructure
/// failures (spawning a program, writing a sidecar file, ...) travel as reports.
#[derive(Debug)]
pub enum Error {
    /// The stream provider could not resolve the URL
    SourceUnavailable { url: String, reason: String },

    NoVideoStreamFound,

    NoAudioStreamFound,

    /// A stream transfer was interrupted or the provider reported a failure
    DownloadFailed { stream: String, reason: String },

    /// The muxer failed or did not produce the output file
    MuxFailed { reason: String },

    /// Writing the chapters into the muxed file failed.
    /// Only ever logged, a run never fails because of it.
    ChapterInjectionFailed { reason: String },

    /// The muxed file could not be moved to its final location
    FinalizeFailed { path: PathBuf, reason: String },

    Miette(miette::Report),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SourceUnavailable { url, reason } => {
                write!(f, "Source '{url}' is unavailable: {reason}")
            }
            Error::NoVideoStreamFound => write!(f, "No matching video stream found"),
            Error::NoAudioStreamFound => write!(f, "No matching audio stream found"),
            Error::DownloadFailed { stream, reason } => {
                write!(f, "Download of stream '{stream}' failed: {reason}")
            }
            Error::MuxFailed { reason } => write!(f, "Muxing failed: {reason}"),
            Error::ChapterInjectionFailed { reason } => {
                write!(f, "Chapter injection failed: {reason}")
            }
            Error::FinalizeFailed { path, reason } => {
                write!(f, "Could not finalize '{}': {reason}", path.display())
            }
            Error::Miette(report) => write!(f, "{report}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Miette(err) => err,
            err => miette!("{err}"),
        }
    }
}

impl Error {
    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
