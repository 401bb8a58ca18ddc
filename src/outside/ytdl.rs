use std::{
    fmt::Debug,
    path::Path,
    process::{Command, Output},
};

use miette::{miette, Context, IntoDiagnostic};
use serde::Deserialize;
use tracing::{debug, warn};

use super::command::{
    assert_success_command, run_command, stderr_tail, stream_command, Capture, YT_DL, YT_DLP,
};
use crate::{
    error::{Error, Result},
    io::sanitize_file_stem,
    types::{ChapterRecord, ChapterTime, MediaKind, MediaSource, StreamDescriptor},
};

/// Prefix of the progress lines printed through `--progress-template`
const PROGRESS_PREFIX: &str = "ytmux-progress";

/// Interface for resolving videos and downloading their streams
pub trait StreamProvider: Send + Sync + Debug {
    /// Resolve the video behind the URL.
    ///
    /// Any failure is reported as [`Error::SourceUnavailable`].
    fn resolve(&self, url: &str) -> Result<MediaSource>;

    /// Download one stream of the source to `dest`.
    ///
    /// `progress` receives the bytes transferred so far and the total size when known.
    fn download(
        &self,
        source: &MediaSource,
        stream: &StreamDescriptor,
        dest: &Path,
        progress: &(dyn Fn(u64, Option<u64>) + Sync),
    ) -> Result<()>;

    /// The file name the provider gives to a stream when the caller has no preference
    fn default_file_name(&self, source: &MediaSource, stream: &StreamDescriptor) -> String {
        format!("{}.{}", sanitize_file_stem(source.title()), stream.extension)
    }
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program,
/// or [youtube-dl](https://github.com/ytdl-org/youtube-dl) when the former is missing
#[derive(Debug)]
pub struct Ytdl {
    program: String,
}

impl Ytdl {
    /// Verify that the configured program, or else `yt-dlp` or `youtube-dl`, is reachable
    pub fn new(program: Option<&str>) -> Result<Self> {
        let candidates = match program {
            Some(program) => vec![program],
            None => vec![YT_DLP, YT_DL],
        };

        for program in candidates {
            if assert_success_command(program, |cmd| cmd.arg("--version")).is_ok() {
                debug!("Using {program} as stream provider");
                return Ok(Self {
                    program: program.to_owned(),
                });
            }
        }

        Err(miette!("Neither yt-dlp nor youtube-dl found").into())
    }

    /// Run the command, turning a failure status into [`Error::SourceUnavailable`]
    fn run_check_availability<F>(&self, url: &str, f: F) -> Result<Output>
    where
        F: FnOnce(&mut Command) -> &mut Command,
    {
        let res = run_command(&self.program, f, Capture::STDOUT | Capture::STDERR)?;

        if res.status.success() {
            Ok(res)
        } else {
            let stderr = String::from_utf8_lossy(&res.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| line.starts_with("ERROR:"))
                .map(|line| line.trim_start_matches("ERROR:").trim().to_owned())
                .unwrap_or_else(|| stderr_tail(&stderr));

            Err(Error::SourceUnavailable {
                url: url.to_owned(),
                reason,
            })
        }
    }
}

impl StreamProvider for Ytdl {
    fn resolve(&self, url: &str) -> Result<MediaSource> {
        let res = self.run_check_availability(url, |cmd| {
            cmd.arg("-q")
                .arg("--no-playlist")
                .arg("--skip-download")
                .arg("-J")
                .arg("--")
                .arg(url)
        })?;

        let info: InfoJson = serde_json::from_slice(&res.stdout)
            .into_diagnostic()
            .wrap_err("Could not parse the video JSON description")?;

        Ok(info.into_media_source(url))
    }

    fn download(
        &self,
        source: &MediaSource,
        stream: &StreamDescriptor,
        dest: &Path,
        progress: &(dyn Fn(u64, Option<u64>) + Sync),
    ) -> Result<()> {
        let template = format!(
            "download:{PROGRESS_PREFIX} %(progress.downloaded_bytes)s \
             %(progress.total_bytes)s %(progress.total_bytes_estimate)s"
        );
        let output = escape_template(&dest.to_string_lossy());

        let run = stream_command(
            &self.program,
            |cmd| {
                cmd.arg("-q")
                    .arg("--progress")
                    .arg("--newline")
                    .args(["--progress-template", &template])
                    .arg("--no-continue") // Or else fails when file already exists, even an empty one
                    .arg("--no-part")
                    .args(["-f", &stream.id])
                    .args(["-o", &output])
                    .arg("--")
                    .arg(source.url())
            },
            |line| {
                if let Some((done, total)) = parse_progress_line(line) {
                    progress(done, total);
                }
            },
        )
        .map_err(|err| err.wrap_err_with(|| format!("Could not download stream {}", stream.id)))?;

        if !run.status.success() {
            return Err(Error::DownloadFailed {
                stream: stream.id.clone(),
                reason: format!("{} exited with {}: {}", self.program, run.status, run.stderr_tail),
            });
        }

        if !dest.exists() {
            return Err(Error::DownloadFailed {
                stream: stream.id.clone(),
                reason: format!("{} did not write {}", self.program, dest.display()),
            });
        }

        Ok(())
    }
}

/// Escape a literal path so it is not read as an output template
fn escape_template(path: &str) -> String {
    path.replace('%', "%%")
}

/// Parse a line printed with the progress template into (done, total).
///
/// The total falls back to the estimate, fields are `NA` when unknown.
fn parse_progress_line(line: &str) -> Option<(u64, Option<u64>)> {
    let mut fields = line.trim().strip_prefix(PROGRESS_PREFIX)?.split_whitespace();

    let number = |s: Option<&str>| -> Option<u64> {
        let s = s?;
        s.parse::<u64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
    };

    let done = number(fields.next())?;
    let total = number(fields.next());
    let estimate = number(fields.next());

    Some((done, total.or(estimate)))
}

/// The part of `yt-dlp -J` output the tool reads
#[derive(Debug, Deserialize)]
struct InfoJson {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    formats: Vec<FormatJson>,
    #[serde(default)]
    chapters: Option<Vec<ChapterJson>>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    format_id: String,
    ext: String,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    /// Audio bitrate in kbps
    #[serde(default)]
    abr: Option<f64>,
    /// Total bitrate in kbps
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    filesize: Option<f64>,
    #[serde(default)]
    filesize_approx: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChapterJson {
    start_time: f64,
    #[serde(default)]
    title: Option<String>,
}

/// `None` and the literal "none" both mean the track is absent
fn track_codec(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|c| !c.is_empty() && *c != "none")
}

impl FormatJson {
    /// Storyboards and other formats without media track give `None`
    fn to_descriptor(&self) -> Option<StreamDescriptor> {
        let (kind, codec) = match (track_codec(&self.vcodec), track_codec(&self.acodec)) {
            (Some(v), Some(_)) => (MediaKind::Progressive, v),
            (Some(v), None) => (MediaKind::VideoOnly, v),
            (None, Some(a)) => (MediaKind::AudioOnly, a),
            (None, None) => return None,
        };

        let kbps = self.abr.or(self.tbr).filter(|_| kind == MediaKind::AudioOnly);

        Some(StreamDescriptor {
            id: self.format_id.clone(),
            kind,
            extension: self.ext.clone(),
            codec: codec.to_owned(),
            resolution: self.height.filter(|_| kind != MediaKind::AudioOnly),
            bitrate: kbps.map(|kbps| (kbps * 1000.0) as u32),
            file_size: self
                .filesize
                .or(self.filesize_approx)
                .map(|size| size as u64),
        })
    }
}

impl InfoJson {
    fn into_media_source(self, requested_url: &str) -> MediaSource {
        let streams: Vec<_> = self.formats.iter().filter_map(FormatJson::to_descriptor).collect();
        if streams.is_empty() {
            warn!("No downloadable stream listed for {requested_url}");
        }

        let chapters = self
            .chapters
            .unwrap_or_default()
            .into_iter()
            .map(|c| ChapterRecord {
                start: ChapterTime::from_seconds(c.start_time).to_string(),
                title: c.title.unwrap_or_default(),
            })
            .collect();

        MediaSource::new(
            self.webpage_url.unwrap_or_else(|| requested_url.to_owned()),
            self.title.unwrap_or_default(),
            self.description.unwrap_or_default(),
            streams,
            chapters,
        )
    }
}
