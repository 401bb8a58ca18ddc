use std::{
    io::{BufRead, BufReader},
    process::{Command, ExitStatus, Output, Stdio},
};

use bitflags::bitflags;
use miette::{miette, Context, IntoDiagnostic};
use tracing::{debug, trace, Level};

use crate::error::Result;

pub const YT_DL: &str = "youtube-dl";
pub const YT_DLP: &str = "yt-dlp";
pub const FFMPEG: &str = "ffmpeg";
pub const MP4BOX: &str = "MP4Box";
pub const FFXXX_DEFAULT_ARGS: [&str; 3] = ["-hide_banner", "-loglevel", "error"];

/// Number of stderr lines kept to explain a failure
const STDERR_TAIL_LINES: usize = 5;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capture: u8 {
        const STDIN = 0b0000001;
        const STDOUT = 0b0000010;
        const STDERR = 0b0000100;
    }
}

/// Run a command, returning its raw output handle.
///
/// IO handles will be captured only if the caller required it or if the log level is Debug.
/// In that last case, `stdout` and `stderr` will be logged.
///
/// The function returns an error only if the command failed to execute.
/// If the program runs but returns a non-0 status code, it will not trigger an error.
pub fn run_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
    capture: Capture,
) -> Result<Output> {
    let is_debug = tracing::enabled!(Level::DEBUG);
    let get_io = |capture| {
        if capture {
            Stdio::piped()
        } else {
            Stdio::null()
        }
    };

    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(get_io(capture.contains(Capture::STDIN)))
        .stdout(get_io(is_debug || capture.contains(Capture::STDOUT)))
        .stderr(get_io(is_debug || capture.contains(Capture::STDERR)));

    debug!("Executing command: {cmd:?}");
    let res = cmd
        .output()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not run {program} command"))?;

    if is_debug {
        debug!("status: {}", res.status);
        debug!("stdout: {} bytes long", res.stdout.len());
        trace!("stdout: {:?}", String::from_utf8_lossy(&res.stdout));
        debug!("stderr: {} bytes long", res.stderr.len());
        trace!("stderr: {:?}", String::from_utf8_lossy(&res.stderr));
    }

    Ok(res)
}

/// Run the command and verify that it has returned a success status code.
///
/// On failure, the error message carries the end of the program's stderr.
pub fn assert_success_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
) -> Result<()> {
    let res = run_command(program, f, Capture::STDERR)?;
    if res.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&res.stderr);
        Err(miette!(
            "{program} did run but was not successful ({}): {}",
            res.status,
            stderr_tail(&stderr)
        )
        .into())
    }
}

/// Outcome of [`stream_command`]
#[derive(Debug)]
pub struct StreamedRun {
    pub status: ExitStatus,
    /// Last lines written on stderr
    pub stderr_tail: String,
}

/// Run a command and hand every line it prints, on stdout or stderr, to `on_line`
/// as soon as it is written.
///
/// Both pipes are drained concurrently, so `on_line` may be called from two threads.
pub fn stream_command<F, L>(program: &str, f: F, on_line: L) -> Result<StreamedRun>
where
    F: FnOnce(&mut Command) -> &mut Command,
    L: Fn(&str) + Sync,
{
    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Executing command: {cmd:?}");
    let mut child = cmd
        .spawn()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not run {program} command"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| miette!("stdout of {program} is not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| miette!("stderr of {program} is not captured"))?;

    let on_line = &on_line;
    let stderr_lines = std::thread::scope(|scope| {
        let err_reader = scope.spawn(move || {
            let mut lines = Vec::new();
            for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                trace!("{program} stderr: {line}");
                on_line(&line);
                lines.push(line);
            }
            lines
        });

        for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
            trace!("{program} stdout: {line}");
            on_line(&line);
        }

        err_reader.join().unwrap_or_default()
    });

    let status = child
        .wait()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not wait for {program} to exit"))?;
    debug!("status: {status}");

    Ok(StreamedRun {
        status,
        stderr_tail: stderr_tail(&stderr_lines.join("\n")),
    })
}

/// Keep the last meaningful lines of an error output
pub fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("; ")
}
