use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use miette::{miette, Context, IntoDiagnostic};
use tracing::{debug, trace};

use crate::{error::Result, types::Extension};

/// Prefix of the per-run working directories
pub const RUN_DIR_PREFIX: &str = ".ytmux-";

/// Characters that must not end up in a file name.
/// `%` would also be read as a template field by the stream downloader.
const FORBIDDEN_CHARS: &[char] = &[
    '/', '\\', '|', ':', '*', '?', '"', '<', '>', '%', '~', '$', '#',
];

/// Turn a video title into a file stem
pub fn sanitize_file_stem(title: &str) -> String {
    let stem = title
        .split(|c: char| FORBIDDEN_CHARS.contains(&c) || c.is_control())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    // Leading dots would hide the file, or refer to a parent directory
    let stem = stem.trim_start_matches('.').trim();
    if stem.is_empty() {
        "video".to_owned()
    } else {
        stem.to_owned()
    }
}

/// Create a fresh directory for one run inside `parent`.
///
/// The name is random and created exclusively, so concurrent runs never share one.
pub fn create_run_dir(parent: &Path) -> Result<PathBuf> {
    fs::create_dir_all(parent)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not create directory {}", parent.display()))?;

    for _ in 0..16 {
        let dir = parent.join(format!("{RUN_DIR_PREFIX}{:08x}", fastrand::u32(..)));
        match fs::create_dir(&dir) {
            Ok(()) => {
                debug!("Working in {}", dir.display());
                return Ok(dir);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(err)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Could not create run directory in {}", parent.display()))
                    .map_err(Into::into)
            }
        }
    }

    Err(miette!("Could not find a free run directory name in {}", parent.display()).into())
}

/// Reserve a path in `out_dir` for `<stem><ext>` by creating it empty.
///
/// The first candidate is `<stem><ext>`, then `<stem> (2)<ext>`, `<stem> (3)<ext>`...
/// Creation is exclusive so two runs can never claim the same name.
pub fn claim_unused_path(out_dir: &Path, stem: &str, extension: Extension) -> Result<PathBuf> {
    let dot_ext = extension.with_dot();
    let candidates = std::iter::once(format!("{stem}{dot_ext}"))
        .chain((2u16..).map(|n| format!("{stem} ({n}){dot_ext}")));

    for name in candidates {
        let output = out_dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&output) {
            Ok(_) => return Ok(output),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(err)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Could not create {}", output.display()))
                    .map_err(Into::into)
            }
        }
    }

    Err(miette!("Too many files named '{stem}{dot_ext}' in {}", out_dir.display()).into())
}

/// Remove a file, a missing file being a success
pub fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            trace!("Removed {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist, nothing to remove", path.display());
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// `path` without its extension, e.g. `dir/name.mp4` -> `dir/name`
pub fn strip_extension(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// `path` with `suffix` appended to its file name
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::{
        claim_unused_path, create_run_dir, remove_if_exists, sanitize_file_stem, with_suffix,
        RUN_DIR_PREFIX,
    };
    use crate::types::Extension;

    #[test]
    fn sanitizes_titles() {
        assert_eq!(sanitize_file_stem("Live | Full Set"), "Live Full Set");
        assert_eq!(sanitize_file_stem("AC/DC: Back in Black"), "AC DC Back in Black");
        assert_eq!(sanitize_file_stem("100% Pure"), "100 Pure");
        assert_eq!(sanitize_file_stem("../secret"), "secret");
        assert_eq!(sanitize_file_stem("???"), "video");
        assert_eq!(sanitize_file_stem("v1.2 release"), "v1.2 release");
    }

    #[test]
    fn claimed_paths_count_up() {
        let dir = tempfile::tempdir().unwrap();

        let first = claim_unused_path(dir.path(), "song", Extension::M4a).unwrap();
        assert_eq!(first, dir.path().join("song.m4a"));
        assert!(first.exists());

        let second = claim_unused_path(dir.path(), "song", Extension::M4a).unwrap();
        assert_eq!(second, dir.path().join("song (2).m4a"));

        fs::remove_file(&first).unwrap();
        let again = claim_unused_path(dir.path(), "song", Extension::M4a).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn removing_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.mp4");
        assert!(remove_if_exists(&path).is_ok());

        fs::write(&path, b"x").unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn run_dirs_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let a = create_run_dir(dir.path()).unwrap();
        let b = create_run_dir(dir.path()).unwrap();

        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(RUN_DIR_PREFIX));
    }

    #[test]
    fn suffix_is_added_to_file_name() {
        assert_eq!(
            with_suffix(Path::new("dir/My Song"), "_chapter.txt"),
            Path::new("dir/My Song_chapter.txt")
        );
    }
}
