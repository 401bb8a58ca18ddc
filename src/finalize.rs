use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    download::DownloadResult,
    error::{Error, Result},
    io::{claim_unused_path, remove_if_exists, strip_extension, with_suffix},
    types::Extension,
};

/// Delete the downloaded streams and the chapters file.
///
/// Missing files are skipped. Other failures only leave a stray file behind, so they
/// are logged and do not stop the run.
pub fn cleanup(result: &DownloadResult) {
    let intermediates = std::iter::once(&result.audio)
        .chain(result.video.as_ref())
        .chain(result.chapters.as_ref());

    for path in intermediates {
        if let Err(err) = remove_if_exists(path) {
            warn!("Could not delete {}: {err}", path.display());
        }
    }
}

/// Move the muxed file to its final name.
///
/// Only called once the muxed file is known to exist. On failure it is left where it is.
pub fn finalize(muxed: &Path, canonical: &Path) -> Result<()> {
    if !muxed.exists() {
        return Err(Error::FinalizeFailed {
            path: muxed.to_path_buf(),
            reason: "muxed file does not exist".to_owned(),
        });
    }

    fs::rename(muxed, canonical).map_err(|err| Error::FinalizeFailed {
        path: muxed.to_path_buf(),
        reason: format!("could not rename to {}: {err}", canonical.display()),
    })?;

    info!("Saved {}", canonical.display());
    Ok(())
}

/// Claim a free `<stem>.<ext>` name in `out_dir` and move the muxed file to it.
///
/// On failure the muxed file stays where it is and the claimed name is released.
pub fn place_output(
    muxed: &Path,
    out_dir: &Path,
    stem: &str,
    extension: Extension,
) -> Result<PathBuf> {
    let canonical =
        claim_unused_path(out_dir, stem, extension).map_err(|err| Error::FinalizeFailed {
            path: muxed.to_path_buf(),
            reason: err.to_string(),
        })?;

    if let Err(err) = finalize(muxed, &canonical) {
        if let Err(release) = remove_if_exists(&canonical) {
            warn!("Could not release {}: {release}", canonical.display());
        }
        return Err(err);
    }

    Ok(canonical)
}

/// Move the description sidecar next to the final file, as `<final stem>.txt`.
///
/// Returns where the sidecar ends up, which is its old place if it could not be moved.
pub fn relocate_sidecar(sidecar: &Path, canonical: &Path) -> PathBuf {
    let target = with_suffix(&strip_extension(canonical), ".txt");
    match fs::rename(sidecar, &target) {
        Ok(()) => target,
        Err(err) => {
            warn!("Could not move {}: {err}", sidecar.display());
            sidecar.to_path_buf()
        }
    }
}

/// Remove the run directory if nothing was left in it
pub fn remove_run_dir(work_dir: &Path) {
    if let Err(err) = fs::remove_dir(work_dir) {
        debug!("Keeping {}: {err}", work_dir.display());
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{cleanup, finalize, place_output, relocate_sidecar, remove_run_dir};
    use crate::{
        chapters::ChapterSource, download::DownloadResult, error::Error, types::Extension,
    };

    #[test]
    fn cleanup_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.m4a");
        let chapters = dir.path().join("a_chapter.txt");
        fs::write(&chapters, "x").unwrap();

        let result = DownloadResult {
            audio: audio.clone(),
            video: Some(dir.path().join("a.mp4")),
            chapters: Some(chapters.clone()),
            description: dir.path().join("a.txt"),
            chapter_source: ChapterSource::Description,
        };
        cleanup(&result);

        assert!(!chapters.exists());
        assert!(!audio.exists());
    }

    #[test]
    fn cleanup_keeps_the_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.m4a");
        let description = dir.path().join("a.txt");
        fs::write(&audio, "x").unwrap();
        fs::write(&description, "x").unwrap();

        cleanup(&DownloadResult {
            audio: audio.clone(),
            video: None,
            chapters: None,
            description: description.clone(),
            chapter_source: ChapterSource::None,
        });

        assert!(!audio.exists());
        assert!(description.exists());
    }

    #[test]
    fn finalize_renames_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let muxed = dir.path().join("a - muxed.mp4");
        let canonical = dir.path().join("a.mp4");
        fs::write(&muxed, "data").unwrap();

        finalize(&muxed, &canonical).unwrap();

        assert!(!muxed.exists());
        assert_eq!(fs::read_to_string(canonical).unwrap(), "data");
    }

    #[test]
    fn finalize_without_muxed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = finalize(&dir.path().join("none.mp4"), &dir.path().join("a.mp4")).unwrap_err();
        assert!(matches!(err, Error::FinalizeFailed { .. }));
    }

    #[test]
    fn placed_output_takes_a_free_name() {
        let dir = tempfile::tempdir().unwrap();
        let muxed = dir.path().join("a - muxed.m4a");
        fs::write(&muxed, "data").unwrap();
        fs::write(dir.path().join("a.m4a"), "older").unwrap();

        let placed = place_output(&muxed, dir.path(), "a", Extension::M4a).unwrap();

        assert_eq!(placed, dir.path().join("a (2).m4a"));
        assert_eq!(fs::read_to_string(placed).unwrap(), "data");
        assert!(!muxed.exists());
    }

    #[test]
    fn unclaimable_name_keeps_muxed_file() {
        let dir = tempfile::tempdir().unwrap();
        let muxed = dir.path().join("a - muxed.mp4");
        fs::write(&muxed, "data").unwrap();
        // A file where the output directory should be
        let out_dir = dir.path().join("out");
        fs::write(&out_dir, "").unwrap();

        let err = place_output(&muxed, &out_dir, "a", Extension::Mp4).unwrap_err();

        assert!(matches!(err, Error::FinalizeFailed { ref path, .. } if *path == muxed));
        assert_eq!(fs::read_to_string(&muxed).unwrap(), "data");
    }

    #[test]
    fn failed_rename_releases_claimed_name() {
        let dir = tempfile::tempdir().unwrap();
        // A directory can not replace the claimed file
        let muxed = dir.path().join("a - muxed.mp4");
        fs::create_dir(&muxed).unwrap();
        fs::write(muxed.join("inner"), "data").unwrap();
        let out_dir = dir.path().join("out");
        fs::create_dir(&out_dir).unwrap();

        let err = place_output(&muxed, &out_dir, "a", Extension::Mp4).unwrap_err();

        assert!(matches!(err, Error::FinalizeFailed { .. }));
        assert!(muxed.join("inner").exists());
        assert!(!out_dir.join("a.mp4").exists());
    }

    #[test]
    fn sidecar_follows_the_final_name() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join(".run");
        fs::create_dir(&run_dir).unwrap();
        let sidecar = run_dir.join("a.txt");
        fs::write(&sidecar, "From: x").unwrap();

        let moved = relocate_sidecar(&sidecar, &dir.path().join("a (2).mp4"));

        assert_eq!(moved, dir.path().join("a (2).txt"));
        assert!(moved.exists());
        remove_run_dir(&run_dir);
        assert!(!run_dir.exists());
    }
}
