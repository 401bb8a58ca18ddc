use std::{
    fmt::Display,
    sync::atomic::{AtomicU8, Ordering},
};

use tracing::info;

/// The transfer a progress event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStage {
    Video,
    Audio,
}

impl Display for DownloadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStage::Video => f.write_str("video"),
            DownloadStage::Audio => f.write_str("audio"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: DownloadStage,
    pub bytes_done: u64,
    /// Unknown when the provider does not announce the size
    pub bytes_total: Option<u64>,
}

impl ProgressEvent {
    pub fn percent(&self) -> Option<u8> {
        let total = self.bytes_total.filter(|&t| t > 0)?;
        Some((self.bytes_done.min(total) * 100 / total) as u8)
    }
}

/// Receiver of download progress.
///
/// Called from the thread reading the provider output, so it must return quickly.
/// Events of different stages carry no ordering guarantee.
pub trait Progress: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Discard every event
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Log a line every time a transfer crosses a 10% step
#[derive(Default)]
pub struct LogProgress {
    video: AtomicU8,
    audio: AtomicU8,
}

impl LogProgress {
    fn last_step(&self, stage: DownloadStage) -> &AtomicU8 {
        match stage {
            DownloadStage::Video => &self.video,
            DownloadStage::Audio => &self.audio,
        }
    }
}

impl Progress for LogProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        let Some(percent) = event.percent() else {
            return;
        };

        let step = percent / 10;
        let previous = self.last_step(event.stage).fetch_max(step, Ordering::Relaxed);
        if step > previous {
            info!(
                "Downloading {}: {percent:>3}% ({} / {} bytes)",
                event.stage,
                event.bytes_done,
                event.bytes_total.unwrap_or_default()
            );
        }
    }
}
