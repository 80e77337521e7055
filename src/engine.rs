//! Core video watermark removal engine.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;
use crate::pipeline::{self, ProgressObserver};
use crate::probe;
use crate::region::WatermarkRegion;
use crate::remux::{self, EncodeSettings};

/// Options controlling one watermark removal run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// The rectangle to inpaint on every frame.
    pub region: WatermarkRegion,
    /// Codec and bitrate profile for the intermediate and final encodes.
    pub encode: EncodeSettings,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Result of processing a single video file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Number of frames repaired.
    pub frames_processed: u64,
    /// Whether the final output carries an audio track.
    pub has_audio: bool,
    /// Human-readable status message.
    pub message: String,
}

/// The removal engine: probe, repair frames, remux audio.
///
/// Create with [`RemovalEngine::new()`], optionally attach a progress
/// observer and a cancellation flag, and call
/// [`process_file`](RemovalEngine::process_file) per video. Every run owns a
/// unique intermediate file that is removed on all exit paths, so concurrent
/// runs never collide and failures never leak the silent video.
#[derive(Default)]
pub struct RemovalEngine {
    observer: Option<Box<ProgressObserver>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl RemovalEngine {
    /// Create a new engine with no observer and no cancellation flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a progress observer, invoked every tenth frame and at the end
    /// of the stream.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Attach a cancellation flag, checked at each frame boundary.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Process a single video: probe, repair every frame, reattach audio.
    ///
    /// Returns a [`ProcessResult`] carrying success/failure and a readable
    /// message; pipeline errors never propagate as panics. The intermediate
    /// silent video is removed whether or not the run succeeds.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            frames_processed: 0,
            has_audio: false,
            message: String::new(),
        };

        let info = match probe::probe_video(input) {
            Ok(info) => info,
            Err(e) => {
                result.message = e.to_string();
                return result;
            }
        };
        result.has_audio = info.has_audio;

        let intermediate = intermediate_path(input);
        let _cleanup = CleanupGuard {
            path: intermediate.clone(),
        };

        match pipeline::repair_frames(
            input,
            &intermediate,
            &info,
            &opts.region,
            &opts.encode,
            self.observer.as_deref(),
            self.cancel.as_deref(),
        ) {
            Ok(frames) => result.frames_processed = frames,
            Err(e) => {
                result.message = e.to_string();
                return result;
            }
        }

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = Error::Io(e).to_string();
                    return result;
                }
            }
        }

        match remux::attach_audio(&intermediate, input, output, info.has_audio, &opts.encode) {
            Ok(()) => {
                result.success = true;
                result.message = if info.has_audio {
                    "watermark removed".to_string()
                } else {
                    "watermark removed (source has no audio track)".to_string()
                };
            }
            Err(e) => {
                result.message = e.to_string();
            }
        }
        result
    }
}

/// Removes the intermediate silent video on every exit path.
struct CleanupGuard {
    path: PathBuf,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Unique, session-scoped path for the intermediate silent video.
///
/// Namespaced by process id, a per-process counter, and a nanosecond
/// timestamp so concurrent runs against the same source never collide.
fn intermediate_path(input: &Path) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let run = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    std::env::temp_dir().join(format!(
        "{stem}_silent_{}_{run}_{nanos}.mp4",
        std::process::id()
    ))
}

/// Check if a file has a supported video container extension.
#[must_use]
pub fn is_supported_video(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(ext.to_lowercase().as_str(), "mp4" | "mov" | "avi"),
        None => false,
    }
}

/// Generate a default output path from an input path.
///
/// Example: `"clip.mp4"` becomes `"cleaned_clip.mp4"`. The output container
/// is always `.mp4` regardless of the input extension.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("cleaned_{stem}.mp4"))
}
