//! Error types for the video-watermark-removal crate.

use std::path::PathBuf;

/// Errors that can occur while probing, repairing, or remuxing a video.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source file is missing, not a video, or cannot be opened.
    #[error("cannot open source video: {}", path.display())]
    SourceUnreadable {
        /// Path of the unreadable source.
        path: PathBuf,
    },

    /// ffprobe ran but its output could not be interpreted.
    #[error("failed to probe video metadata: {0}")]
    Probe(String),

    /// The decoder produced no frames or stopped with an error.
    #[error("video decode error: {0}")]
    Decode(String),

    /// The Telea inpainting step rejected a frame or mask.
    #[error("inpainting failed: {0}")]
    Inpaint(String),

    /// The intermediate silent video could not be encoded.
    #[error("failed to encode repaired video: {0}")]
    Encode(String),

    /// Audio remux / final encode failed (corrupt intermediate, codec unavailable).
    #[error("audio remux failed: {0}")]
    Remux(String),

    /// Processing was cancelled at a frame boundary.
    #[error("processing cancelled after {frames} frames")]
    Cancelled {
        /// Number of frames repaired before cancellation.
        frames: u64,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
