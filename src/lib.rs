//! Remove static video watermarks via frame-by-frame Telea inpainting.
//!
//! A watermark that sits at a fixed position is erased by inpainting the same
//! rectangle on every frame: the source is decoded sequentially, the rectangle
//! is filled from surrounding pixel content (Telea fast-marching, radius 3),
//! the repaired frames are written to a silent intermediate video, and the
//! original audio track (if any) is remuxed onto the repaired picture.
//!
//! Decoding, encoding, and remuxing are delegated to ffmpeg; the `ffmpeg` and
//! `ffprobe` binaries must be on `PATH`.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use video_watermark_removal::{RemovalEngine, ProcessOptions, WatermarkRegion};
//!
//! let engine = RemovalEngine::new();
//! let opts = ProcessOptions {
//!     region: WatermarkRegion::new(20, 20, 200, 80),
//!     ..ProcessOptions::default()
//! };
//! let result = engine.process_file(
//!     Path::new("clip.mp4"),
//!     Path::new("cleaned_clip.mp4"),
//!     &opts,
//! );
//! println!("{}: {}", if result.success { "ok" } else { "failed" }, result.message);
//! ```
//!
//! # Progress and cancellation
//!
//! The engine accepts an observer callback invoked every tenth frame, and a
//! cancellation flag checked at each frame boundary:
//!
//! ```no_run
//! use video_watermark_removal::RemovalEngine;
//!
//! let engine = RemovalEngine::new().with_observer(Box::new(|update| {
//!     match update.total_frames {
//!         Some(total) => eprintln!("frame {}/{total}", update.frames_done),
//!         None => eprintln!("frame {}", update.frames_done),
//!     }
//! }));
//! ```

#![deny(missing_docs)]

pub mod error;
mod engine;
pub mod pipeline;
pub mod probe;
pub mod region;
pub mod remux;

pub use engine::{
    default_output_path, is_supported_video, ProcessOptions, ProcessResult, RemovalEngine,
};
pub use error::{Error, Result};
pub use pipeline::{ProgressObserver, ProgressUpdate};
pub use probe::VideoInfo;
pub use region::WatermarkRegion;
pub use remux::EncodeSettings;
