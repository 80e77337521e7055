//! Source video metadata via ffprobe.
//!
//! The pipeline needs the frame geometry and rate up front to configure the
//! encoder, and the audio flag to decide whether the remux stage attaches a
//! track. Probing also doubles as the fail-fast "can this source be opened at
//! all" check, so an unreadable file is reported before any frame work starts.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::{Error, Result};

/// Metadata of a source video, read once before processing starts.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate as reported by the container, e.g. `"30000/1001"`.
    ///
    /// Kept in rational form so the encoder receives the exact rate.
    pub frame_rate: String,
    /// Frame rate as a float, for display and frame-count estimation.
    pub fps: f64,
    /// Total frame count, when the container reports or implies one.
    ///
    /// Some containers report neither `nb_frames` nor a duration; progress
    /// reporting then runs without a total.
    pub frame_count: Option<u64>,
    /// Stream duration, when known.
    pub duration: Option<Duration>,
    /// Whether the source carries at least one audio track.
    pub has_audio: bool,
}

/// Probe a source video, failing fast when it cannot be opened.
///
/// # Errors
///
/// Returns [`Error::SourceUnreadable`] when the file is missing or ffprobe
/// cannot open it / finds no video stream, and [`Error::Probe`] when ffprobe
/// output cannot be interpreted.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    if !path.is_file() {
        return Err(Error::SourceUnreadable {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_frames",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=0",
        ])
        .arg(path)
        .output()
        .map_err(|e| Error::Probe(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(Error::SourceUnreadable {
            path: path.to_path_buf(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut info = parse_video_probe(&stdout).ok_or_else(|| Error::SourceUnreadable {
        path: path.to_path_buf(),
    })?;
    info.has_audio = probe_has_audio(path)?;
    Ok(info)
}

/// Check whether a source carries an audio track.
fn probe_has_audio(path: &Path) -> Result<bool> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=codec_type",
            "-of",
            "default=noprint_wrappers=1:nokey=0",
        ])
        .arg(path)
        .output()
        .map_err(|e| Error::Probe(format!("failed to run ffprobe: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().any(|l| l.trim() == "codec_type=audio"))
}

/// Parse `key=value` ffprobe output for the video stream.
///
/// Returns `None` when the output carries no usable video stream (missing
/// width/height). Frame count falls back to `duration * fps` when the
/// container does not report `nb_frames`, and to unknown when neither is
/// available.
fn parse_video_probe(stdout: &str) -> Option<VideoInfo> {
    let mut width = None;
    let mut height = None;
    let mut frame_rate = None;
    let mut nb_frames = None;
    let mut duration = None;

    for line in stdout.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse::<u32>().ok();
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse::<u32>().ok();
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            frame_rate = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("nb_frames=") {
            nb_frames = val.trim().parse::<u64>().ok().filter(|&n| n > 0);
        } else if let Some(val) = line.strip_prefix("duration=") {
            duration = val
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(Duration::from_secs_f64);
        }
    }

    let width = width.filter(|&w| w > 0)?;
    let height = height.filter(|&h| h > 0)?;
    let frame_rate = frame_rate?;
    let fps = parse_frame_rate(&frame_rate)?;

    let frame_count = nb_frames.or_else(|| duration.map(|d| estimate_frames(d, fps)));

    Some(VideoInfo {
        width,
        height,
        frame_rate,
        fps,
        frame_count,
        duration,
        has_audio: false,
    })
}

/// Frame count implied by a duration at a given rate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn estimate_frames(duration: Duration, fps: f64) -> u64 {
    (duration.as_secs_f64() * fps).round() as u64
}

/// Parse a rational frame rate such as `"30000/1001"` or `"30"`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let mut parts = raw.splitn(2, '/');
    let num: f64 = parts.next()?.trim().parse().ok()?;
    let den: f64 = match parts.next() {
        Some(d) => d.trim().parse().ok()?,
        None => 1.0,
    };
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}
