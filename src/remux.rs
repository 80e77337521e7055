//! Audio remux stage: reattach the original audio to the repaired picture.
//!
//! The repair pipeline writes a silent intermediate video. This stage encodes
//! the final output from that intermediate, mapping the original source's
//! audio track onto it when one exists. When the source has no audio the
//! output is written video-only; a track is never fabricated.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Encoding parameters for the final output and the silent intermediate.
///
/// These mirror the fixed defaults of the tool (H.264 + AAC at 8000 kbps,
/// `mp4v`-tagged intermediate) but are plain data so alternate profiles can
/// be passed in.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    /// Video codec for the final output.
    pub video_codec: String,
    /// Audio codec for the final output.
    pub audio_codec: String,
    /// Target video bitrate for the final output, in kbps.
    pub bitrate_kbps: u32,
    /// Video codec for the silent intermediate.
    pub intermediate_codec: String,
    /// Codec tag written into the intermediate container.
    pub intermediate_tag: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            bitrate_kbps: 8000,
            intermediate_codec: "mpeg4".to_string(),
            intermediate_tag: "mp4v".to_string(),
        }
    }
}

/// Build the ffmpeg argument list for the final encode.
///
/// With audio: picture from the silent intermediate, audio from the original,
/// truncated to the shorter of the two (`-shortest`). Without audio: the
/// intermediate is re-encoded alone with the audio explicitly disabled.
/// Verbose ffmpeg logging is suppressed either way.
#[must_use]
pub fn remux_args(
    silent: &Path,
    original: &Path,
    output: &Path,
    has_audio: bool,
    settings: &EncodeSettings,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        silent.to_string_lossy().into_owned(),
    ];
    if has_audio {
        args.push("-i".into());
        args.push(original.to_string_lossy().into_owned());
        args.extend([
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
        ]);
    }
    args.extend([
        "-c:v".into(),
        settings.video_codec.clone(),
        "-b:v".into(),
        format!("{}k", settings.bitrate_kbps),
    ]);
    if has_audio {
        args.extend([
            "-c:a".into(),
            settings.audio_codec.clone(),
            "-shortest".into(),
        ]);
    } else {
        args.push("-an".into());
    }
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Encode the final output from the silent intermediate, attaching the
/// original audio track when `has_audio` is set.
///
/// # Errors
///
/// Returns [`Error::Remux`] carrying ffmpeg's stderr when the encode fails
/// (corrupt intermediate, unavailable codec). The caller owns intermediate
/// cleanup, so nothing is deleted here on either path.
pub fn attach_audio(
    silent: &Path,
    original: &Path,
    output: &Path,
    has_audio: bool,
    settings: &EncodeSettings,
) -> Result<()> {
    let args = remux_args(silent, original, output, has_audio, settings);
    let result = Command::new("ffmpeg")
        .args(&args)
        .output()
        .map_err(|e| Error::Remux(format!("failed to run ffmpeg: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        let detail = stderr.trim();
        let detail = if detail.is_empty() {
            format!("ffmpeg exited with {}", result.status)
        } else {
            detail.to_string()
        };
        return Err(Error::Remux(detail));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn paths() -> (PathBuf, PathBuf, PathBuf) {
        (
            PathBuf::from("silent.mp4"),
            PathBuf::from("clip.mp4"),
            PathBuf::from("cleaned_clip.mp4"),
        )
    }

    #[test]
    fn default_settings_match_fixed_profile() {
        let s = EncodeSettings::default();
        assert_eq!(s.video_codec, "libx264");
        assert_eq!(s.audio_codec, "aac");
        assert_eq!(s.bitrate_kbps, 8000);
        assert_eq!(s.intermediate_codec, "mpeg4");
        assert_eq!(s.intermediate_tag, "mp4v");
    }

    #[test]
    fn remux_args_with_audio_maps_both_streams() {
        let (silent, original, out) = paths();
        let args = remux_args(&silent, &original, &out, true, &EncodeSettings::default());

        let inputs: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].clone())
            .collect();
        assert_eq!(inputs, vec!["silent.mp4", "clip.mp4"]);

        assert!(args.windows(2).any(|w| w == ["-map", "0:v:0"]));
        assert!(args.windows(2).any(|w| w == ["-map", "1:a:0"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-b:v", "8000k"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.contains(&"-shortest".to_string()));
        assert_eq!(args.last().unwrap(), "cleaned_clip.mp4");
    }

    #[test]
    fn remux_args_without_audio_never_fabricates_a_track() {
        let (silent, original, out) = paths();
        let args = remux_args(&silent, &original, &out, false, &EncodeSettings::default());

        // Only the silent intermediate is opened, and audio is disabled.
        let inputs: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].clone())
            .collect();
        assert_eq!(inputs, vec!["silent.mp4"]);
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"-c:a".to_string()));
        assert!(!args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn remux_args_respect_custom_settings() {
        let (silent, original, out) = paths();
        let settings = EncodeSettings {
            video_codec: "libx265".to_string(),
            audio_codec: "libopus".to_string(),
            bitrate_kbps: 2500,
            ..EncodeSettings::default()
        };
        let args = remux_args(&silent, &original, &out, true, &settings);
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx265"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "libopus"]));
        assert!(args.windows(2).any(|w| w == ["-b:v", "2500k"]));
    }

    #[test]
    fn remux_logging_is_suppressed() {
        let (silent, original, out) = paths();
        let args = remux_args(&silent, &original, &out, true, &EncodeSettings::default());
        assert!(args.windows(2).any(|w| w == ["-loglevel", "error"]));
    }
}
