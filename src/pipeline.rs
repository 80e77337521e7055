//! Frame repair pipeline: decode, inpaint the watermark region, re-encode.
//!
//! Frames are decoded sequentially as raw rgb24 via ffmpeg-sidecar, the
//! watermark rectangle is filled with Telea fast-marching inpainting, and the
//! repaired frames are piped straight into a spawned ffmpeg encoder that
//! writes the silent intermediate video. The pipeline is single-threaded and
//! blocking; the per-frame boundary doubles as the cancellation checkpoint.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use image::RgbImage;
use inpaint::ImageInpaint;

use crate::error::{Error, Result};
use crate::probe::VideoInfo;
use crate::region::WatermarkRegion;
use crate::remux::EncodeSettings;

/// Telea radius of influence, in pixels.
const INPAINT_RADIUS: i32 = 3;

/// Observer cadence: one update per this many frames.
pub const PROGRESS_INTERVAL: u64 = 10;

/// A progress notification emitted by the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    /// Frames repaired so far.
    pub frames_done: u64,
    /// Total frames expected, when the container reports one.
    pub total_frames: Option<u64>,
}

/// Observer callback invoked every [`PROGRESS_INTERVAL`] frames and once at
/// the end of the stream.
pub type ProgressObserver = dyn Fn(ProgressUpdate) + Send + Sync;

/// Build the ffmpeg argument list for the silent intermediate encoder.
///
/// The encoder reads raw rgb24 frames on stdin at the source geometry and
/// rate, and writes an audio-less video with the configured intermediate
/// codec and tag.
#[must_use]
pub fn encoder_args(intermediate: &Path, info: &VideoInfo, settings: &EncodeSettings) -> Vec<String> {
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{}x{}", info.width, info.height),
        "-r".into(),
        info.frame_rate.clone(),
        "-i".into(),
        "-".into(),
        "-c:v".into(),
        settings.intermediate_codec.clone(),
        "-tag:v".into(),
        settings.intermediate_tag.clone(),
        "-q:v".into(),
        "2".into(),
        "-an".into(),
        intermediate.to_string_lossy().into_owned(),
    ]
}

/// Repair every frame of `input` and write the silent intermediate video.
///
/// The mask is built once from the clipped watermark rectangle and reused for
/// every frame. A rectangle that clips to nothing passes frames through
/// unchanged. End of stream is not an error; the decoder and encoder are both
/// flushed and closed before returning the number of frames written.
///
/// # Errors
///
/// Returns [`Error::Decode`] when the source yields no frames or a frame with
/// unexpected geometry, [`Error::Inpaint`] when the Telea step rejects a
/// frame, [`Error::Encode`] when the intermediate encoder fails, and
/// [`Error::Cancelled`] when `cancel` is raised between frames.
pub fn repair_frames(
    input: &Path,
    intermediate: &Path,
    info: &VideoInfo,
    region: &WatermarkRegion,
    settings: &EncodeSettings,
    observer: Option<&ProgressObserver>,
    cancel: Option<&AtomicBool>,
) -> Result<u64> {
    let mut decoder = FfmpegCommand::new()
        .input(input.to_string_lossy().as_ref())
        .rawvideo()
        .spawn()
        .map_err(|e| Error::Decode(format!("failed to spawn ffmpeg decoder: {e}")))?;
    let frames = decoder
        .iter()
        .map_err(|e| Error::Decode(e.to_string()))?
        .filter_frames();

    let (encoder, mut stdin) =
        SilentEncoder::spawn("ffmpeg", encoder_args(intermediate, info, settings))?;

    // The rectangle is constant for the whole run, so the mask is too.
    let mask = region.build_mask(info.width, info.height);
    let mut frames_done = 0u64;

    for frame in frames {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                drop(stdin);
                encoder.abort();
                shutdown_decoder(&mut decoder);
                return Err(Error::Cancelled {
                    frames: frames_done,
                });
            }
        }

        if frame.width != info.width || frame.height != info.height {
            drop(stdin);
            encoder.abort();
            shutdown_decoder(&mut decoder);
            return Err(Error::Decode(format!(
                "frame {} has unexpected geometry {}x{} (source is {}x{})",
                frame.frame_num, frame.width, frame.height, info.width, info.height
            )));
        }

        let data = match &mask {
            Some(mask) => {
                let Some(mut img) = RgbImage::from_raw(frame.width, frame.height, frame.data)
                else {
                    drop(stdin);
                    encoder.abort();
                    shutdown_decoder(&mut decoder);
                    return Err(Error::Decode(format!(
                        "frame {} buffer does not match rgb24 geometry",
                        frame.frame_num
                    )));
                };
                if let Err(e) = img.telea_inpaint(mask, INPAINT_RADIUS) {
                    drop(stdin);
                    encoder.abort();
                    shutdown_decoder(&mut decoder);
                    return Err(Error::Inpaint(e.to_string()));
                }
                img.into_raw()
            }
            // Region clipped to nothing: pass the frame through untouched.
            None => frame.data,
        };

        if let Err(e) = stdin.write_all(&data) {
            drop(stdin);
            let err = encoder.failure(&e.to_string());
            shutdown_decoder(&mut decoder);
            return Err(err);
        }
        frames_done += 1;

        if frames_done % PROGRESS_INTERVAL == 0 {
            if let Some(observer) = observer {
                observer(ProgressUpdate {
                    frames_done,
                    total_frames: info.frame_count,
                });
            }
        }
    }

    // End of stream: flush the encoder by closing its stdin, then reap both
    // children.
    drop(stdin);
    let _ = decoder.wait();
    encoder.finish()?;

    if frames_done == 0 {
        return Err(Error::Decode(
            "source produced no decodable frames".to_string(),
        ));
    }

    if let Some(observer) = observer {
        observer(ProgressUpdate {
            frames_done,
            total_frames: info.frame_count,
        });
    }
    Ok(frames_done)
}

/// A spawned encoder child whose stderr is drained on a helper thread.
///
/// The frame loop only ever writes the child's stdin; without a dedicated
/// reader an unusually chatty encoder could fill the stderr pipe and stall
/// both processes. The drained output is folded into the error when the
/// child fails.
struct SilentEncoder {
    child: Child,
    stderr: JoinHandle<String>,
}

impl SilentEncoder {
    /// Spawn the encoder and hand back its stdin pipe.
    fn spawn(program: &str, args: Vec<String>) -> Result<(Self, ChildStdin)> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Encode(format!("failed to spawn encoder: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Encode("encoder stdin unavailable".to_string()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| Error::Encode("encoder stderr unavailable".to_string()))?;
        let stderr = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf);
            buf
        });
        Ok((Self { child, stderr }, stdin))
    }

    /// Wait for a clean exit; a non-zero status becomes [`Error::Encode`]
    /// carrying whatever the child wrote to stderr.
    fn finish(mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .map_err(|e| Error::Encode(format!("failed to wait for encoder: {e}")))?;
        let stderr = self.stderr.join().unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(Error::Encode(if stderr.trim().is_empty() {
                format!("encoder exited with {status}")
            } else {
                stderr.trim().to_string()
            }))
        }
    }

    /// Reap the child after a mid-stream write failure, folding any stderr
    /// it produced into the returned error.
    fn failure(mut self, write_error: &str) -> Error {
        let _ = self.child.wait();
        let stderr = self.stderr.join().unwrap_or_default();
        if stderr.trim().is_empty() {
            Error::Encode(format!("encoder pipe closed: {write_error}"))
        } else {
            Error::Encode(stderr.trim().to_string())
        }
    }

    /// Kill and reap the child on an abort path.
    fn abort(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = self.stderr.join();
    }
}

/// Best-effort teardown of the decoder child on an abort path.
fn shutdown_decoder(decoder: &mut FfmpegChild) {
    let _ = decoder.kill();
    let _ = decoder.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn info_640x480() -> VideoInfo {
        VideoInfo {
            width: 640,
            height: 480,
            frame_rate: "30/1".to_string(),
            fps: 30.0,
            frame_count: Some(150),
            duration: Some(Duration::from_secs(5)),
            has_audio: true,
        }
    }

    #[test]
    fn encoder_args_pin_geometry_rate_and_tag() {
        let args = encoder_args(
            &PathBuf::from("silent.mp4"),
            &info_640x480(),
            &EncodeSettings::default(),
        );
        assert!(args.windows(2).any(|w| w == ["-s", "640x480"]));
        assert!(args.windows(2).any(|w| w == ["-r", "30/1"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "rgb24"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "mpeg4"]));
        assert!(args.windows(2).any(|w| w == ["-tag:v", "mp4v"]));
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last().unwrap(), "silent.mp4");
    }

    #[test]
    fn encoder_args_read_raw_frames_from_stdin() {
        let args = encoder_args(
            &PathBuf::from("silent.mp4"),
            &info_640x480(),
            &EncodeSettings::default(),
        );
        assert!(args.windows(2).any(|w| w == ["-i", "-"]));
        assert!(args.windows(2).any(|w| w == ["-f", "rawvideo"]));
    }

    #[test]
    fn progress_interval_matches_coarse_reporting() {
        // One update per ten frames, mirroring the UI cadence.
        assert_eq!(PROGRESS_INTERVAL, 10);
        let updates = (1..=150u64).filter(|f| f % PROGRESS_INTERVAL == 0).count();
        assert_eq!(updates, 15);
    }

    #[test]
    #[cfg(unix)]
    fn encoder_finish_reaps_child_and_accepts_clean_exit() {
        let (encoder, mut stdin) =
            SilentEncoder::spawn("sh", vec!["-c".into(), "cat > /dev/null".into()]).unwrap();
        stdin.write_all(b"frame bytes").unwrap();
        drop(stdin);
        assert!(encoder.finish().is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn encoder_failure_surfaces_drained_stderr() {
        let (encoder, stdin) =
            SilentEncoder::spawn("sh", vec!["-c".into(), "echo oh no >&2; exit 1".into()])
                .unwrap();
        drop(stdin);
        let err = encoder.finish().unwrap_err();
        assert!(err.to_string().contains("oh no"));
    }

    #[test]
    #[cfg(unix)]
    fn encoder_drains_stderr_past_pipe_capacity() {
        // 256 KiB of stderr, well past the usual 64 KiB pipe buffer; without
        // the reader thread the child would block on stderr and never exit.
        let script =
            "i=0; while [ $i -lt 4096 ]; do printf '%063d\\n' $i >&2; i=$((i+1)); done; exit 1";
        let (encoder, stdin) =
            SilentEncoder::spawn("sh", vec!["-c".into(), script.into()]).unwrap();
        drop(stdin);
        let err = encoder.finish().unwrap_err();
        assert!(err.to_string().len() > 64 * 1024);
    }

    #[test]
    #[cfg(unix)]
    fn encoder_abort_reaps_a_running_child() {
        let (encoder, _stdin) =
            SilentEncoder::spawn("sh", vec!["-c".into(), "sleep 30".into()]).unwrap();
        // Must return promptly rather than waiting out the sleep.
        encoder.abort();
    }
}
