//! Frame encoders: the ffmpeg-backed production encoder and an in-memory
//! sink for tests and dry runs.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::{VizError, Result};

/// Everything an encoder needs to open its output.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_bps: u64,
    pub track_name: String,
    pub out_dir: PathBuf,
    /// Source audio to mux into the container, if available.
    pub audio_path: Option<PathBuf>,
}

/// Sink for raw RGBA frames. `finish` seals the container and yields the
/// output path; `abort` tears down without exposing a partial file.
pub trait FrameEncoder {
    fn write_frame(&mut self, rgba: &[u8]) -> Result<()>;
    fn finish(&mut self) -> Result<PathBuf>;
    fn abort(&mut self);
}

/// Encoder that pipes raw frames into an ffmpeg child process.
///
/// Prefers VP9 in WebM and falls back to H.264 in MP4 when the VP9 encoder
/// is not compiled into the local ffmpeg.
#[derive(Debug)]
pub struct FfmpegEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    output: PathBuf,
    frame_bytes: usize,
}

impl FfmpegEncoder {
    pub fn open(settings: &EncoderSettings) -> Result<Self> {
        let (video_codec, audio_codec, ext) = select_codec()?;
        let file_name = format!(
            "{}_{}x{}.{ext}",
            sanitize_track_name(&settings.track_name),
            settings.width,
            settings.height
        );
        let output = settings.out_dir.join(file_name);

        let size = format!("{}x{}", settings.width, settings.height);
        let fps = settings.fps.to_string();
        let bitrate = settings.bitrate_bps.to_string();

        let mut command = Command::new("ffmpeg");
        command
            .arg("-y")
            .args(["-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &size, "-r", &fps])
            .args(["-i", "-"]);
        if let Some(audio) = &settings.audio_path {
            command.arg("-i").arg(audio);
        }
        command
            .args(["-c:v", video_codec, "-b:v", &bitrate])
            .args(["-pix_fmt", "yuv420p"]);
        if settings.audio_path.is_some() {
            command.args(["-c:a", audio_codec, "-shortest"]);
        }
        command
            .arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|e| VizError::Encoder(format!("failed to launch ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VizError::Encoder("ffmpeg stdin unavailable".into()))?;

        Ok(Self {
            child: Some(child),
            stdin: Some(stdin),
            output,
            frame_bytes: settings.width as usize * settings.height as usize * 4,
        })
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output
    }
}

impl FrameEncoder for FfmpegEncoder {
    fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        if rgba.len() != self.frame_bytes {
            return Err(VizError::Encoder(format!(
                "frame size mismatch: got {} bytes, expected {}",
                rgba.len(),
                self.frame_bytes
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| VizError::Encoder("encoder already closed".into()))?;
        stdin
            .write_all(rgba)
            .map_err(|e| VizError::Encoder(format!("ffmpeg rejected frame: {e}")))
    }

    fn finish(&mut self) -> Result<PathBuf> {
        // Closing stdin signals end of stream.
        self.stdin.take();
        let mut child = self
            .child
            .take()
            .ok_or_else(|| VizError::Encoder("encoder already closed".into()))?;
        let status = child
            .wait()
            .map_err(|e| VizError::Encoder(format!("ffmpeg did not exit: {e}")))?;
        if status.success() {
            Ok(self.output.clone())
        } else {
            let _ = std::fs::remove_file(&self.output);
            Err(VizError::Encoder(format!("ffmpeg exited with {status}")))
        }
    }

    fn abort(&mut self) {
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            let _ = std::fs::remove_file(&self.output);
        }
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // Never leave a half-written file behind.
        self.abort();
    }
}

/// Probes the local ffmpeg for VP9 support; falls back to H.264.
fn select_codec() -> Result<(&'static str, &'static str, &'static str)> {
    let probe = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| VizError::Encoder(format!("ffmpeg not available: {e}")))?;
    let listing = String::from_utf8_lossy(&probe.stdout);
    if listing.contains("libvpx-vp9") {
        Ok(("libvpx-vp9", "libopus", "webm"))
    } else {
        Ok(("libx264", "aac", "mp4"))
    }
}

fn sanitize_track_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// In-memory sink that just counts frames. Used by tests and `--dry-run`
/// style invocations where no real encoder should spawn.
#[derive(Debug, Default)]
pub struct MemoryEncoder {
    pub frames_written: u64,
    pub finished: bool,
    pub aborted: bool,
    pub bytes_per_frame: Option<usize>,
    /// When set, `write_frame` fails once this many frames have been
    /// accepted.
    pub fail_after: Option<u64>,
}

impl MemoryEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameEncoder for MemoryEncoder {
    fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        if let Some(limit) = self.fail_after {
            if self.frames_written >= limit {
                return Err(VizError::Encoder("simulated encoder failure".into()));
            }
        }
        if let Some(expected) = self.bytes_per_frame {
            if rgba.len() != expected {
                return Err(VizError::Encoder("frame size mismatch".into()));
            }
        } else {
            self.bytes_per_frame = Some(rgba.len());
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<PathBuf> {
        self.finished = true;
        Ok(PathBuf::from("memory://export"))
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}
