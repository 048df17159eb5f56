//! Frame-by-frame video watermarking.
//!
//! The source is probed once with `ffprobe` for its dimensions and frame
//! rate, decoded by one `ffmpeg` process into raw `bgr24` frames on a pipe,
//! and re-encoded by a second `ffmpeg` process reading raw frames from its
//! stdin at the same rate and size. Frames are processed strictly in order.
//!
//! The text stamp (glyph masks and anchor) depends only on the settings and
//! the canvas size, so it is computed once per clip and reused for every
//! frame.

use super::color::{outline_for, to_frame_color, FrameColor};
use super::font::{FontChain, GlyphFont};
use super::position::{place, ImageDimensions, PlacementPosition};
use super::text_renderer::{render_mask, TextMask};
use super::{VideoRenderer, WatermarkSettings};
use crate::config::VideoConfig;
use crate::constants::{MIN_VIDEO_THICKNESS, VIDEO_SCALE_BASELINE};
use crate::error::WatermarkError;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Bytes per pixel in the raw frame buffers.
const FRAME_CHANNELS: usize = 3;

/// Stream properties read once from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
}

impl VideoInfo {
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * FRAME_CHANNELS
    }

    pub fn fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }

    fn rate_arg(&self) -> String {
        format!("{}/{}", self.fps_num, self.fps_den)
    }
}

/// Outcome of a completed video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoReport {
    pub info: VideoInfo,
    pub frames: u64,
}

/// Renders watermark settings onto every frame of a video.
#[derive(Debug, Clone)]
pub struct VideoCompositor {
    font: GlyphFont,
    config: VideoConfig,
}

impl VideoCompositor {
    /// Create a compositor, resolving its font once from `fonts`.
    pub fn new(fonts: &FontChain, config: VideoConfig) -> Self {
        Self {
            font: fonts.resolve(),
            config,
        }
    }

    /// Read dimensions and frame rate of the first video stream.
    pub fn probe(&self, input: &Path) -> Result<VideoInfo, WatermarkError> {
        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| WatermarkError::Decode(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(WatermarkError::Decode(format!(
                "ffprobe failed for '{}': {}",
                input.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_output(&output.stdout)
    }

    /// Watermark `input` into `output`.
    ///
    /// On failure nothing usable is left at `output`.
    pub fn render_file(
        &self,
        input: &Path,
        output: &Path,
        settings: &WatermarkSettings,
    ) -> Result<VideoReport, WatermarkError> {
        let started = Instant::now();
        let result = self.render_file_inner(input, output, settings);

        match &result {
            Ok(report) => tracing::info!(
                frames = report.frames,
                width = report.info.width,
                height = report.info.height,
                fps = report.info.fps(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Video watermarked"
            ),
            Err(e) => {
                tracing::error!(error = %e, input = %input.display(), "Video watermarking failed");
                if let Err(rm) = std::fs::remove_file(output) {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(error = %rm, output = %output.display(), "Failed to remove partial output");
                    }
                }
            }
        }

        result
    }

    fn render_file_inner(
        &self,
        input: &Path,
        output: &Path,
        settings: &WatermarkSettings,
    ) -> Result<VideoReport, WatermarkError> {
        let info = self.probe(input)?;
        tracing::debug!(?info, "Probed video source");

        let stamp = FrameStamp::new(
            &self.font,
            settings,
            ImageDimensions {
                width: info.width,
                height: info.height,
            },
        );

        let mut reader = FrameReader::spawn(&self.config, input)?;
        let mut writer = FrameWriter::spawn(&self.config, output, &info)?;

        let mut frame = vec![0u8; info.frame_len()];
        let mut frames = 0u64;

        while reader.read_frame(&mut frame)? {
            stamp.apply(&mut frame, info.width, info.height);
            writer.write_frame(&frame)?;
            frames += 1;
        }

        reader.finish()?;
        writer.finish()?;

        if frames == 0 {
            return Err(WatermarkError::Decode(
                "video source contains no frames".to_string(),
            ));
        }

        Ok(VideoReport { info, frames })
    }

    /// Watermark an in-memory clip, returning the re-encoded clip.
    ///
    /// Input and output are spooled through a scoped temporary directory
    /// that is removed on every exit path.
    pub fn render_bytes(
        &self,
        data: &[u8],
        settings: &WatermarkSettings,
    ) -> Result<Vec<u8>, WatermarkError> {
        let workdir = tempfile::Builder::new()
            .prefix("markbot-video-")
            .tempdir()?;
        let input = workdir.path().join("input.mp4");
        let output = workdir.path().join("output.mp4");

        std::fs::write(&input, data)?;
        self.render_file(&input, &output, settings)?;
        let encoded = std::fs::read(&output)?;

        workdir.close()?;
        Ok(encoded)
    }
}

impl VideoRenderer for VideoCompositor {
    fn render_video(
        &self,
        data: &[u8],
        settings: &WatermarkSettings,
    ) -> Result<Vec<u8>, WatermarkError> {
        self.render_bytes(data, settings)
    }
}

/// Stroke thickness for a font size: scale 1.0 at the baseline size.
pub fn stroke_thickness(font_size: u32) -> u32 {
    let scale = font_size as f32 / VIDEO_SCALE_BASELINE;
    ((2.0 * scale).round() as u32).max(MIN_VIDEO_THICKNESS)
}

/// Pre-rendered text for one clip.
#[derive(Debug, Clone)]
pub struct FrameStamp {
    foreground: TextMask,
    foreground_at: PlacementPosition,
    outline: Option<(TextMask, PlacementPosition)>,
    foreground_color: FrameColor,
    outline_color: FrameColor,
    alpha: f32,
}

impl FrameStamp {
    pub fn new(font: &GlyphFont, settings: &WatermarkSettings, canvas: ImageDimensions) -> Self {
        let glyphs = render_mask(font, &settings.text, settings.font_size as f32);
        let anchor = place(&canvas, &glyphs.dimensions(), settings.position);

        let radius = (stroke_thickness(settings.font_size) - MIN_VIDEO_THICKNESS) / 2;
        let foreground = glyphs.dilate(radius);
        let foreground_at = anchor.offset(-(radius as i32), -(radius as i32));

        let outline = settings.outline.then(|| {
            let outline_radius = radius + settings.outline_width;
            (
                glyphs.dilate(outline_radius),
                anchor.offset(-(outline_radius as i32), -(outline_radius as i32)),
            )
        });

        Self {
            foreground,
            foreground_at,
            outline,
            foreground_color: to_frame_color(settings.color),
            outline_color: to_frame_color(outline_for(settings.color)),
            alpha: settings.alpha(),
        }
    }

    /// Draw the text into a copy of the frame and blend it back over the
    /// original: `blended = drawn * alpha + original * (1 - alpha)`.
    ///
    /// Only the stamp's bounding box is visited; outside it the drawn copy
    /// equals the original and blending is the identity.
    pub fn apply(&self, frame: &mut [u8], width: u32, height: u32) {
        let (x0, y0, x1, y1) = self.bounds(width as i32, height as i32);
        let fg_color = self.foreground_color.to_bytes();
        let outline_color = self.outline_color.to_bytes();

        for y in y0..y1 {
            for x in x0..x1 {
                let outline_cov = self
                    .outline
                    .as_ref()
                    .map(|(mask, at)| mask.get(x - at.x, y - at.y))
                    .unwrap_or(0);
                let fg_cov = self
                    .foreground
                    .get(x - self.foreground_at.x, y - self.foreground_at.y);
                if outline_cov == 0 && fg_cov == 0 {
                    continue;
                }

                let idx = (y as usize * width as usize + x as usize) * FRAME_CHANNELS;
                for c in 0..FRAME_CHANNELS {
                    let original = frame[idx + c];
                    let mut drawn = original;
                    if outline_cov > 0 {
                        drawn = lerp_u8(drawn, outline_color[c], outline_cov);
                    }
                    if fg_cov > 0 {
                        drawn = lerp_u8(drawn, fg_color[c], fg_cov);
                    }
                    let blended =
                        drawn as f32 * self.alpha + original as f32 * (1.0 - self.alpha);
                    frame[idx + c] = blended.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    fn bounds(&self, width: i32, height: i32) -> (i32, i32, i32, i32) {
        let (mask, at) = match &self.outline {
            Some((mask, at)) => (mask, *at),
            None => (&self.foreground, self.foreground_at),
        };
        (
            at.x.max(0),
            at.y.max(0),
            (at.x + mask.width() as i32).min(width),
            (at.y + mask.height() as i32).min(height),
        )
    }
}

fn lerp_u8(from: u8, to: u8, t: u8) -> u8 {
    let t = u32::from(t);
    ((u32::from(from) * (255 - t) + u32::from(to) * t + 127) / 255) as u8
}

#[derive(Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

/// Parse `ffprobe -print_format json -show_streams` output.
///
/// Dimensions are reported as decoded: a 90/270 degree rotation swaps
/// width and height, since the decoder applies it.
pub fn parse_probe_output(json: &[u8]) -> Result<VideoInfo, WatermarkError> {
    let parsed: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| WatermarkError::Decode(format!("ffprobe json parse failed: {e}")))?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| WatermarkError::Decode("no video stream found".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(WatermarkError::Decode(
                "video stream has no dimensions".to_string(),
            ))
        }
    };

    let (fps_num, fps_den) = [&stream.r_frame_rate, &stream.avg_frame_rate]
        .into_iter()
        .filter_map(|rate| rate.as_deref().and_then(parse_ff_ratio))
        .next()
        .ok_or_else(|| WatermarkError::Decode("video stream has no frame rate".to_string()))?;

    let rotation = stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .or_else(|| stream.tags.get("rotate").and_then(|r| r.parse::<f64>().ok()))
        .unwrap_or(0.0);
    let quarter_turns = ((rotation / 90.0).round() as i64).rem_euclid(4);
    let (width, height) = if quarter_turns % 2 == 1 {
        (height, width)
    } else {
        (width, height)
    };

    Ok(VideoInfo {
        width,
        height,
        fps_num,
        fps_den,
    })
}

/// Parse an ffmpeg rational such as `30000/1001`; zero parts are rejected.
pub fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let (num, den) = s.trim().split_once('/')?;
    let num = num.parse::<u32>().ok()?;
    let den = den.parse::<u32>().ok()?;
    (num > 0 && den > 0).then_some((num, den))
}

/// Bytes of ffmpeg stderr kept for error messages.
const STDERR_TAIL: usize = 4096;

/// A child process that is killed and reaped if dropped before `finish`.
///
/// Its stderr is drained on a helper thread for the whole run: a child
/// that fills the stderr pipe would otherwise stop writing frames.
struct FfmpegChild {
    child: Child,
    stderr: Option<JoinHandle<Vec<u8>>>,
    finished: bool,
}

impl FfmpegChild {
    fn new(mut child: Child) -> Self {
        let stderr = child
            .stderr
            .take()
            .map(|pipe| thread::spawn(move || drain_tail(pipe, STDERR_TAIL)));

        Self {
            child,
            stderr,
            finished: false,
        }
    }

    fn wait_checked(&mut self) -> Result<(), String> {
        self.finished = true;
        let status = self.child.wait();
        let stderr = self
            .stderr
            .take()
            .and_then(|drain| drain.join().ok())
            .unwrap_or_default();

        let status = status.map_err(|e| e.to_string())?;
        if status.success() {
            return Ok(());
        }
        Err(format!(
            "ffmpeg exited with {status}: {}",
            String::from_utf8_lossy(&stderr).trim()
        ))
    }
}

impl Drop for FfmpegChild {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        // The drain thread exits on its own once the pipe closes
        drop(self.stderr.take());
    }
}

/// Read `pipe` to the end, keeping only its last `keep` bytes.
fn drain_tail(mut pipe: impl Read, keep: usize) -> Vec<u8> {
    let mut tail = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > keep {
                    tail.drain(..tail.len() - keep);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    tail
}

/// Decoder side: raw `bgr24` frames on ffmpeg's stdout.
struct FrameReader {
    stdout: ChildStdout,
    process: FfmpegChild,
}

impl FrameReader {
    fn spawn(config: &VideoConfig, input: &Path) -> Result<Self, WatermarkError> {
        let mut child = Command::new(&config.ffmpeg_path)
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(input)
            .args([
                "-map", "0:v:0", "-vsync", "0", "-f", "rawvideo", "-pix_fmt", "bgr24", "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WatermarkError::Decode(format!("failed to spawn ffmpeg decoder: {e}")))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            WatermarkError::Decode("failed to open ffmpeg decoder stdout".to_string())
        })?;

        Ok(Self {
            stdout,
            process: FfmpegChild::new(child),
        })
    }

    /// Fill `frame` with the next frame. Returns `false` at end of stream.
    fn read_frame(&mut self, frame: &mut [u8]) -> Result<bool, WatermarkError> {
        let mut filled = 0;
        while filled < frame.len() {
            match self.stdout.read(&mut frame[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(WatermarkError::Decode(e.to_string())),
            }
        }

        match filled {
            0 => Ok(false),
            n if n == frame.len() => Ok(true),
            n => Err(WatermarkError::Decode(format!(
                "truncated frame: got {n} of {} bytes",
                frame.len()
            ))),
        }
    }

    fn finish(mut self) -> Result<(), WatermarkError> {
        self.process.wait_checked().map_err(WatermarkError::Decode)
    }
}

/// Encoder side: raw `bgr24` frames into ffmpeg's stdin.
struct FrameWriter {
    stdin: Option<ChildStdin>,
    process: FfmpegChild,
}

impl FrameWriter {
    fn spawn(config: &VideoConfig, output: &Path, info: &VideoInfo) -> Result<Self, WatermarkError> {
        let size = format!("{}x{}", info.width, info.height);
        let rate = info.rate_arg();
        // 4:2:0 chroma needs even dimensions
        let pix_fmt = if info.width % 2 == 0 && info.height % 2 == 0 {
            "yuv420p"
        } else {
            "yuv444p"
        };

        let mut cmd = Command::new(&config.ffmpeg_path);
        cmd.args(["-y", "-v", "error", "-f", "rawvideo", "-pix_fmt", "bgr24"])
            .args(["-s", &size, "-r", &rate, "-i", "pipe:0", "-an"])
            .args(["-c:v", &config.codec]);
        if config.codec.starts_with("libx26") {
            cmd.args(["-crf", &config.crf.to_string()]);
        }
        cmd.args(["-pix_fmt", pix_fmt, "-movflags", "+faststart"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| WatermarkError::Encode(format!("failed to spawn ffmpeg encoder: {e}")))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            WatermarkError::Encode("failed to open ffmpeg encoder stdin".to_string())
        })?;

        Ok(Self {
            stdin: Some(stdin),
            process: FfmpegChild::new(child),
        })
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), WatermarkError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| WatermarkError::Encode("encoder already finalized".to_string()))?;
        stdin
            .write_all(frame)
            .map_err(|e| WatermarkError::Encode(format!("failed to write frame to ffmpeg: {e}")))
    }

    fn finish(mut self) -> Result<(), WatermarkError> {
        drop(self.stdin.take());
        self.process.wait_checked().map_err(WatermarkError::Encode)
    }
}
