// Video compositor tests against real ffmpeg/ffprobe binaries
//
// Tests that need the binaries return early when they are not on PATH.
// Clips are encoded with mpeg4, which every ffmpeg build ships.

use markbot::config::VideoConfig;
use markbot::error::WatermarkError;
use markbot::watermark::{FontChain, VideoCompositor, VideoRenderer, WatermarkSettings};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    })
}

fn test_config() -> VideoConfig {
    VideoConfig {
        codec: "mpeg4".to_string(),
        ..VideoConfig::default()
    }
}

fn compositor() -> VideoCompositor {
    VideoCompositor::new(&FontChain::system_default(), test_config())
}

/// Write a `frames`-long test pattern clip at 10 fps.
fn make_clip(path: &Path, width: u32, height: u32, frames: u32) {
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={width}x{height}:rate=10"))
        .args(["-frames:v", &frames.to_string()])
        .args(["-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
        .arg(path)
        .status()
        .expect("failed to run ffmpeg");
    assert!(status.success(), "ffmpeg could not create the test clip");
}

/// Count decoded frames of the first video stream.
fn count_frames(path: &Path) -> u64 {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=nb_read_frames",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .expect("failed to run ffprobe");
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .expect("ffprobe did not report a frame count")
}

/// Test: every frame is re-encoded at the source dimensions and frame rate
#[test]
fn test_render_file_preserves_frames_rate_and_size() {
    if !tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not found");
        return;
    }

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mp4");
    let output = dir.path().join("out.mp4");
    make_clip(&input, 320, 240, 12);

    let compositor = compositor();
    let report = compositor
        .render_file(&input, &output, &WatermarkSettings::default())
        .unwrap();

    assert_eq!(report.frames, 12);
    assert_eq!((report.info.width, report.info.height), (320, 240));

    let probed = compositor.probe(&output).unwrap();
    assert_eq!((probed.width, probed.height), (320, 240));
    assert!((probed.fps() - 10.0).abs() < 1e-6, "fps was {}", probed.fps());
    assert_eq!(count_frames(&output), 12);
}

#[test]
fn test_render_bytes_round_trip() {
    if !tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not found");
        return;
    }

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mp4");
    make_clip(&input, 160, 120, 5);
    let data = std::fs::read(&input).unwrap();

    let mut settings = WatermarkSettings::default();
    settings.set_font_size(80).unwrap();
    settings.set_outline_width(5).unwrap();

    let encoded = compositor().render_video(&data, &settings).unwrap();
    assert!(!encoded.is_empty());

    let output = dir.path().join("out.mp4");
    std::fs::write(&output, &encoded).unwrap();
    assert_eq!(count_frames(&output), 5);
}

#[test]
fn test_watermark_changes_frames() {
    if !tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not found");
        return;
    }

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mp4");
    let plain = dir.path().join("plain.mp4");
    let marked = dir.path().join("marked.mp4");
    make_clip(&input, 160, 120, 3);

    let compositor = compositor();
    let mut invisible = WatermarkSettings::default();
    invisible.outline = false;
    invisible.set_opacity_percent(0).unwrap();
    compositor.render_file(&input, &plain, &invisible).unwrap();
    compositor
        .render_file(&input, &marked, &WatermarkSettings::default())
        .unwrap();

    assert_ne!(
        std::fs::read(&plain).unwrap(),
        std::fs::read(&marked).unwrap()
    );
}

/// Test: undecodable input fails and leaves no output behind
#[test]
fn test_garbage_input_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("garbage.mp4");
    let output = dir.path().join("out.mp4");
    std::fs::write(&input, b"this is not a video").unwrap();

    let result = compositor().render_file(&input, &output, &WatermarkSettings::default());

    assert!(matches!(result, Err(WatermarkError::Decode(_))));
    assert!(!output.exists());
}

#[test]
fn test_missing_binaries_report_decode_error() {
    let config = VideoConfig {
        ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
        ffprobe_path: "/nonexistent/ffprobe".to_string(),
        ..test_config()
    };
    let compositor = VideoCompositor::new(&FontChain::builtin_only(), config);

    let result = compositor.render_video(b"whatever", &WatermarkSettings::default());
    let err = result.unwrap_err();
    assert!(matches!(err, WatermarkError::Decode(_)));
    assert_eq!(
        err.user_message(),
        markbot::error::PROCESSING_FAILED_MESSAGE
    );
}
