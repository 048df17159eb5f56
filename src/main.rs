use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use markbot::bot::check_video_size;
use markbot::config::Config;
use markbot::watermark::{
    ColorName, PhotoCompositor, VideoCompositor, WatermarkPosition, WatermarkSettings,
};
use std::path::{Path, PathBuf};

/// Markbot - add text watermarks to photos and videos
#[derive(Parser, Debug)]
#[command(name = "markbot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark a still image; output is JPEG
    Photo {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Watermark every frame of a video clip; output is MP4 without audio
    Video {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Validate the configuration and exit
    CheckConfig,
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Watermark text, 1 to 50 characters
    #[arg(long)]
    text: Option<String>,

    /// One of 32, 48, 64, 80
    #[arg(long)]
    font_size: Option<u32>,

    /// Opacity percent: 0, 25, 50, 75 or 100
    #[arg(long)]
    opacity: Option<u8>,

    /// top_left, top_right, center, bottom_left or bottom_right
    #[arg(long)]
    position: Option<String>,

    /// white, black, red, green, blue or yellow
    #[arg(long)]
    color: Option<String>,

    /// Draw the text without a contrasting outline
    #[arg(long)]
    no_outline: bool,

    /// Outline width in pixels, 1 to 5
    #[arg(long)]
    outline_width: Option<u32>,
}

impl StyleArgs {
    fn to_settings(&self) -> anyhow::Result<WatermarkSettings> {
        let mut settings = WatermarkSettings::default();

        if let Some(text) = &self.text {
            settings.set_text(text)?;
        }
        if let Some(size) = self.font_size {
            settings.set_font_size(size)?;
        }
        if let Some(percent) = self.opacity {
            settings.set_opacity_percent(percent)?;
        }
        if let Some(name) = &self.position {
            settings.position = WatermarkPosition::parse(name)
                .ok_or_else(|| anyhow!("unknown position '{}'", name))?;
        }
        if let Some(name) = &self.color {
            settings.color =
                ColorName::parse(name).ok_or_else(|| anyhow!("unknown color '{}'", name))?;
        }
        if let Some(width) = self.outline_width {
            settings.set_outline_width(width)?;
        }
        settings.outline = !self.no_outline;

        Ok(settings)
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    markbot::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command {
        Command::Photo {
            input,
            output,
            style,
        } => {
            let settings = style.to_settings()?;
            let data = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let compositor = PhotoCompositor::new(&config.fonts.chain(), config.photo.jpeg_quality);
            let encoded = compositor.render_bytes(&data, &settings)?;
            std::fs::write(&output, encoded)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            tracing::info!(
                input = %input.display(),
                output = %output.display(),
                "Photo watermarked"
            );
        }
        Command::Video {
            input,
            output,
            style,
        } => {
            let settings = style.to_settings()?;
            let size = std::fs::metadata(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?
                .len();
            check_video_size(size, config.limits.max_video_bytes)?;

            let compositor = VideoCompositor::new(&config.fonts.chain(), config.video.clone());
            let report = compositor.render_file(&input, &output, &settings)?;

            println!(
                "{} frames at {}x{} written to {}",
                report.frames,
                report.info.width,
                report.info.height,
                output.display()
            );
        }
        Command::CheckConfig => {
            tracing::info!(
                config_file = ?cli.config,
                max_video_bytes = config.limits.max_video_bytes,
                session_ttl_seconds = config.sessions.idle_ttl_seconds,
                ffmpeg = %config.video.ffmpeg_path,
                "Configuration is valid"
            );
            println!("Configuration OK");
        }
    }

    Ok(())
}
