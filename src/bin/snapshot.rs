use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use serde_json::json;
use snapshotter::{
    CoverArtMode, FfmpegLogLevel, ImageFormat, PixelFormat, ScalingQuality, SnapshotOptions,
    Snapshotter, StreamKind, VisualStream,
};

const CLI_AFTER_HELP: &str = "Examples:\n  snapshot info movie.mkv --json\n  snapshot snapshot movie.mkv --at 0:01:30 --size 320x180 --out preview.png\n  snapshot cover-art album.mp3 --mode thumbnail --out cover.jpg\n  snapshot completions zsh > _snapshot";

#[derive(Debug, Parser)]
#[command(
    name = "snapshot",
    version,
    about = "Extract snapshots and cover art from media files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show library log output on stderr.
    #[arg(long, global = true)]
    verbose: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output raster pixel format (rgb8, rgba8).
    #[arg(long, global = true)]
    pixel_format: Option<String>,

    /// Resampling quality (fast, balanced, best).
    #[arg(long, global = true)]
    scaling: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print metadata and the selected visual stream.
    #[command(
        about = "Print media metadata",
        visible_alias = "probe",
        after_help = "Examples:\n  snapshot info input.mp4\n  snapshot info input.mp4 --json"
    )]
    Info {
        /// Input media path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write a PNG snapshot taken at a timestamp.
    #[command(
        about = "Take a snapshot",
        after_help = "Examples:\n  snapshot snapshot input.mp4 --at 12.5 --size 640x360 --out frame.png"
    )]
    Snapshot {
        /// Input media path.
        input: PathBuf,
        /// Timestamp as seconds, MM:SS or HH:MM:SS(.fff).
        #[arg(long, default_value = "0")]
        at: String,
        /// Bounding box as WIDTHxHEIGHT.
        #[arg(long, default_value = "640x360")]
        size: String,
        /// Output PNG path.
        #[arg(long)]
        out: PathBuf,
    },

    /// Write the cover art of a source.
    #[command(
        about = "Extract cover art",
        after_help = "Examples:\n  snapshot cover-art movie.mkv --mode landscape --out poster.jpg\n  snapshot cover-art album.m4a --format png --out cover.png"
    )]
    CoverArt {
        /// Input media path.
        input: PathBuf,
        /// Cover-art mode (default, thumbnail, landscape).
        #[arg(long, default_value = "default")]
        mode: String,
        /// Encoding used when the cover must be re-encoded (jpeg, png).
        #[arg(long, default_value = "jpeg")]
        format: String,
        /// Always re-encode instead of passing embedded pictures through.
        #[arg(long)]
        reencode: bool,
        /// Output image path.
        #[arg(long)]
        out: PathBuf,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return Ok(Duration::from_secs_f64(seconds.max(0.0)));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    Ok(Duration::from_secs_f64(total_seconds.max(0.0)))
}

fn parse_size(value: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or(format!("invalid size (expected WIDTHxHEIGHT): {value}"))?;
    let width: u32 = width.trim().parse()?;
    let height: u32 = height.trim().parse()?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero: {value}").into());
    }
    Ok((width, height))
}

fn parse_pixel_format(value: &str) -> Option<PixelFormat> {
    match value.to_ascii_lowercase().as_str() {
        "rgb8" | "rgb" => Some(PixelFormat::Rgb8),
        "rgba8" | "rgba" => Some(PixelFormat::Rgba8),
        _ => None,
    }
}

fn parse_scaling(value: &str) -> Option<ScalingQuality> {
    match value.to_ascii_lowercase().as_str() {
        "fast" | "bilinear" => Some(ScalingQuality::Fast),
        "balanced" | "bicubic" => Some(ScalingQuality::Balanced),
        "best" | "lanczos" => Some(ScalingQuality::Best),
        _ => None,
    }
}

fn parse_image_format(value: &str) -> Option<ImageFormat> {
    match value.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        _ => None,
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn base_options(global: &GlobalOptions) -> Result<SnapshotOptions, Box<dyn std::error::Error>> {
    let mut options = SnapshotOptions::new();

    if let Some(level) = &global.log_level {
        let parsed =
            FfmpegLogLevel::parse(level).ok_or(format!("unsupported --log-level: {level}"))?;
        options = options.with_ffmpeg_log_level(parsed);
    }

    if let Some(pixel_str) = &global.pixel_format {
        let pixel = parse_pixel_format(pixel_str)
            .ok_or(format!("unsupported --pixel-format: {pixel_str}"))?;
        options = options.with_pixel_format(pixel);
    }

    if let Some(scaling) = &global.scaling {
        let quality =
            parse_scaling(scaling).ok_or(format!("unsupported --scaling: {scaling}"))?;
        options = options.with_scaling(quality);
    }

    Ok(options)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "snapshotter=debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init();
}

fn visual_label(visual: VisualStream) -> String {
    match visual {
        VisualStream::MotionVideo(index) => format!("motion video (stream {index})"),
        VisualStream::StillSequence(index) => format!("still pictures (stream {index})"),
        VisualStream::None => "none".to_string(),
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    let options = base_options(&cli.global)?;

    match cli.command {
        Commands::Info { input, json } => {
            let snapshotter = Snapshotter::open_with_options(&input, &options)?;
            let metadata = snapshotter.metadata();
            if json {
                let streams: Vec<_> = metadata
                    .streams
                    .iter()
                    .map(|stream| {
                        json!({
                            "index": stream.index,
                            "kind": format!("{:?}", stream.kind).to_lowercase(),
                            "codec": stream.codec,
                            "decodable": stream.decodable,
                            "attached_picture": stream.attached_picture,
                            "still_image_sequence": stream.still_image_sequence,
                            "width": stream.width,
                            "height": stream.height,
                            "channels": stream.channels,
                            "filename": stream.filename,
                        })
                    })
                    .collect();
                let payload = json!({
                    "title": metadata.title,
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "display_size": [metadata.display_size.0, metadata.display_size.1],
                    "channels": metadata.channels,
                    "visual_stream": metadata.visual.stream_index(),
                    "thumbnail_stream": snapshotter.is_thumbnail_stream(),
                    "streams": streams,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Title: {}", metadata.title);
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Display size: {}x{}",
                    metadata.display_size.0, metadata.display_size.1
                );
                println!("Channels: {}", metadata.channels);
                println!("Visual: {}", visual_label(metadata.visual));
                for stream in &metadata.streams {
                    let mut line = format!(
                        "  #{} {:?} [{}]",
                        stream.index, stream.kind, stream.codec
                    );
                    if stream.kind == StreamKind::Video {
                        line.push_str(&format!(" {}x{}", stream.width, stream.height));
                    }
                    if stream.kind == StreamKind::Audio {
                        line.push_str(&format!(" {} ch", stream.channels));
                    }
                    if stream.attached_picture {
                        line.push_str(" attached-picture");
                    }
                    if let Some(filename) = &stream.filename {
                        line.push_str(&format!(" ({filename})"));
                    }
                    if !stream.decodable {
                        line = line.dimmed().to_string();
                    }
                    println!("{line}");
                }
            }
        }
        Commands::Snapshot {
            input,
            at,
            size,
            out,
        } => {
            let at = parse_timecode(&at)?;
            let size = parse_size(&size)?;
            ensure_writable_path(&out, cli.global.overwrite)?;

            let mut snapshotter = Snapshotter::open_with_options(&input, &options)?;
            let image = snapshotter.snapshot_png(size, at)?;
            image.save(&out)?;
            println!(
                "{} {} ({} bytes)",
                "saved".green().bold(),
                out.display(),
                image.len()
            );
        }
        Commands::CoverArt {
            input,
            mode,
            format,
            reencode,
            out,
        } => {
            let mode = CoverArtMode::parse(&mode).ok_or(format!("unsupported --mode: {mode}"))?;
            let format =
                parse_image_format(&format).ok_or(format!("unsupported --format: {format}"))?;
            ensure_writable_path(&out, cli.global.overwrite)?;

            let options = options
                .with_cover_art_format(format)
                .with_pass_through_embedded(!reencode);
            let mut snapshotter = Snapshotter::open_with_options(&input, &options)?;
            let image = snapshotter.cover_art_encoded(mode)?;
            image.save(&out)?;
            println!(
                "{} {} ({}, {} bytes)",
                "saved".green().bold(),
                out.display(),
                image.mime_type(),
                image.len()
            );
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "snapshot", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_image_format, parse_scaling, parse_size, parse_timecode};

    #[test]
    fn parse_size_formats() {
        assert_eq!(parse_size("320x180").unwrap(), (320, 180));
        assert_eq!(parse_size(" 64X48 ").unwrap(), (64, 48));
        assert!(parse_size("0x100").is_err());
        assert!(parse_size("320").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn parse_format_and_scaling_aliases() {
        assert!(parse_image_format("JPG").is_some());
        assert!(parse_image_format("png").is_some());
        assert!(parse_image_format("webp").is_none());
        assert!(parse_scaling("lanczos").is_some());
        assert!(parse_scaling("nearest").is_none());
    }

    #[test]
    fn parse_timecode_formats() {
        let seconds = parse_timecode("75").unwrap();
        assert_eq!(seconds.as_secs(), 75);

        let mm_ss = parse_timecode("01:15").unwrap();
        assert_eq!(mm_ss.as_secs(), 75);

        let hh_mm_ss = parse_timecode("00:01:15.5").unwrap();
        assert_eq!(hh_mm_ss.as_secs(), 75);
    }
}
