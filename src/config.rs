//! Snapshot configuration.
//!
//! [`SnapshotOptions`] is a builder that carries output-format, scaling,
//! encoding and cover-art policy settings into
//! [`Snapshotter::open_with_options`](crate::Snapshotter::open_with_options)
//! without widening every method signature.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use snapshotter::{FfmpegLogLevel, ImageFormat, PixelFormat, ScalingQuality, SnapshotOptions};
//!
//! let options = SnapshotOptions::new()
//!     .with_pixel_format(PixelFormat::Rgba8)
//!     .with_scaling(ScalingQuality::Best)
//!     .with_cover_art_format(ImageFormat::Png)
//!     .with_representative_floor(Duration::from_secs(5))
//!     .with_ffmpeg_log_level(FfmpegLogLevel::Quiet);
//! ```

use std::time::Duration;

use ffmpeg_next::{format::Pixel, software::scaling::Flags as ScalingFlags, util::log::Level};

use crate::encoder::ImageFormat;

/// Verbosity of FFmpeg's own stderr output.
///
/// This is separate from the crate's `log` output. Thumbnailers embedded in
/// a host process usually want [`FfmpegLogLevel::Quiet`] or
/// [`FfmpegLogLevel::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Nothing.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Errors.
    Error,
    /// Errors and warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Everything, including decoder debugging output.
    Debug,
}

impl FfmpegLogLevel {
    /// Parse a level name as accepted by `--log-level`. Case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        let level = match name.trim().to_ascii_lowercase().as_str() {
            "quiet" | "off" => FfmpegLogLevel::Quiet,
            "fatal" | "panic" => FfmpegLogLevel::Fatal,
            "error" => FfmpegLogLevel::Error,
            "warning" | "warn" => FfmpegLogLevel::Warning,
            "info" | "verbose" => FfmpegLogLevel::Info,
            "debug" | "trace" => FfmpegLogLevel::Debug,
            _ => return None,
        };
        Some(level)
    }

    pub(crate) fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

/// Set FFmpeg's process-wide log verbosity.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Output pixel format for raster frames.
///
/// Both variants are packed, 8 bits per channel, RGB-family layouts that
/// display code and the image encoder accept directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bpp). This is the default.
    #[default]
    Rgb8,
    /// 8-bit RGBA with opaque alpha (32 bpp).
    Rgba8,
}

impl PixelFormat {
    /// Map to the corresponding FFmpeg pixel format constant.
    pub(crate) fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Rgb8 => Pixel::RGB24,
            PixelFormat::Rgba8 => Pixel::RGBA,
        }
    }

    /// Number of bytes used by one pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Resampling algorithm used when a frame is resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalingQuality {
    /// Bilinear filtering.
    Fast,
    /// Bicubic filtering. This is the default.
    #[default]
    Balanced,
    /// Lanczos filtering.
    Best,
}

impl ScalingQuality {
    pub(crate) fn to_ffmpeg_flags(self) -> ScalingFlags {
        match self {
            ScalingQuality::Fast => ScalingFlags::BILINEAR,
            ScalingQuality::Balanced => ScalingFlags::BICUBIC,
            ScalingQuality::Best => ScalingFlags::LANCZOS,
        }
    }
}

/// Settings applied to every operation of a [`Snapshotter`](crate::Snapshotter).
///
/// A default-constructed value produces RGB8 rasters, bicubic scaling,
/// JPEG-encoded cover art and a representative cover frame at 10% of the
/// duration (never earlier than 3 seconds).
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub(crate) pixel_format: PixelFormat,
    pub(crate) scaling: ScalingQuality,
    pub(crate) cover_art_format: ImageFormat,
    pub(crate) jpeg_quality: u8,
    pub(crate) pass_through_embedded: bool,
    pub(crate) representative_fraction: f64,
    pub(crate) representative_floor: Duration,
    pub(crate) ffmpeg_log_level: Option<FfmpegLogLevel>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            pixel_format: PixelFormat::Rgb8,
            scaling: ScalingQuality::Balanced,
            cover_art_format: ImageFormat::Jpeg,
            jpeg_quality: 90,
            pass_through_embedded: true,
            representative_fraction: 0.10,
            representative_floor: Duration::from_secs(3),
            ffmpeg_log_level: None,
        }
    }

    /// Set the pixel format of returned raster frames.
    #[must_use]
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Set the resampling algorithm.
    #[must_use]
    pub fn with_scaling(mut self, quality: ScalingQuality) -> Self {
        self.scaling = quality;
        self
    }

    /// Set the format used when cover art has to be encoded.
    ///
    /// Snapshots are always encoded as PNG.
    #[must_use]
    pub fn with_cover_art_format(mut self, format: ImageFormat) -> Self {
        self.cover_art_format = format;
        self
    }

    /// Set the JPEG quality (1-100). Clamped into range.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Control whether embedded PNG/JPEG cover pictures are returned
    /// byte-for-byte by
    /// [`cover_art_encoded`](crate::Snapshotter::cover_art_encoded) when no
    /// crop is needed. Defaults to `true`.
    #[must_use]
    pub fn with_pass_through_embedded(mut self, enabled: bool) -> Self {
        self.pass_through_embedded = enabled;
        self
    }

    /// Set the fraction of the duration at which a representative cover
    /// frame is taken. Clamped to `0.0..=0.5`.
    #[must_use]
    pub fn with_representative_fraction(mut self, fraction: f64) -> Self {
        self.representative_fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 0.5)
        } else {
            0.0
        };
        self
    }

    /// Set the earliest time at which a representative cover frame is taken.
    #[must_use]
    pub fn with_representative_floor(mut self, floor: Duration) -> Self {
        self.representative_floor = floor;
        self
    }

    /// Apply an FFmpeg log level when the source is opened.
    #[must_use]
    pub fn with_ffmpeg_log_level(mut self, level: FfmpegLogLevel) -> Self {
        self.ffmpeg_log_level = Some(level);
        self
    }

    /// The configured raster pixel format.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }
}
