//! Pixel format conversion and scaling.
//!
//! [`Scaler`] turns a decoded frame in its native pixel format into a packed
//! RGB-family [`RasterFrame`], resizing it in the same `swscale` pass. The
//! conversion context is cached and reused while the source format, source
//! size, destination format and destination size stay the same.

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::config::{PixelFormat, ScalingQuality};
use crate::conversion;
use crate::error::SnapshotError;
use crate::metadata::display_dimensions;
use crate::raster::RasterFrame;

/// Largest `(width, height)` with the aspect ratio of `source` that fits in
/// `bounds`.
///
/// Sources are never enlarged, and neither output dimension drops below one
/// pixel.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (source_width, source_height) = source;
    let (max_width, max_height) = bounds;
    if source_width == 0 || source_height == 0 {
        return (max_width.max(1), max_height.max(1));
    }

    let scale = (max_width as f64 / source_width as f64)
        .min(max_height as f64 / source_height as f64)
        .min(1.0);
    let width = ((source_width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let height = ((source_height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    (width, height)
}

/// Aspect-corrected size of a decoded frame.
pub(crate) fn frame_display_size(frame: &VideoFrame) -> (u32, u32) {
    let sample_aspect_ratio = frame.aspect_ratio();
    display_dimensions(
        frame.width(),
        frame.height(),
        (
            sample_aspect_ratio.numerator(),
            sample_aspect_ratio.denominator(),
        ),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScalerKey {
    source_format: Pixel,
    source_width: u32,
    source_height: u32,
    destination_format: Pixel,
    destination_width: u32,
    destination_height: u32,
    flags: ScalingFlags,
}

/// Converts and resizes decoded frames, reusing its `swscale` context.
pub struct Scaler {
    quality: ScalingQuality,
    cached: Option<(ScalerKey, ScalingContext)>,
}

impl Scaler {
    /// Create a scaler that resamples with `quality`.
    pub fn new(quality: ScalingQuality) -> Self {
        Self {
            quality,
            cached: None,
        }
    }

    /// Convert `frame` to `format` at exactly `width x height`.
    ///
    /// The caller is responsible for choosing an aspect-preserving size; see
    /// [`fit_within`].
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Decode`] if the conversion context cannot be
    /// created or the conversion fails.
    pub fn convert(
        &mut self,
        frame: &VideoFrame,
        (width, height): (u32, u32),
        format: PixelFormat,
        timestamp: Option<std::time::Duration>,
    ) -> Result<RasterFrame, SnapshotError> {
        if width == 0 || height == 0 {
            return Err(SnapshotError::InvalidSize { width, height });
        }

        let key = ScalerKey {
            source_format: frame.format(),
            source_width: frame.width(),
            source_height: frame.height(),
            destination_format: format.to_ffmpeg_pixel(),
            destination_width: width,
            destination_height: height,
            // Full chroma interpolation and accurate rounding keep output
            // identical across repeated calls.
            flags: self.quality.to_ffmpeg_flags()
                | ScalingFlags::ACCURATE_RND
                | ScalingFlags::FULL_CHR_H_INT,
        };

        let context = self.context_for(key)?;
        let mut converted = VideoFrame::empty();
        context.run(frame, &mut converted).map_err(|error| {
            SnapshotError::Decode(format!("pixel conversion failed: {error}"))
        })?;

        let buffer =
            conversion::frame_to_buffer(&converted, width, height, format.bytes_per_pixel());
        RasterFrame::new(width, height, format, buffer, timestamp)
    }

    /// Convert `frame` to its aspect-corrected display size, fitted into
    /// `bounds` when given.
    pub fn convert_to_fit(
        &mut self,
        frame: &VideoFrame,
        bounds: Option<(u32, u32)>,
        format: PixelFormat,
        timestamp: Option<std::time::Duration>,
    ) -> Result<RasterFrame, SnapshotError> {
        let display = frame_display_size(frame);
        let size = match bounds {
            Some(bounds) => fit_within(display, bounds),
            None => display,
        };
        self.convert(frame, size, format, timestamp)
    }

    fn context_for(&mut self, key: ScalerKey) -> Result<&mut ScalingContext, SnapshotError> {
        let reusable = matches!(&self.cached, Some((cached_key, _)) if *cached_key == key);
        if !reusable {
            log::debug!(
                "Creating scaling context {:?} {}x{} -> {:?} {}x{}",
                key.source_format,
                key.source_width,
                key.source_height,
                key.destination_format,
                key.destination_width,
                key.destination_height
            );
            let context = ScalingContext::get(
                key.source_format,
                key.source_width,
                key.source_height,
                key.destination_format,
                key.destination_width,
                key.destination_height,
                key.flags,
            )
            .map_err(|error| {
                SnapshotError::Decode(format!("cannot create scaling context: {error}"))
            })?;
            self.cached = Some((key, context));
        }

        match self.cached.as_mut() {
            Some((_, context)) => Ok(context),
            None => Err(SnapshotError::Decode(
                "scaling context missing after creation".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fit_within;

    #[test]
    fn full_hd_into_wide_box_keeps_aspect() {
        let (width, height) = fit_within((1920, 1080), (200, 100));
        assert!(width <= 200 && height <= 100);
        assert_eq!((width, height), (178, 100));
        let source_ratio = 1920.0 / 1080.0;
        assert!((width as f64 - height as f64 * source_ratio).abs() <= 1.0);
    }

    #[test]
    fn portrait_into_square_box() {
        assert_eq!(fit_within((1080, 1920), (256, 256)), (144, 256));
    }

    #[test]
    fn never_enlarges() {
        assert_eq!(fit_within((320, 240), (1280, 1280)), (320, 240));
    }

    #[test]
    fn tiny_results_are_at_least_one_pixel() {
        assert_eq!(fit_within((10_000, 10), (100, 100)), (100, 1));
    }

    #[test]
    fn unknown_source_uses_bounds() {
        assert_eq!(fit_within((0, 0), (64, 48)), (64, 48));
    }
}
