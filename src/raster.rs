//! Owned raster frames.
//!
//! A [`RasterFrame`] is the display-ready result of decode + convert: a
//! tightly packed pixel buffer, its dimensions and format tag, and the
//! presentation timestamp of the source frame it was produced from. The
//! caller owns it outright.

use std::time::Duration;

use image::{DynamicImage, RgbImage, RgbaImage};

use crate::config::PixelFormat;
use crate::error::SnapshotError;

/// A decoded, converted and scaled picture.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RasterFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
    timestamp: Option<Duration>,
}

impl RasterFrame {
    /// Wrap a packed pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Decode`] if `data` does not hold exactly
    /// `width * height` pixels of `format`.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        timestamp: Option<Duration>,
    ) -> Result<Self, SnapshotError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(SnapshotError::Decode(format!(
                "raster buffer holds {} bytes, expected {expected} for {width}x{height} {format:?}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
            timestamp,
        })
    }

    /// Convert a picture decoded by the `image` crate into `format`.
    pub fn from_image(image: DynamicImage, format: PixelFormat) -> RasterFrame {
        let (width, height) = (image.width(), image.height());
        let data = match format {
            PixelFormat::Rgb8 => image.into_rgb8().into_raw(),
            PixelFormat::Rgba8 => image.into_rgba8().into_raw(),
        };
        RasterFrame {
            width,
            height,
            format,
            data,
            timestamp: None,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel format of [`data`](RasterFrame::data).
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Presentation timestamp of the source frame relative to the start of
    /// its stream, if the container provided one.
    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    /// Packed pixel data, row-major, no padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame and return its pixel buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Copy out the `width x height` region starting at `(x, y)`.
    ///
    /// The region is clamped to the frame bounds.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> RasterFrame {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);

        let bytes_per_pixel = self.format.bytes_per_pixel();
        let source_stride = self.width as usize * bytes_per_pixel;
        let row_length = width as usize * bytes_per_pixel;
        let mut data = Vec::with_capacity(row_length * height as usize);
        for row in y as usize..(y + height) as usize {
            let start = row * source_stride + x as usize * bytes_per_pixel;
            data.extend_from_slice(&self.data[start..start + row_length]);
        }

        RasterFrame {
            width,
            height,
            format: self.format,
            data,
            timestamp: self.timestamp,
        }
    }

    /// Convert into an [`image::DynamicImage`] without copying pixels.
    pub fn into_image(self) -> DynamicImage {
        let (width, height) = (self.width, self.height);
        // Buffer length is checked on construction.
        match self.format {
            PixelFormat::Rgb8 => RgbImage::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgb8)
                .unwrap_or_else(|| DynamicImage::new_rgb8(width, height)),
            PixelFormat::Rgba8 => RgbaImage::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgba8)
                .unwrap_or_else(|| DynamicImage::new_rgba8(width, height)),
        }
    }
}

impl From<RasterFrame> for DynamicImage {
    fn from(frame: RasterFrame) -> Self {
        frame.into_image()
    }
}
