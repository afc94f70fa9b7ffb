//! Compressed image encoding.
//!
//! Serialises a [`RasterFrame`] into PNG or JPEG bytes using the `image`
//! crate's encoders. Snapshots are always PNG; cover art follows
//! [`SnapshotOptions::with_cover_art_format`](crate::SnapshotOptions::with_cover_art_format).

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Cursor;

use image::{
    DynamicImage, ExtendedColorType, ImageEncoder,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};

use crate::config::PixelFormat;
use crate::error::SnapshotError;
use crate::raster::RasterFrame;

/// Compressed image format of an [`EncodedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Lossless PNG.
    Png,
    /// Lossy JPEG.
    Jpeg,
}

impl ImageFormat {
    /// MIME type, e.g. `"image/png"`.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// Conventional file extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

/// An owned compressed image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct EncodedImage {
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub(crate) fn new(format: ImageFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    /// Format of the encoded bytes.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Length of the encoded byte stream.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if no bytes were produced.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the image and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Write the encoded bytes to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the file cannot be written.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), SnapshotError> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Encode a raster frame.
///
/// `jpeg_quality` is ignored for PNG. JPEG has no alpha channel, so RGBA
/// frames are flattened to RGB first.
///
/// # Errors
///
/// Returns [`SnapshotError::Encode`] if the encoder rejects the frame.
pub fn encode(
    frame: &RasterFrame,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<EncodedImage, SnapshotError> {
    let (width, height) = frame.dimensions();
    let color_type = match frame.format() {
        PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
        PixelFormat::Rgba8 => ExtendedColorType::Rgba8,
    };

    log::debug!(
        "Encoding {}x{} {:?} frame as {}",
        width,
        height,
        frame.format(),
        format
    );

    let mut bytes = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(frame.data(), width, height, color_type)
        }
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100));
            match frame.format() {
                PixelFormat::Rgb8 => {
                    encoder.write_image(frame.data(), width, height, ExtendedColorType::Rgb8)
                }
                PixelFormat::Rgba8 => {
                    let rgb = DynamicImage::from(frame.clone()).to_rgb8();
                    encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                }
            }
        }
    };
    result.map_err(|error| SnapshotError::Encode(error.to_string()))?;

    Ok(EncodedImage::new(format, bytes.into_inner()))
}

/// Identify PNG or JPEG data by its signature.
pub(crate) fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}
