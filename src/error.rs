//! Error types for the `snapshotter` crate.
//!
//! This module defines [`SnapshotError`], the unified error type returned by
//! every fallible operation. Variants follow the phases of the pipeline
//! (open, stream selection, seek, decode, encode) so a host can tell which
//! step failed without parsing messages.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use image::ImageError;
use thiserror::Error;

/// The unified error type for all `snapshotter` operations.
///
/// Construction-time failures ([`SnapshotError::Open`]) abort creation of the
/// [`Snapshotter`](crate::Snapshotter). Every other variant is local to the
/// call that produced it and leaves the instance usable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// The source could not be opened, demuxed, or has no usable streams.
    #[error("Failed to open media source at {path}: {reason}")]
    Open {
        /// Locator passed to [`Snapshotter::open`](crate::Snapshotter::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The source has no video-like stream to take a picture from.
    #[error("No visual stream found in source")]
    NoVisualStream,

    /// The requested timestamp cannot be reached.
    #[error("Cannot seek to {requested:?} (source duration is {duration:?})")]
    Seek {
        /// Timestamp that was requested.
        requested: Duration,
        /// Container duration, [`Duration::ZERO`] when unknown.
        duration: Duration,
    },

    /// No frame could be decoded, or the decoder could not be opened.
    #[error("Failed to decode frame: {0}")]
    Decode(String),

    /// A raster frame could not be serialised to a compressed image.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// A snapshot was requested with a zero-sized bounding box.
    #[error("Invalid output size {width}x{height}")]
    InvalidSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The snapshotter was already closed.
    #[error("Snapshotter session is closed")]
    SessionClosed,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An embedded cover image could not be read by the `image` crate.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}

impl SnapshotError {
    /// Returns `true` if the error means "no preview can be produced for
    /// this source" rather than a transient per-call failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SnapshotError::Open { .. } | SnapshotError::NoVisualStream
        )
    }
}
