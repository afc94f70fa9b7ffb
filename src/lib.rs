//! # snapshotter
//!
//! Extract a representative still image from a video or audio container:
//! a snapshot at an arbitrary timestamp, or the embedded (or derived) cover
//! art, for use as a thumbnail or preview.
//!
//! `snapshotter` opens a source with FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, selects the
//! best visual stream once, decodes single frames on request and returns
//! them either as owned [`RasterFrame`]s or as PNG/JPEG bytes.
//!
//! ## Quick Start
//!
//! ### Take a Snapshot
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use snapshotter::Snapshotter;
//!
//! let mut snapshotter = Snapshotter::open("input.mp4").unwrap();
//! let png = snapshotter
//!     .snapshot_png((320, 180), Duration::from_secs(5))
//!     .unwrap();
//! png.save("preview.png").unwrap();
//! ```
//!
//! ### Extract Cover Art
//!
//! ```no_run
//! use snapshotter::{CoverArtMode, Snapshotter};
//!
//! let mut snapshotter = Snapshotter::open("album.mp3").unwrap();
//! let cover = snapshotter.cover_art_encoded(CoverArtMode::Thumbnail).unwrap();
//! cover.save(format!("cover.{}", cover.format().extension())).unwrap();
//! ```
//!
//! ## Features
//!
//! - **Stream selection**: largest decodable motion video first, then
//!   still-image sequences (e.g. thumbnail tracks of protected content),
//!   then attached pictures
//! - **Efficient seeking**: seeks to the nearest keyframe, then decodes
//!   forward, with a single midpoint retry for sources with bad timestamps
//! - **Cached decoder**: one decoder per source, allocated on first use and
//!   reused until the source is closed
//! - **Aspect-correct scaling**: anamorphic sources are shown at display
//!   size, snapshots are fitted inside the requested box
//! - **Cover-art modes**: default, thumbnail (square) and landscape (wide),
//!   honouring Matroska `cover` / `small_cover` / `cover_land` attachments
//! - **Stream probing**: lightweight `MediaProbe` for quick inspection
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | `snapshot_many()` processes many sources across rayon threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
mod conversion;
pub mod cover_art;
pub mod encoder;
pub mod error;
pub mod metadata;
pub mod probe;
pub mod raster;
#[cfg(feature = "rayon")]
mod rayon;
pub mod scaler;
pub mod selection;
pub mod session;
pub mod snapshotter;

pub use config::{
    FfmpegLogLevel, PixelFormat, ScalingQuality, SnapshotOptions, set_ffmpeg_log_level,
};
pub use cover_art::{CoverArtMode, crop_for_mode, representative_timestamp, select_cover_art};
pub use encoder::{EncodedImage, ImageFormat, encode};
pub use error::SnapshotError;
pub use metadata::{MediaMetadata, StreamDescriptor, StreamKind};
pub use probe::MediaProbe;
pub use raster::RasterFrame;
#[cfg(feature = "rayon")]
pub use rayon::snapshot_many;
pub use scaler::{Scaler, fit_within};
pub use selection::{VisualStream, select_visual_stream};
pub use session::{DecodeSession, SessionState};
pub use snapshotter::Snapshotter;
