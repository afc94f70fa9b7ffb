//! Cover-art policy.
//!
//! Decides which picture represents a source as a poster image: an embedded
//! cover chosen according to [`CoverArtMode`], the first picture of a
//! still-image sequence, or a frame taken a little way into the video. Also
//! holds the crop rule each mode applies to the chosen picture.

use std::time::Duration;

use crate::metadata::{StreamDescriptor, StreamKind};

/// Caller preference for the shape of cover art.
///
/// Only affects [`cover_art`](crate::Snapshotter::cover_art) and
/// [`cover_art_encoded`](crate::Snapshotter::cover_art_encoded); plain
/// snapshots are never cropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoverArtMode {
    /// Use the primary cover as-is.
    #[default]
    Default,
    /// Prefer a small, square-ish picture.
    Thumbnail,
    /// Prefer a wide picture.
    Landscape,
}

impl CoverArtMode {
    /// Map a host-side integer (`0` default, `1` thumbnail, `2` landscape).
    pub fn from_raw(value: i64) -> Option<Self> {
        match value {
            0 => Some(CoverArtMode::Default),
            1 => Some(CoverArtMode::Thumbnail),
            2 => Some(CoverArtMode::Landscape),
            _ => None,
        }
    }

    /// Parse a mode name (`default`, `thumbnail`, `landscape`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Some(CoverArtMode::Default),
            "thumbnail" | "thumb" => Some(CoverArtMode::Thumbnail),
            "landscape" | "wide" => Some(CoverArtMode::Landscape),
            _ => None,
        }
    }

    /// Attachment roles in order of preference.
    fn preferred_roles(self) -> [CoverRole; 4] {
        match self {
            CoverArtMode::Default => [
                CoverRole::Cover,
                CoverRole::CoverLandscape,
                CoverRole::SmallCover,
                CoverRole::SmallCoverLandscape,
            ],
            CoverArtMode::Thumbnail => [
                CoverRole::SmallCover,
                CoverRole::Cover,
                CoverRole::SmallCoverLandscape,
                CoverRole::CoverLandscape,
            ],
            CoverArtMode::Landscape => [
                CoverRole::CoverLandscape,
                CoverRole::SmallCoverLandscape,
                CoverRole::Cover,
                CoverRole::SmallCover,
            ],
        }
    }
}

/// Matroska cover-art attachment naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoverRole {
    Cover,
    SmallCover,
    CoverLandscape,
    SmallCoverLandscape,
}

impl CoverRole {
    fn from_filename(filename: &str) -> Option<Self> {
        let stem = filename
            .rsplit_once('.')
            .map_or(filename, |(stem, _)| stem)
            .to_ascii_lowercase();
        match stem.as_str() {
            "cover" => Some(CoverRole::Cover),
            "small_cover" => Some(CoverRole::SmallCover),
            "cover_land" => Some(CoverRole::CoverLandscape),
            "small_cover_land" => Some(CoverRole::SmallCoverLandscape),
            _ => None,
        }
    }
}

fn aspect(stream: &StreamDescriptor) -> f64 {
    let (width, height) = stream.display_size();
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f64 / height as f64
    }
}

/// Choose among the embedded cover pictures of a source.
///
/// Filename roles win when present; otherwise Thumbnail picks the most
/// square picture, Landscape the widest and Default the largest. Returns
/// the container index of the chosen stream.
pub fn select_cover_art(streams: &[StreamDescriptor], mode: CoverArtMode) -> Option<usize> {
    let candidates: Vec<&StreamDescriptor> = streams
        .iter()
        .filter(|stream| {
            stream.kind == StreamKind::Video && stream.attached_picture && stream.decodable
        })
        .collect();

    if candidates.is_empty() {
        return None;
    }

    for role in mode.preferred_roles() {
        let named = candidates.iter().find(|stream| {
            stream
                .filename
                .as_deref()
                .and_then(CoverRole::from_filename)
                == Some(role)
        });
        if let Some(stream) = named {
            log::debug!(
                "Cover art for {:?}: stream {} by name {:?}",
                mode,
                stream.index,
                stream.filename
            );
            return Some(stream.index);
        }
    }

    // Earlier streams win ties.
    let mut best = candidates[0];
    for &stream in &candidates[1..] {
        let better = match mode {
            CoverArtMode::Default => stream.area() > best.area(),
            CoverArtMode::Thumbnail => aspect(stream).ln().abs() < aspect(best).ln().abs(),
            CoverArtMode::Landscape => aspect(stream) > aspect(best),
        };
        if better {
            best = stream;
        }
    }
    log::debug!("Cover art for {:?}: stream {} by shape", mode, best.index);
    Some(best.index)
}

/// Region `(x, y, width, height)` to keep from a `width x height` picture,
/// or `None` if the picture already suits the mode.
pub fn crop_for_mode(mode: CoverArtMode, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let ratio = width as f64 / height as f64;
    match mode {
        CoverArtMode::Default => None,
        CoverArtMode::Thumbnail => {
            if (0.8..=1.25).contains(&ratio) {
                return None;
            }
            let side = width.min(height);
            Some(((width - side) / 2, (height - side) / 2, side, side))
        }
        CoverArtMode::Landscape => {
            if ratio >= 4.0 / 3.0 {
                return None;
            }
            let cropped_height = ((width as f64 * 9.0 / 16.0).round() as u32).clamp(1, height);
            Some((0, (height - cropped_height) / 2, width, cropped_height))
        }
    }
}

/// Timestamp of the frame used as cover art when nothing is embedded.
///
/// Opening frames are often black, so the frame is taken at
/// `max(duration * fraction, floor)`, capped at half the duration so short
/// clips still land inside the stream. Unknown durations yield zero.
pub fn representative_timestamp(duration: Duration, fraction: f64, floor: Duration) -> Duration {
    if duration.is_zero() {
        return Duration::ZERO;
    }
    let proportional = duration.mul_f64(fraction.clamp(0.0, 1.0));
    proportional.max(floor).min(duration / 2)
}
