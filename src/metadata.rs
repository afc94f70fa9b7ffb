//! Media metadata types.
//!
//! [`MediaMetadata`] is extracted once when a source is opened and cached for
//! the lifetime of the [`Snapshotter`](crate::Snapshotter). Each elementary
//! stream is summarised by a read-only [`StreamDescriptor`], which is what the
//! stream selector ranks.

use std::time::Duration;

use ffmpeg_next::{codec::Id, format::stream::Stream, media::Type};
use ffmpeg_sys_next::{AV_DISPOSITION_ATTACHED_PIC, AV_DISPOSITION_TIMED_THUMBNAILS};

use crate::conversion;
use crate::selection::VisualStream;

/// Broad media kind of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Video, including attached pictures and thumbnail tracks.
    Video,
    /// Audio.
    Audio,
    /// Subtitles, data, attachments and anything else.
    Other,
}

/// Read-only summary of one elementary stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Index of the stream in the container.
    pub index: usize,
    /// Media kind.
    pub kind: StreamKind,
    /// Codec name (e.g. `"h264"`, `"mjpeg"`).
    pub codec: String,
    /// A decoder for the codec is available and the stream is not encrypted.
    pub decodable: bool,
    /// The container marks this stream as an attached picture (cover art).
    pub attached_picture: bool,
    /// The stream is a sequence of independent still pictures rather than
    /// motion video.
    pub still_image_sequence: bool,
    /// Coded width in pixels (0 if unknown).
    pub width: u32,
    /// Coded height in pixels (0 if unknown).
    pub height: u32,
    /// Sample (pixel) aspect ratio as `(numerator, denominator)`,
    /// `(0, 1)` if unset.
    pub sample_aspect_ratio: (i32, i32),
    /// Bit rate in bits per second (0 if unknown).
    pub bit_rate: u64,
    /// Number of frames reported by the container (0 if unknown).
    pub frame_count: u64,
    /// Average frame rate (0.0 if unknown).
    pub frames_per_second: f64,
    /// Audio channel count (0 for non-audio streams).
    pub channels: u16,
    /// Attachment filename tag, used by Matroska cover-art conventions.
    pub filename: Option<String>,
    /// Stream title tag.
    pub title: Option<String>,
}

impl StreamDescriptor {
    /// Pixel area, used for ranking.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Aspect-corrected `(width, height)`.
    ///
    /// The width is stretched by the sample aspect ratio when one is set.
    pub fn display_size(&self) -> (u32, u32) {
        display_dimensions(self.width, self.height, self.sample_aspect_ratio)
    }

    /// Returns `true` for a video stream that is neither an attached picture
    /// nor a still-image sequence.
    pub fn is_motion_video(&self) -> bool {
        self.kind == StreamKind::Video && !self.attached_picture && !self.still_image_sequence
    }
}

/// Apply a sample aspect ratio to coded dimensions.
pub(crate) fn display_dimensions(
    width: u32,
    height: u32,
    sample_aspect_ratio: (i32, i32),
) -> (u32, u32) {
    let (numerator, denominator) = sample_aspect_ratio;
    if width == 0 || height == 0 || numerator <= 0 || denominator <= 0 {
        return (width, height);
    }
    if numerator == denominator {
        return (width, height);
    }
    let corrected = (width as f64 * numerator as f64 / denominator as f64).round() as u32;
    (corrected.max(1), height)
}

/// Metadata for an opened source.
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// Container duration, [`Duration::ZERO`] when unknown.
    pub duration: Duration,
    /// Aspect-corrected size of the selected visual stream, `(0, 0)` when
    /// there is none.
    pub display_size: (u32, u32),
    /// Channel count of the best audio stream, 0 when there is none.
    pub channels: u16,
    /// Display title: the container `title` tag or the file stem.
    pub title: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
    /// The visual stream chosen at open time.
    pub visual: VisualStream,
    /// Every stream in the container, in container order.
    pub streams: Vec<StreamDescriptor>,
}

impl MediaMetadata {
    /// Descriptor of the selected visual stream.
    pub fn visual_stream(&self) -> Option<&StreamDescriptor> {
        let index = self.visual.stream_index()?;
        self.streams.iter().find(|stream| stream.index == index)
    }

    /// Returns `true` if at least one audio stream exists.
    pub fn has_audio(&self) -> bool {
        self.streams
            .iter()
            .any(|stream| stream.kind == StreamKind::Audio)
    }
}

/// Codecs that only ever carry independently coded still pictures.
pub(crate) fn is_still_image_codec(id: Id) -> bool {
    matches!(
        id,
        Id::MJPEG | Id::PNG | Id::BMP | Id::GIF | Id::TIFF | Id::WEBP | Id::JPEG2000
    )
}

/// Below this rate an image-codec stream is a slideshow, not motion video.
const STILL_SEQUENCE_MAX_FPS: f64 = 1.0;

/// FairPlay-protected sample descriptions.
const ENCRYPTED_VIDEO_TAG: u32 = u32::from_le_bytes(*b"drmi");

/// Summarise a stream for ranking.
pub(crate) fn describe_stream(stream: &Stream) -> StreamDescriptor {
    let parameters = stream.parameters();
    let codec_id = parameters.id();
    let kind = match parameters.medium() {
        Type::Video => StreamKind::Video,
        Type::Audio => StreamKind::Audio,
        _ => StreamKind::Other,
    };

    // Read straight from the codec parameters: a decoder cannot be opened
    // for protected or unsupported streams, but their geometry is still known.
    // SAFETY: `parameters` and `stream` borrow the open format context, so
    // both pointers are valid and only read here.
    let raw = unsafe { &*parameters.as_ptr() };
    let disposition = unsafe { (*stream.as_ptr()).disposition } as i64;

    let attached_picture = disposition & AV_DISPOSITION_ATTACHED_PIC as i64 != 0;
    let timed_thumbnails = disposition & AV_DISPOSITION_TIMED_THUMBNAILS as i64 != 0;
    let encrypted = raw.codec_tag == ENCRYPTED_VIDEO_TAG;
    let decodable = kind != StreamKind::Other
        && codec_id != Id::None
        && !encrypted
        && ffmpeg_next::decoder::find(codec_id).is_some();

    let frames_per_second = conversion::rate_to_fps(stream.avg_frame_rate());
    let frame_count = stream.frames().max(0) as u64;
    let still_image_sequence = kind == StreamKind::Video
        && (timed_thumbnails
            || (is_still_image_codec(codec_id)
                && !attached_picture
                && frame_count != 1
                && frames_per_second < STILL_SEQUENCE_MAX_FPS));

    let channels = if kind == StreamKind::Audio {
        raw.ch_layout.nb_channels.max(0) as u16
    } else {
        0
    };

    let tag = |key: &str| {
        stream
            .metadata()
            .get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    StreamDescriptor {
        index: stream.index(),
        kind,
        codec: codec_id.name().to_string(),
        decodable,
        attached_picture,
        still_image_sequence,
        width: raw.width.max(0) as u32,
        height: raw.height.max(0) as u32,
        sample_aspect_ratio: (raw.sample_aspect_ratio.num, raw.sample_aspect_ratio.den),
        bit_rate: raw.bit_rate.max(0) as u64,
        frame_count,
        frames_per_second,
        channels,
        filename: tag("filename"),
        title: tag("title"),
    }
}
