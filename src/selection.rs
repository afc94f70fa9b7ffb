//! Visual stream selection.
//!
//! Picks the single stream used as the picture source for a container.
//! Genuine motion video always wins; when none can be decoded, a
//! still-image sequence (for example the pre-rendered thumbnail track of
//! protected content) or an attached cover picture is used instead. The
//! result is a tagged [`VisualStream`] that the decode session branches on.

use std::cmp::Reverse;

use crate::metadata::{StreamDescriptor, StreamKind};

/// The stream chosen as picture source, tagged with its decode policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisualStream {
    /// Temporally coherent video: seek by timestamp, decode forward.
    MotionVideo(usize),
    /// Independent still pictures: pick the picture nearest the requested
    /// position, no keyframe semantics.
    StillSequence(usize),
    /// The source has no video-like stream.
    #[default]
    None,
}

impl VisualStream {
    /// Container index of the selected stream.
    pub fn stream_index(self) -> Option<usize> {
        match self {
            VisualStream::MotionVideo(index) | VisualStream::StillSequence(index) => Some(index),
            VisualStream::None => None,
        }
    }

    /// Returns `true` for [`VisualStream::StillSequence`].
    pub fn is_still_sequence(self) -> bool {
        matches!(self, VisualStream::StillSequence(_))
    }
}

/// Select the best visual stream.
///
/// Motion video streams are ranked by pixel area, then bit rate, then
/// container order. If none is decodable, decodable still-image sequences
/// are preferred over single attached pictures, larger first.
pub fn select_visual_stream(streams: &[StreamDescriptor]) -> VisualStream {
    let motion = streams
        .iter()
        .filter(|stream| stream.is_motion_video() && stream.decodable)
        .max_by_key(|stream| (stream.area(), stream.bit_rate, Reverse(stream.index)));

    if let Some(stream) = motion {
        log::debug!(
            "Selected motion video stream {} ({}, {}x{})",
            stream.index,
            stream.codec,
            stream.width,
            stream.height
        );
        return VisualStream::MotionVideo(stream.index);
    }

    let still = streams
        .iter()
        .filter(|stream| {
            stream.kind == StreamKind::Video
                && stream.decodable
                && (stream.still_image_sequence || stream.attached_picture)
        })
        .max_by_key(|stream| {
            (
                stream.still_image_sequence,
                stream.area(),
                Reverse(stream.index),
            )
        });

    match still {
        Some(stream) => {
            log::debug!(
                "No decodable motion video; using still stream {} ({}, sequence={})",
                stream.index,
                stream.codec,
                stream.still_image_sequence
            );
            VisualStream::StillSequence(stream.index)
        }
        None => {
            log::debug!("No visual stream in {} streams", streams.len());
            VisualStream::None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn video(index: usize, width: u32, height: u32) -> StreamDescriptor {
        StreamDescriptor {
            index,
            kind: StreamKind::Video,
            codec: "h264".to_string(),
            decodable: true,
            attached_picture: false,
            still_image_sequence: false,
            width,
            height,
            sample_aspect_ratio: (1, 1),
            bit_rate: 0,
            frame_count: 150,
            frames_per_second: 30.0,
            channels: 0,
            filename: None,
            title: None,
        }
    }

    pub(crate) fn audio(index: usize, channels: u16) -> StreamDescriptor {
        StreamDescriptor {
            kind: StreamKind::Audio,
            codec: "aac".to_string(),
            width: 0,
            height: 0,
            channels,
            ..video(index, 0, 0)
        }
    }

    pub(crate) fn picture(index: usize, width: u32, height: u32) -> StreamDescriptor {
        StreamDescriptor {
            codec: "mjpeg".to_string(),
            attached_picture: true,
            frame_count: 1,
            frames_per_second: 0.0,
            ..video(index, width, height)
        }
    }

    fn thumbnails(index: usize) -> StreamDescriptor {
        StreamDescriptor {
            codec: "mjpeg".to_string(),
            still_image_sequence: true,
            frame_count: 12,
            frames_per_second: 0.1,
            ..video(index, 320, 180)
        }
    }

    #[test]
    fn prefers_largest_motion_video() {
        let streams = vec![video(0, 640, 360), audio(1, 2), video(2, 1920, 1080)];
        assert_eq!(
            select_visual_stream(&streams),
            VisualStream::MotionVideo(2)
        );
    }

    #[test]
    fn breaks_ties_by_bit_rate_then_index() {
        let mut low = video(0, 1280, 720);
        low.bit_rate = 1_000_000;
        let mut high = video(1, 1280, 720);
        high.bit_rate = 4_000_000;
        assert_eq!(
            select_visual_stream(&[low, high]),
            VisualStream::MotionVideo(1)
        );

        let same = video(3, 1280, 720);
        let mut first = same.clone();
        first.index = 2;
        first.bit_rate = 0;
        assert_eq!(
            select_visual_stream(&[same, first]),
            VisualStream::MotionVideo(2)
        );
    }

    #[test]
    fn motion_video_beats_attached_picture() {
        let streams = vec![picture(0, 3000, 3000), video(1, 640, 360)];
        assert_eq!(
            select_visual_stream(&streams),
            VisualStream::MotionVideo(1)
        );
    }

    #[test]
    fn undecodable_video_falls_back_to_thumbnail_track() {
        let mut protected = video(0, 1920, 1080);
        protected.decodable = false;
        let streams = vec![protected, audio(1, 6), thumbnails(2)];
        assert_eq!(
            select_visual_stream(&streams),
            VisualStream::StillSequence(2)
        );
    }

    #[test]
    fn sequence_beats_single_picture() {
        let streams = vec![picture(0, 1000, 1000), thumbnails(1)];
        assert_eq!(
            select_visual_stream(&streams),
            VisualStream::StillSequence(1)
        );
    }

    #[test]
    fn audio_with_cover_selects_picture() {
        let streams = vec![audio(0, 2), picture(1, 500, 500)];
        let selected = select_visual_stream(&streams);
        assert_eq!(selected, VisualStream::StillSequence(1));
        assert!(selected.is_still_sequence());
    }

    #[test]
    fn audio_only_has_no_visual_stream() {
        let streams = vec![audio(0, 2)];
        let selected = select_visual_stream(&streams);
        assert_eq!(selected, VisualStream::None);
        assert_eq!(selected.stream_index(), None);
    }

    #[test]
    fn undecodable_picture_is_ignored() {
        let mut cover = picture(1, 500, 500);
        cover.decodable = false;
        assert_eq!(
            select_visual_stream(&[audio(0, 2), cover]),
            VisualStream::None
        );
    }
}
