//! Internal conversion helpers.
//!
//! Pixel-plane copying and timestamp arithmetic shared by the decode session
//! and the scaler.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of a packed-format frame into a tightly packed
/// buffer, dropping any per-row padding FFmpeg added.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Rescale a PTS value from a stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Offset of the first presentation timestamp of a stream, in seconds.
///
/// FFmpeg reports `AV_NOPTS_VALUE` (`i64::MIN`) when the start is unknown.
pub(crate) fn start_offset_seconds(start_time: i64, time_base: Rational) -> f64 {
    if start_time == i64::MIN {
        0.0
    } else {
        pts_to_seconds(start_time, time_base)
    }
}

/// Position of a frame relative to the start of its stream, or `None` if
/// the frame carries no usable timestamp.
pub(crate) fn frame_position(
    pts: Option<i64>,
    time_base: Rational,
    start_offset: f64,
) -> Option<Duration> {
    let seconds = pts_to_seconds(pts?, time_base) - start_offset;
    Some(Duration::from_secs_f64(seconds.max(0.0)))
}

/// Convert a position relative to the stream start into a container-level
/// seek timestamp in `AV_TIME_BASE` units (microseconds).
///
/// `Input::seek` (`avformat_seek_file` with `stream_index = -1`) expects
/// absolute timestamps, so the stream's start offset is added back.
pub(crate) fn seek_timestamp(position: Duration, start_offset: f64) -> i64 {
    ((position.as_secs_f64() + start_offset) * 1_000_000.0).round() as i64
}

/// Container duration reported by FFmpeg in microseconds, or
/// [`Duration::ZERO`] when unknown.
pub(crate) fn container_duration(microseconds: i64) -> Duration {
    if microseconds > 0 {
        Duration::from_micros(microseconds as u64)
    } else {
        Duration::ZERO
    }
}

/// Frames per second from a rational rate, `0.0` when the rate is unset.
pub(crate) fn rate_to_fps(rate: Rational) -> f64 {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        0.0
    } else {
        rate.numerator() as f64 / rate.denominator() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_rescales_with_time_base() {
        let time_base = Rational::new(1, 90_000);
        assert_eq!(pts_to_seconds(180_000, time_base), 2.0);
        assert_eq!(pts_to_seconds(5, Rational::new(1, 0)), 0.0);
    }

    #[test]
    fn unknown_start_offset_is_zero() {
        assert_eq!(start_offset_seconds(i64::MIN, Rational::new(1, 1000)), 0.0);
        assert_eq!(start_offset_seconds(1_400, Rational::new(1, 1000)), 1.4);
    }

    #[test]
    fn frame_position_subtracts_start_offset() {
        let time_base = Rational::new(1, 1000);
        assert_eq!(
            frame_position(Some(3_400), time_base, 1.4),
            Some(Duration::from_secs(2))
        );
        assert_eq!(frame_position(None, time_base, 0.0), None);
        assert_eq!(
            frame_position(Some(1_000), time_base, 1.4),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn seek_timestamp_is_absolute_microseconds() {
        assert_eq!(seek_timestamp(Duration::from_millis(2_500), 0.0), 2_500_000);
        assert_eq!(seek_timestamp(Duration::from_secs(1), 0.5), 1_500_000);
    }

    #[test]
    fn container_duration_ignores_unknown_values() {
        assert_eq!(container_duration(-1), Duration::ZERO);
        assert_eq!(container_duration(0), Duration::ZERO);
        assert_eq!(container_duration(5_000_000), Duration::from_secs(5));
    }

    #[test]
    fn rate_to_fps_handles_unset_rates() {
        assert_eq!(rate_to_fps(Rational::new(30, 1)), 30.0);
        assert_eq!(rate_to_fps(Rational::new(0, 0)), 0.0);
        assert_eq!(rate_to_fps(Rational::new(1, 2)), 0.5);
    }
}
