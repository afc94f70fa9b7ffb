//! Decode session.
//!
//! [`DecodeSession`] owns the demuxer of an opened source and, once the
//! first picture is requested, one video decoder bound to the selected
//! visual stream. The decoder is kept and reused by later requests and
//! released together with the demuxer when the session is closed.
//!
//! Motion video is located with seek-then-decode: seek to the keyframe at or
//! before the target, flush, and decode forward until a frame at or after the
//! target appears. If the stream ends first, one more attempt is made from
//! the middle of the container. Still-image sequences skip all of that and
//! decode the picture nearest the requested position.

use std::{os::raw::c_int, time::Duration};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::{context::Context as CodecContext, decoder::Video as VideoDecoder},
    format::{context::Input, stream::Stream},
    frame::Video as VideoFrame,
};
use ffmpeg_sys_next::{
    AVStream, avformat_index_get_entries_count, avformat_index_get_entry, avformat_seek_file,
};

use crate::conversion;
use crate::error::SnapshotError;
use crate::selection::VisualStream;

/// Lifecycle state of a [`DecodeSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The demuxer is open; no decoder has been allocated yet.
    Open,
    /// A decoder for the selected stream is allocated and cached.
    DecoderReady,
    /// All native resources have been released.
    Closed,
}

/// A decoded frame plus its position relative to the stream start.
pub(crate) struct DecodedFrame {
    pub(crate) frame: VideoFrame,
    pub(crate) position: Option<Duration>,
}

/// The cached decoder and the timing of the stream it is bound to.
struct ActiveDecoder {
    stream_index: usize,
    decoder: VideoDecoder,
    time_base: Rational,
    start_offset: f64,
}

/// Owns the demuxer and the lazily created decoder of one source.
pub struct DecodeSession {
    // Declared before `input` so it is dropped first.
    decoder: Option<ActiveDecoder>,
    input: Option<Input>,
    visual: VisualStream,
    duration: Duration,
    still_index: Option<StillIndex>,
}

/// Where the pictures of a still-image stream are.
struct StillIndex {
    count: usize,
    /// Timestamp of each picture in stream time base. Empty when pictures
    /// have to be found by counting packets.
    timestamps: Vec<i64>,
}

impl DecodeSession {
    pub(crate) fn new(input: Input, visual: VisualStream, duration: Duration) -> Self {
        Self {
            decoder: None,
            input: Some(input),
            visual,
            duration,
            still_index: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match (&self.input, &self.decoder) {
            (None, _) => SessionState::Closed,
            (Some(_), None) => SessionState::Open,
            (Some(_), Some(_)) => SessionState::DecoderReady,
        }
    }

    /// The stream this session decodes from.
    pub fn visual(&self) -> VisualStream {
        self.visual
    }

    /// Release the decoder, then the demuxer. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.input.is_none() {
            return;
        }
        if let Some(active) = self.decoder.take() {
            log::debug!("Releasing decoder for stream {}", active.stream_index);
            drop(active);
        }
        self.input = None;
        self.still_index = None;
        log::debug!("Decode session closed");
    }

    /// Allocate the decoder for the selected stream if there is none yet.
    ///
    /// On failure the session stays [`SessionState::Open`] so a later call
    /// can try again.
    fn ensure_decoder(&mut self) -> Result<(), SnapshotError> {
        let input = self.input.as_ref().ok_or(SnapshotError::SessionClosed)?;
        if self.decoder.is_some() {
            return Ok(());
        }
        let stream_index = self
            .visual
            .stream_index()
            .ok_or(SnapshotError::NoVisualStream)?;
        let stream = input
            .stream(stream_index)
            .ok_or(SnapshotError::NoVisualStream)?;

        let time_base = stream.time_base();
        let start_offset = conversion::start_offset_seconds(stream.start_time(), time_base);
        let decoder = open_decoder(&stream)?;

        log::debug!(
            "Allocated {:?} decoder for stream {} ({}x{}, time base {}/{})",
            decoder.id(),
            stream_index,
            decoder.width(),
            decoder.height(),
            time_base.numerator(),
            time_base.denominator()
        );

        self.decoder = Some(ActiveDecoder {
            stream_index,
            decoder,
            time_base,
            start_offset,
        });
        Ok(())
    }

    /// Decode the frame at or after `target` on a motion video stream.
    ///
    /// Falls back once to a seek to the container midpoint when the stream
    /// ends before a matching frame is produced.
    pub(crate) fn decode_at(&mut self, target: Duration) -> Result<DecodedFrame, SnapshotError> {
        if !matches!(self.visual, VisualStream::MotionVideo(_)) {
            return self.decode_still_at(target);
        }
        self.ensure_decoder()?;

        if let Some(decoded) = self.seek_and_decode(target, true)? {
            return Ok(decoded);
        }

        let midpoint = self.duration / 2;
        log::warn!(
            "End of stream reached before {:?}; retrying from midpoint {:?}",
            target,
            midpoint
        );
        self.seek_and_decode(midpoint, false)?.ok_or_else(|| {
            SnapshotError::Decode(format!(
                "no frame could be decoded at {target:?} or from the midpoint"
            ))
        })
    }

    /// Seek to the keyframe at or before `target`, flush, and decode
    /// forward. With `exact` unset the first decoded frame is accepted.
    ///
    /// Returns `Ok(None)` if the stream ends first.
    fn seek_and_decode(
        &mut self,
        target: Duration,
        exact: bool,
    ) -> Result<Option<DecodedFrame>, SnapshotError> {
        let duration = self.duration;
        let input = self
            .input
            .as_mut()
            .ok_or(SnapshotError::SessionClosed)?;
        let active = self
            .decoder
            .as_mut()
            .ok_or_else(|| SnapshotError::Decode("decoder not allocated".to_string()))?;

        let timestamp = conversion::seek_timestamp(target, active.start_offset);
        log::debug!(
            "Seeking stream {} to {:?} (container timestamp {})",
            active.stream_index,
            target,
            timestamp
        );
        input.seek(timestamp, ..timestamp).map_err(|error| {
            log::debug!("Seek to {:?} rejected: {}", target, error);
            SnapshotError::Seek {
                requested: target,
                duration,
            }
        })?;
        active.decoder.flush();

        let minimum = exact.then_some(target);
        let mut decoded = VideoFrame::empty();
        let mut discarded = 0usize;

        loop {
            let mut packet = Packet::empty();
            let draining = match packet.read(input) {
                Ok(()) => {
                    if packet.stream() != active.stream_index {
                        continue;
                    }
                    if let Err(error) = active.decoder.send_packet(&packet) {
                        // Corrupt packets are skipped; the next keyframe recovers.
                        log::debug!("Decoder rejected packet: {}", error);
                        continue;
                    }
                    false
                }
                Err(FfmpegError::Eof) => {
                    active.decoder.send_eof().map_err(decode_error)?;
                    true
                }
                Err(error) => return Err(decode_error(error)),
            };

            while active.decoder.receive_frame(&mut decoded).is_ok() {
                match accept_frame(&decoded, active, minimum) {
                    Some(position) => {
                        log::debug!(
                            "Decoded frame at {:?} after discarding {} frames",
                            position,
                            discarded
                        );
                        if draining {
                            active.decoder.flush();
                        }
                        return Ok(Some(DecodedFrame {
                            frame: decoded,
                            position,
                        }));
                    }
                    None => discarded += 1,
                }
            }

            if draining {
                active.decoder.flush();
                log::debug!("End of stream after discarding {} frames", discarded);
                return Ok(None);
            }
        }
    }

    /// Locate the pictures of the selected still-image stream.
    ///
    /// Taken from the demuxer index when it covers every picture, otherwise
    /// by demuxing the stream once. Cached either way.
    fn load_still_index(&mut self, stream_index: usize) -> Result<&StillIndex, SnapshotError> {
        if self.still_index.is_none() {
            let input = self.input.as_mut().ok_or(SnapshotError::SessionClosed)?;
            let (single_embedded, indexed) = {
                let stream = input
                    .stream(stream_index)
                    .ok_or(SnapshotError::NoVisualStream)?;
                (
                    attached_picture_bytes(&stream).is_some() && stream.frames() <= 1,
                    indexed_timestamps(&stream),
                )
            };

            let index = if single_embedded {
                StillIndex {
                    count: 1,
                    timestamps: Vec::new(),
                }
            } else if let Some(timestamps) = indexed {
                log::debug!(
                    "Still stream {} indexed by the demuxer ({} entries)",
                    stream_index,
                    timestamps.len()
                );
                StillIndex {
                    count: timestamps.len(),
                    timestamps,
                }
            } else {
                log::debug!("Still stream {} has no usable index; scanning", stream_index);
                scan_still_stream(input, stream_index, self.duration)?
            };

            log::debug!("Still stream {} holds {} pictures", stream_index, index.count);
            self.still_index = Some(index);
        }
        self.still_index
            .as_ref()
            .ok_or_else(|| SnapshotError::Decode("still index unavailable".to_string()))
    }

    /// Decode the picture of a still-image stream nearest the fractional
    /// position `target / duration`.
    pub(crate) fn decode_still_at(
        &mut self,
        target: Duration,
    ) -> Result<DecodedFrame, SnapshotError> {
        let stream_index = match self.visual {
            VisualStream::StillSequence(index) => index,
            VisualStream::MotionVideo(_) => {
                return Err(SnapshotError::Decode(
                    "selected stream is not a still-image sequence".to_string(),
                ));
            }
            VisualStream::None => return Err(SnapshotError::NoVisualStream),
        };

        let duration = self.duration;
        let count = self.load_still_index(stream_index)?.count;
        let picture = nearest_picture_index(target, duration, count);
        self.decode_still_picture(stream_index, picture)
    }

    /// Decode the `picture`-th packet of a still-image stream.
    pub(crate) fn decode_still_picture(
        &mut self,
        stream_index: usize,
        picture: usize,
    ) -> Result<DecodedFrame, SnapshotError> {
        self.ensure_decoder()?;
        let timestamp = self
            .load_still_index(stream_index)?
            .timestamps
            .get(picture)
            .copied();
        let duration = self.duration;
        let input = self.input.as_mut().ok_or(SnapshotError::SessionClosed)?;
        let active = self
            .decoder
            .as_mut()
            .ok_or_else(|| SnapshotError::Decode("decoder not allocated".to_string()))?;

        let (embedded, single_embedded) = {
            let stream = input
                .stream(stream_index)
                .ok_or(SnapshotError::NoVisualStream)?;
            let embedded = attached_picture_bytes(&stream);
            let single = embedded.is_some() && stream.frames() <= 1;
            (embedded, single)
        };

        let packet = if picture == 0 && single_embedded {
            embedded.map(|bytes| Packet::copy(&bytes))
        } else {
            let indexed = match timestamp {
                Some(timestamp) => seek_still_packet(input, stream_index, timestamp)?,
                None => None,
            };
            let found = match indexed {
                Some(packet) => Some(packet),
                None => nth_stream_packet(input, stream_index, picture, duration)?,
            };
            found.or_else(|| embedded.map(|bytes| Packet::copy(&bytes)))
        };

        let packet = packet.ok_or_else(|| {
            SnapshotError::Decode(format!(
                "still stream {stream_index} has no picture {picture}"
            ))
        })?;
        let position =
            conversion::frame_position(packet.pts(), active.time_base, active.start_offset);

        log::debug!(
            "Decoding still picture {} of stream {} ({} bytes)",
            picture,
            stream_index,
            packet.size()
        );
        let frame = decode_single_packet(&mut active.decoder, &packet)?;
        Ok(DecodedFrame { frame, position })
    }

    /// Decode the embedded picture of the selected stream with the cached
    /// decoder.
    ///
    /// Pictures attached to any other stream are raw image files; read them
    /// with [`attached_picture`](DecodeSession::attached_picture) instead.
    pub(crate) fn decode_attached_picture(&mut self) -> Result<VideoFrame, SnapshotError> {
        let stream_index = self
            .visual
            .stream_index()
            .ok_or(SnapshotError::NoVisualStream)?;
        let bytes = self.attached_picture(stream_index)?.ok_or_else(|| {
            SnapshotError::Decode(format!("stream {stream_index} carries no attached picture"))
        })?;
        let packet = Packet::copy(&bytes);

        self.ensure_decoder()?;
        let active = self
            .decoder
            .as_mut()
            .ok_or_else(|| SnapshotError::Decode("decoder not allocated".to_string()))?;
        decode_single_packet(&mut active.decoder, &packet)
    }

    /// Raw bytes of the attached picture of `stream_index`, if any.
    pub(crate) fn attached_picture(
        &self,
        stream_index: usize,
    ) -> Result<Option<Vec<u8>>, SnapshotError> {
        let input = self.input.as_ref().ok_or(SnapshotError::SessionClosed)?;
        let stream = input
            .stream(stream_index)
            .ok_or(SnapshotError::NoVisualStream)?;
        Ok(attached_picture_bytes(&stream))
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Position of a decoded frame, or `None` if it lies before `minimum`.
///
/// Frames without a timestamp are accepted.
fn accept_frame(
    frame: &VideoFrame,
    active: &ActiveDecoder,
    minimum: Option<Duration>,
) -> Option<Option<Duration>> {
    let pts = frame.timestamp().or_else(|| frame.pts());
    let position = conversion::frame_position(pts, active.time_base, active.start_offset);
    match (position, minimum) {
        (Some(position), Some(minimum)) if position < minimum => None,
        _ => Some(position),
    }
}

fn decode_error(error: FfmpegError) -> SnapshotError {
    SnapshotError::Decode(error.to_string())
}

fn open_decoder(stream: &Stream) -> Result<VideoDecoder, SnapshotError> {
    let context = CodecContext::from_parameters(stream.parameters()).map_err(|error| {
        SnapshotError::Decode(format!(
            "cannot read codec parameters of stream {}: {error}",
            stream.index()
        ))
    })?;
    context.decoder().video().map_err(|error| {
        SnapshotError::Decode(format!(
            "cannot open decoder for stream {}: {error}",
            stream.index()
        ))
    })
}

/// Decode one self-contained packet and leave the decoder reusable.
fn decode_single_packet(
    decoder: &mut VideoDecoder,
    packet: &Packet,
) -> Result<VideoFrame, SnapshotError> {
    decoder.flush();
    let mut frame = VideoFrame::empty();
    let result = decoder
        .send_packet(packet)
        .and_then(|()| decoder.send_eof())
        .and_then(|()| decoder.receive_frame(&mut frame));
    decoder.flush();
    result.map_err(decode_error)?;
    Ok(frame)
}

/// Seek back to the start of the container.
fn rewind(input: &mut Input, duration: Duration) -> Result<(), SnapshotError> {
    input.seek(0, ..).map_err(|error| {
        log::debug!("Rewind rejected: {}", error);
        SnapshotError::Seek {
            requested: Duration::ZERO,
            duration,
        }
    })
}

/// Demux the whole container once, counting the pictures of `stream_index`.
fn scan_still_stream(
    input: &mut Input,
    stream_index: usize,
    duration: Duration,
) -> Result<StillIndex, SnapshotError> {
    rewind(input, duration)?;
    let mut count = 0usize;
    let mut timestamps = Vec::new();
    let mut timed = true;
    loop {
        let mut packet = Packet::empty();
        match packet.read(input) {
            Ok(()) if packet.stream() == stream_index => {
                count += 1;
                match packet.pts().or_else(|| packet.dts()) {
                    Some(timestamp) => timestamps.push(timestamp),
                    None => timed = false,
                }
            }
            Ok(()) => {}
            Err(FfmpegError::Eof) => break,
            Err(error) => return Err(decode_error(error)),
        }
    }
    if !timed {
        timestamps.clear();
    }
    Ok(StillIndex { count, timestamps })
}

/// Seek straight to the picture stamped `timestamp` and read its packet.
///
/// Returns `Ok(None)` if the demuxer cannot seek there.
fn seek_still_packet(
    input: &mut Input,
    stream_index: usize,
    timestamp: i64,
) -> Result<Option<Packet>, SnapshotError> {
    // SAFETY: the format context is owned by `input`, which is borrowed
    // mutably for the duration of the call.
    let result = unsafe {
        avformat_seek_file(
            input.as_mut_ptr(),
            stream_index as c_int,
            i64::MIN,
            timestamp,
            timestamp,
            0,
        )
    };
    if result < 0 {
        log::debug!(
            "Indexed seek to {} on stream {} rejected: {}",
            timestamp,
            stream_index,
            FfmpegError::from(result)
        );
        return Ok(None);
    }

    loop {
        let mut packet = Packet::empty();
        match packet.read(input) {
            Ok(()) if packet.stream() == stream_index => {
                match packet.pts().or_else(|| packet.dts()) {
                    Some(pts) if pts < timestamp => {}
                    _ => return Ok(Some(packet)),
                }
            }
            Ok(()) => {}
            Err(FfmpegError::Eof) => return Ok(None),
            Err(error) => return Err(decode_error(error)),
        }
    }
}

/// Rewind and read packets until the `picture`-th one of `stream_index`.
fn nth_stream_packet(
    input: &mut Input,
    stream_index: usize,
    picture: usize,
    duration: Duration,
) -> Result<Option<Packet>, SnapshotError> {
    rewind(input, duration)?;
    let mut seen = 0usize;
    loop {
        let mut packet = Packet::empty();
        match packet.read(input) {
            Ok(()) if packet.stream() == stream_index => {
                if seen == picture {
                    return Ok(Some(packet));
                }
                seen += 1;
            }
            Ok(()) => {}
            Err(FfmpegError::Eof) => return Ok(None),
            Err(error) => return Err(decode_error(error)),
        }
    }
}

/// Picture timestamps from the demuxer index of `stream`.
///
/// `None` when the index is empty or disagrees with the frame count the
/// container reports.
fn indexed_timestamps(stream: &Stream) -> Option<Vec<i64>> {
    let raw = stream.as_ptr() as *mut AVStream;
    // SAFETY: the index is owned by the stream, which outlives this borrow,
    // and is only read here.
    let entries = unsafe { avformat_index_get_entries_count(raw) };
    if entries <= 0 {
        return None;
    }

    let mut timestamps: Vec<i64> = (0..entries)
        .filter_map(|entry| {
            // SAFETY: `entry` is within the count returned above.
            let entry = unsafe { avformat_index_get_entry(raw, entry) };
            (!entry.is_null()).then(|| unsafe { (*entry).timestamp })
        })
        .collect();
    timestamps.sort_unstable();
    timestamps.dedup();

    let frames = stream.frames();
    if frames > 0 && timestamps.len() as i64 != frames {
        log::debug!(
            "Index of stream {} lists {} pictures, container reports {}",
            stream.index(),
            timestamps.len(),
            frames
        );
        return None;
    }
    Some(timestamps)
}

/// Copy the picture stored in `AVStream.attached_pic`.
fn attached_picture_bytes(stream: &Stream) -> Option<Vec<u8>> {
    // SAFETY: `attached_pic` is owned by the stream, which outlives this borrow.
    let packet = unsafe { &(*stream.as_ptr()).attached_pic };
    if packet.data.is_null() || packet.size <= 0 {
        return None;
    }
    // SAFETY: `data` is non-null and holds `size` bytes.
    let bytes = unsafe { std::slice::from_raw_parts(packet.data, packet.size as usize) };
    Some(bytes.to_vec())
}

/// Index of the picture nearest the fractional position `target / duration`
/// among `count` pictures spread evenly from the start.
pub(crate) fn nearest_picture_index(target: Duration, duration: Duration, count: usize) -> usize {
    if count <= 1 || duration.is_zero() {
        return 0;
    }
    let fraction = (target.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
    ((fraction * count as f64).round() as usize).min(count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_picture_spreads_over_duration() {
        let duration = Duration::from_secs(100);
        assert_eq!(nearest_picture_index(Duration::ZERO, duration, 10), 0);
        assert_eq!(nearest_picture_index(Duration::from_secs(34), duration, 10), 3);
        assert_eq!(nearest_picture_index(Duration::from_secs(36), duration, 10), 4);
        assert_eq!(nearest_picture_index(Duration::from_secs(99), duration, 10), 9);
    }

    #[test]
    fn nearest_picture_rounds_to_the_closer_neighbour() {
        // Six pictures at 0, 2, 4, 6, 8 and 10 s.
        let duration = Duration::from_secs(12);
        assert_eq!(nearest_picture_index(Duration::from_millis(900), duration, 6), 0);
        assert_eq!(nearest_picture_index(Duration::from_millis(1_900), duration, 6), 1);
        assert_eq!(nearest_picture_index(Duration::from_millis(3_900), duration, 6), 2);
        assert_eq!(nearest_picture_index(Duration::from_millis(10_400), duration, 6), 5);
    }

    #[test]
    fn nearest_picture_clamps_out_of_range_positions() {
        let duration = Duration::from_secs(10);
        assert_eq!(nearest_picture_index(Duration::from_secs(60), duration, 4), 3);
    }

    #[test]
    fn nearest_picture_degenerate_inputs() {
        assert_eq!(nearest_picture_index(Duration::from_secs(5), Duration::ZERO, 8), 0);
        assert_eq!(nearest_picture_index(Duration::from_secs(5), Duration::from_secs(9), 1), 0);
        assert_eq!(nearest_picture_index(Duration::from_secs(5), Duration::from_secs(9), 0), 0);
    }
}
