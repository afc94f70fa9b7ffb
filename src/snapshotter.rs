//! Core [`Snapshotter`] implementation.
//!
//! `Snapshotter` is the main entry point for the crate. It opens a media
//! source, selects the visual stream once, caches the session-level metadata
//! and exposes the four picture-producing operations: cover art and
//! timestamped snapshots, each either as an owned [`RasterFrame`] or as an
//! [`EncodedImage`].

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{format::context::Input, media::Type};

use crate::{
    config::{self, SnapshotOptions},
    conversion,
    cover_art::{self, CoverArtMode},
    encoder::{self, EncodedImage, ImageFormat},
    error::SnapshotError,
    metadata::{self, MediaMetadata, StreamDescriptor, StreamKind},
    raster::RasterFrame,
    scaler::Scaler,
    selection::{self, VisualStream},
    session::{DecodeSession, DecodedFrame, SessionState},
};

/// Extracts snapshots and cover art from one media source.
///
/// Created via [`Snapshotter::open`]. The demuxer stays open for the
/// lifetime of the instance and the video decoder, once allocated, is reused
/// by every later request. Both are released by [`close`](Snapshotter::close)
/// or when the instance is dropped.
///
/// A failing call leaves the instance usable for further calls.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use snapshotter::{CoverArtMode, Snapshotter};
///
/// let mut snapshotter = Snapshotter::open("movie.mkv")?;
/// println!("{} ({} s)", snapshotter.title(), snapshotter.duration());
///
/// let poster = snapshotter.cover_art_encoded(CoverArtMode::Default)?;
/// poster.save("poster.jpg")?;
///
/// let preview = snapshotter.snapshot_png((320, 180), Duration::from_secs(12))?;
/// preview.save("preview.png")?;
/// # Ok::<(), snapshotter::SnapshotError>(())
/// ```
pub struct Snapshotter {
    session: DecodeSession,
    scaler: Scaler,
    metadata: MediaMetadata,
    options: SnapshotOptions,
    path: PathBuf,
}

impl Debug for Snapshotter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Snapshotter")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("state", &self.session.state())
            .finish_non_exhaustive()
    }
}

impl Snapshotter {
    /// Open a media source with default options.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Open`] if the source cannot be opened or
    /// demuxed, or holds neither a video-like nor an audio stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        Self::open_with_options(path, &SnapshotOptions::default())
    }

    /// Open a media source.
    ///
    /// Initialises FFmpeg (idempotent), opens the container, describes every
    /// stream and commits to one visual stream for the lifetime of the
    /// instance. Audio-only sources open successfully; their picture
    /// operations fail with [`SnapshotError::NoVisualStream`].
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Open`] if the source cannot be opened or
    /// demuxed, or holds neither a video-like nor an audio stream.
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: &SnapshotOptions,
    ) -> Result<Self, SnapshotError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |reason: String| SnapshotError::Open {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        if let Some(level) = options.ffmpeg_log_level {
            config::set_ffmpeg_log_level(level);
        }

        let input = ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let streams: Vec<StreamDescriptor> =
            input.streams().map(|stream| metadata::describe_stream(&stream)).collect();
        for stream in &streams {
            log::debug!(
                "Stream {}: {:?} {} {}x{} decodable={} attached={} still={}",
                stream.index,
                stream.kind,
                stream.codec,
                stream.width,
                stream.height,
                stream.decodable,
                stream.attached_picture,
                stream.still_image_sequence
            );
        }

        let visual = selection::select_visual_stream(&streams);
        if !has_usable_stream(&streams) {
            return Err(open_error("no usable video or audio stream".to_string()));
        }

        let duration = source_duration(&input, visual);
        let display_size = visual
            .stream_index()
            .and_then(|index| streams.iter().find(|stream| stream.index == index))
            .map_or((0, 0), StreamDescriptor::display_size);
        let channels = best_audio_channels(&input, &streams);
        let title = source_title(&input, &path);
        let format = input.format().name().to_string();

        log::info!(
            "Opened {} ({}): {:?}, {}x{}, {:?}, {} channels",
            path.display(),
            format,
            visual,
            display_size.0,
            display_size.1,
            duration,
            channels
        );

        let metadata = MediaMetadata {
            duration,
            display_size,
            channels,
            title,
            format,
            visual,
            streams,
        };

        Ok(Self {
            session: DecodeSession::new(input, visual, duration),
            scaler: Scaler::new(options.scaling),
            metadata,
            options: options.clone(),
            path,
        })
    }

    /// Metadata cached at open time. Still available after
    /// [`close`](Snapshotter::close).
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Aspect-corrected size of the selected visual stream, `(0, 0)` when
    /// there is none.
    pub fn display_size(&self) -> (u32, u32) {
        self.metadata.display_size
    }

    /// Duration in whole seconds, 0 when unknown.
    pub fn duration(&self) -> u64 {
        self.metadata.duration.as_secs()
    }

    /// Duration at full precision.
    pub fn duration_exact(&self) -> Duration {
        self.metadata.duration
    }

    /// Channel count of the best audio stream, 0 when there is none.
    pub fn channels(&self) -> u16 {
        self.metadata.channels
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Returns `true` when pictures come from a still-image stream rather
    /// than motion video.
    pub fn is_thumbnail_stream(&self) -> bool {
        self.metadata.visual.is_still_sequence()
    }

    /// Lifecycle state of the underlying decode session.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Returns `true` once [`close`](Snapshotter::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.session.state() == SessionState::Closed
    }

    /// Release the decoder and the demuxer.
    ///
    /// Idempotent. Every picture operation afterwards fails with
    /// [`SnapshotError::SessionClosed`].
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Produce the poster image of the source at full display size.
    ///
    /// An embedded cover picture is preferred (chosen according to `mode`).
    /// Otherwise the first picture of a still-image stream is used, and for
    /// motion video a frame at the representative timestamp. The mode's crop
    /// is applied last.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NoVisualStream`] for sources without a
    /// picture, [`SnapshotError::Decode`] if no frame can be produced.
    pub fn cover_art(&mut self, mode: CoverArtMode) -> Result<RasterFrame, SnapshotError> {
        self.ensure_open()?;
        let embedded = match cover_art::select_cover_art(&self.metadata.streams, mode) {
            Some(stream_index) => match self.decode_embedded_cover(stream_index) {
                Ok(frame) => Some(frame),
                Err(error @ (SnapshotError::Decode(_) | SnapshotError::Image(_)))
                    if matches!(self.metadata.visual, VisualStream::MotionVideo(_)) =>
                {
                    log::warn!(
                        "Embedded cover in stream {} is unreadable ({}); using a video frame",
                        stream_index,
                        error
                    );
                    None
                }
                Err(error) => return Err(error),
            },
            None => None,
        };

        let frame = match embedded {
            Some(frame) => frame,
            None => {
                let decoded = self.decode_poster_frame()?;
                self.scaler.convert_to_fit(
                    &decoded.frame,
                    None,
                    self.options.pixel_format,
                    decoded.position,
                )?
            }
        };

        Ok(apply_crop(frame, mode))
    }

    /// Produce the poster image as compressed bytes.
    ///
    /// When the cover is an embedded PNG or JPEG picture that needs no crop
    /// and pass-through is enabled, its original bytes are returned as-is.
    /// Otherwise the poster is encoded with the configured cover-art format.
    ///
    /// # Errors
    ///
    /// As [`cover_art`](Snapshotter::cover_art), plus
    /// [`SnapshotError::Encode`].
    pub fn cover_art_encoded(&mut self, mode: CoverArtMode) -> Result<EncodedImage, SnapshotError> {
        self.ensure_open()?;
        if self.options.pass_through_embedded {
            if let Some(embedded) = self.embedded_cover_bytes(mode)? {
                return Ok(embedded);
            }
        }

        let frame = self.cover_art(mode)?;
        encoder::encode(
            &frame,
            self.options.cover_art_format,
            self.options.jpeg_quality,
        )
    }

    /// Decode the frame nearest `at` and fit it inside `size`.
    ///
    /// Motion video yields the first frame at or after `at`. Still-image
    /// streams yield the picture nearest the fractional position
    /// `at / duration` and never fail to seek. The result keeps the source
    /// aspect ratio and is never enlarged.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidSize`] for a zero dimension,
    /// [`SnapshotError::Seek`] if `at` is at or beyond the duration of a
    /// motion video, [`SnapshotError::NoVisualStream`] for sources without a
    /// picture and [`SnapshotError::Decode`] if nothing decodes after the
    /// midpoint retry.
    pub fn snapshot(
        &mut self,
        (width, height): (u32, u32),
        at: Duration,
    ) -> Result<RasterFrame, SnapshotError> {
        self.ensure_open()?;
        if width == 0 || height == 0 {
            return Err(SnapshotError::InvalidSize { width, height });
        }

        let decoded = match self.metadata.visual {
            VisualStream::None => return Err(SnapshotError::NoVisualStream),
            VisualStream::MotionVideo(_) => {
                let duration = self.metadata.duration;
                if !duration.is_zero() && at >= duration {
                    return Err(SnapshotError::Seek {
                        requested: at,
                        duration,
                    });
                }
                self.session.decode_at(at)?
            }
            VisualStream::StillSequence(_) => self.session.decode_still_at(at)?,
        };

        self.scaler.convert_to_fit(
            &decoded.frame,
            Some((width, height)),
            self.options.pixel_format,
            decoded.position,
        )
    }

    /// [`snapshot`](Snapshotter::snapshot), encoded as PNG.
    ///
    /// # Errors
    ///
    /// As [`snapshot`](Snapshotter::snapshot), plus [`SnapshotError::Encode`].
    pub fn snapshot_png(
        &mut self,
        size: (u32, u32),
        at: Duration,
    ) -> Result<EncodedImage, SnapshotError> {
        let frame = self.snapshot(size, at)?;
        encoder::encode(&frame, ImageFormat::Png, self.options.jpeg_quality)
    }

    fn ensure_open(&self) -> Result<(), SnapshotError> {
        if self.is_closed() {
            Err(SnapshotError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Decode the embedded picture of `stream_index` at display size.
    ///
    /// The selected stream goes through the cached decoder. Covers attached
    /// next to it are plain image files and are read with the `image`
    /// crate, so no second decoder is ever opened.
    fn decode_embedded_cover(&mut self, stream_index: usize) -> Result<RasterFrame, SnapshotError> {
        if self.metadata.visual.stream_index() == Some(stream_index) {
            log::debug!("Decoding embedded cover of selected stream {}", stream_index);
            let frame = self.session.decode_attached_picture()?;
            return self
                .scaler
                .convert_to_fit(&frame, None, self.options.pixel_format, None);
        }

        let bytes = self.session.attached_picture(stream_index)?.ok_or_else(|| {
            SnapshotError::Decode(format!("stream {stream_index} carries no attached picture"))
        })?;
        log::debug!(
            "Loading attached cover of stream {} ({} bytes)",
            stream_index,
            bytes.len()
        );
        let image = image::load_from_memory(&bytes)?;
        Ok(RasterFrame::from_image(image, self.options.pixel_format))
    }

    /// First picture of a still-image stream, or a representative frame of
    /// motion video.
    fn decode_poster_frame(&mut self) -> Result<DecodedFrame, SnapshotError> {
        match self.metadata.visual {
            VisualStream::None => Err(SnapshotError::NoVisualStream),
            VisualStream::StillSequence(stream_index) => {
                self.session.decode_still_picture(stream_index, 0)
            }
            VisualStream::MotionVideo(_) => {
                let at = cover_art::representative_timestamp(
                    self.metadata.duration,
                    self.options.representative_fraction,
                    self.options.representative_floor,
                );
                log::debug!("No embedded cover; using frame at {:?}", at);
                self.session.decode_at(at)
            }
        }
    }

    /// Original bytes of the embedded cover, when they can be returned
    /// without decoding.
    fn embedded_cover_bytes(
        &self,
        mode: CoverArtMode,
    ) -> Result<Option<EncodedImage>, SnapshotError> {
        let Some(stream_index) = cover_art::select_cover_art(&self.metadata.streams, mode) else {
            return Ok(None);
        };
        let Some(stream) = self
            .metadata
            .streams
            .iter()
            .find(|stream| stream.index == stream_index)
        else {
            return Ok(None);
        };

        // Anamorphic pictures must be resampled to display size.
        let (width, height) = stream.display_size();
        if width == 0 || height == 0 || (width, height) != (stream.width, stream.height) {
            return Ok(None);
        }
        if cover_art::crop_for_mode(mode, width, height).is_some() {
            return Ok(None);
        }

        let Some(bytes) = self.session.attached_picture(stream_index)? else {
            return Ok(None);
        };
        Ok(encoder::sniff_format(&bytes).map(|format| {
            log::debug!(
                "Passing through embedded {} cover ({} bytes) from stream {}",
                format,
                bytes.len(),
                stream_index
            );
            EncodedImage::new(format, bytes)
        }))
    }
}

impl Drop for Snapshotter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Any audio stream, or a video stream a decoder exists for.
fn has_usable_stream(streams: &[StreamDescriptor]) -> bool {
    streams.iter().any(|stream| match stream.kind {
        StreamKind::Audio => true,
        StreamKind::Video => stream.decodable,
        StreamKind::Other => false,
    })
}

fn apply_crop(frame: RasterFrame, mode: CoverArtMode) -> RasterFrame {
    let (width, height) = frame.dimensions();
    match cover_art::crop_for_mode(mode, width, height) {
        Some((x, y, crop_width, crop_height)) => {
            log::debug!(
                "Cropping {}x{} cover to {}x{} at ({}, {}) for {:?}",
                width,
                height,
                crop_width,
                crop_height,
                x,
                y,
                mode
            );
            frame.crop(x, y, crop_width, crop_height)
        }
        None => frame,
    }
}

/// Container duration, falling back to the duration of the visual stream.
fn source_duration(input: &Input, visual: VisualStream) -> Duration {
    let duration = conversion::container_duration(input.duration());
    if !duration.is_zero() {
        return duration;
    }

    visual
        .stream_index()
        .and_then(|index| input.stream(index))
        .filter(|stream| stream.duration() > 0)
        .map_or(Duration::ZERO, |stream| {
            let seconds = conversion::pts_to_seconds(stream.duration(), stream.time_base());
            Duration::from_secs_f64(seconds.max(0.0))
        })
}

/// Channel count of FFmpeg's best audio stream, else the widest one.
fn best_audio_channels(input: &Input, streams: &[StreamDescriptor]) -> u16 {
    let audio = || streams.iter().filter(|stream| stream.kind == StreamKind::Audio);
    input
        .streams()
        .best(Type::Audio)
        .and_then(|best| audio().find(|stream| stream.index == best.index()))
        .or_else(|| audio().max_by_key(|stream| stream.channels))
        .map_or(0, |stream| stream.channels)
}

/// Container `title` tag, falling back to the file stem.
fn source_title(input: &Input, path: &Path) -> String {
    input
        .metadata()
        .get("title")
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}
