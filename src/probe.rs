//! Lightweight media probing.
//!
//! [`MediaProbe`] extracts metadata from a media source without keeping the
//! demuxer open. This is useful for quickly inspecting many files (e.g. in a
//! directory listing) before deciding which ones deserve a preview.
//!
//! To produce pictures, use [`Snapshotter::open`](crate::Snapshotter::open)
//! instead.

use std::path::Path;

use crate::config::SnapshotOptions;
use crate::error::SnapshotError;
use crate::metadata::MediaMetadata;
use crate::snapshotter::Snapshotter;

/// Lightweight media probe.
///
/// Opens the source, extracts metadata, and immediately closes it. The
/// resulting [`MediaMetadata`] is identical to what
/// [`Snapshotter::metadata`](crate::Snapshotter::metadata) returns. No
/// decoder is ever allocated.
///
/// # Example
///
/// ```no_run
/// use snapshotter::MediaProbe;
///
/// let metadata = MediaProbe::probe("input.mp4")?;
/// println!("{}: {:?}, {:?}", metadata.title, metadata.duration, metadata.visual);
/// # Ok::<(), snapshotter::SnapshotError>(())
/// ```
pub struct MediaProbe;

impl MediaProbe {
    /// Probe a media source and return its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Open`] if the source cannot be opened or
    /// holds no usable stream.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaMetadata, SnapshotError> {
        Self::probe_with_options(path, &SnapshotOptions::default())
    }

    /// Probe a media source, applying the FFmpeg log level of `options`.
    ///
    /// # Errors
    ///
    /// As [`probe`](MediaProbe::probe).
    pub fn probe_with_options<P: AsRef<Path>>(
        path: P,
        options: &SnapshotOptions,
    ) -> Result<MediaMetadata, SnapshotError> {
        let mut snapshotter = Snapshotter::open_with_options(path, options)?;
        let metadata = snapshotter.metadata().clone();
        snapshotter.close();
        Ok(metadata)
    }

    /// Probe multiple media sources.
    ///
    /// Sources that cannot be probed produce an `Err` entry in the result
    /// vector rather than aborting the entire batch.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use snapshotter::MediaProbe;
    ///
    /// let results = MediaProbe::probe_many(&["a.mp4", "b.mkv", "c.m4a"]);
    /// for result in &results {
    ///     match result {
    ///         Ok(meta) => println!("{}: {:?}", meta.format, meta.duration),
    ///         Err(err) => eprintln!("Error: {err}"),
    ///     }
    /// }
    /// ```
    pub fn probe_many<P: AsRef<Path>>(paths: &[P]) -> Vec<Result<MediaMetadata, SnapshotError>> {
        paths.iter().map(|path| Self::probe(path)).collect()
    }
}
