//! Parallel snapshot extraction.
//!
//! [`snapshot_many`] processes many sources at once using [`rayon`]. Each
//! worker opens its own [`Snapshotter`], so no demuxer or decoder state is
//! ever shared between threads.

use std::path::Path;
use std::time::Duration;

use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::config::SnapshotOptions;
use crate::error::SnapshotError;
use crate::raster::RasterFrame;
use crate::snapshotter::Snapshotter;

/// Take one snapshot from each source in parallel.
///
/// Results are returned in input order. A source that fails to open or
/// decode produces an `Err` entry without affecting the others. When `at`
/// lies beyond the end of a source, the source's midpoint is used instead so
/// a batch with a single timestamp still yields a picture for short clips.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use snapshotter::{SnapshotOptions, snapshot_many};
///
/// let results = snapshot_many(
///     &["a.mp4", "b.mkv"],
///     (320, 180),
///     Duration::from_secs(30),
///     &SnapshotOptions::default(),
/// );
/// for result in results {
///     match result {
///         Ok(frame) => println!("{}x{}", frame.width(), frame.height()),
///         Err(error) => eprintln!("{error}"),
///     }
/// }
/// ```
pub fn snapshot_many<P: AsRef<Path> + Sync>(
    paths: &[P],
    size: (u32, u32),
    at: Duration,
    options: &SnapshotOptions,
) -> Vec<Result<RasterFrame, SnapshotError>> {
    paths
        .par_iter()
        .map(|path| snapshot_one(path.as_ref(), size, at, options))
        .collect()
}

fn snapshot_one(
    path: &Path,
    size: (u32, u32),
    at: Duration,
    options: &SnapshotOptions,
) -> Result<RasterFrame, SnapshotError> {
    let mut snapshotter = Snapshotter::open_with_options(path, options)?;
    let duration = snapshotter.duration_exact();
    let target = if !duration.is_zero() && at >= duration {
        log::debug!(
            "{} is shorter than {:?}; using its midpoint",
            path.display(),
            at
        );
        duration / 2
    } else {
        at
    };
    let result = snapshotter.snapshot(size, target);
    snapshotter.close();
    result
}
