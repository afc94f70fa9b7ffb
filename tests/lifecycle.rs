//! Session lifecycle and teardown.

use std::{path::Path, time::Duration};

use snapshotter::{CoverArtMode, SessionState, SnapshotError, Snapshotter};

fn fixture(name: &str) -> Option<String> {
    let path = format!("tests/fixtures/{name}");
    Path::new(&path).exists().then_some(path)
}

#[test]
fn decoder_is_allocated_lazily() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    assert_eq!(snapshotter.state(), SessionState::Open);

    snapshotter
        .snapshot((64, 36), Duration::ZERO)
        .expect("snapshot");
    assert_eq!(snapshotter.state(), SessionState::DecoderReady);

    snapshotter
        .snapshot((64, 36), Duration::from_secs(2))
        .expect("second snapshot");
    assert_eq!(snapshotter.state(), SessionState::DecoderReady);
}

#[test]
fn close_is_idempotent() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    snapshotter
        .snapshot((64, 36), Duration::ZERO)
        .expect("snapshot");

    snapshotter.close();
    assert!(snapshotter.is_closed());
    snapshotter.close();
    assert_eq!(snapshotter.state(), SessionState::Closed);

    // Cached metadata survives teardown.
    assert_eq!(snapshotter.display_size(), (1920, 1080));
    assert_eq!(snapshotter.duration(), 5);
}

#[test]
fn operations_after_close_fail() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    snapshotter.close();

    assert!(matches!(
        snapshotter.snapshot((64, 36), Duration::ZERO),
        Err(SnapshotError::SessionClosed)
    ));
    assert!(matches!(
        snapshotter.snapshot_png((64, 36), Duration::ZERO),
        Err(SnapshotError::SessionClosed)
    ));
    assert!(matches!(
        snapshotter.cover_art(CoverArtMode::Default),
        Err(SnapshotError::SessionClosed)
    ));
    assert!(matches!(
        snapshotter.cover_art_encoded(CoverArtMode::Default),
        Err(SnapshotError::SessionClosed)
    ));
}

#[test]
fn failed_calls_leave_instance_usable() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    assert!(snapshotter.snapshot((64, 36), Duration::from_secs(3600)).is_err());
    assert!(snapshotter.snapshot((0, 0), Duration::ZERO).is_err());
    let frame = snapshotter
        .snapshot((64, 36), Duration::from_secs(1))
        .expect("snapshot after failures");
    assert_eq!(frame.dimensions(), (64, 36));
}

#[test]
fn repeated_open_close_after_failures() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    for iteration in 0..50 {
        let mut snapshotter = Snapshotter::open(&path).expect("open");
        let result = snapshotter.snapshot((64, 36), Duration::from_secs(3600));
        assert!(result.is_err(), "iteration {iteration} should fail");
        if iteration % 2 == 0 {
            snapshotter
                .snapshot((64, 36), Duration::from_secs(1))
                .expect("snapshot");
            snapshotter.close();
        }
        // Odd iterations rely on Drop.
    }
}

#[test]
fn instances_on_separate_threads() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    let handles: Vec<_> = (0..4_u64)
        .map(|second| {
            let path = path.clone();
            std::thread::spawn(move || {
                let mut snapshotter = Snapshotter::open(&path).expect("open");
                snapshotter
                    .snapshot((64, 36), Duration::from_secs(second))
                    .expect("snapshot")
                    .timestamp()
            })
        })
        .collect();

    for (second, handle) in handles.into_iter().enumerate() {
        let timestamp = handle.join().expect("thread").expect("timestamp");
        assert!(timestamp >= Duration::from_secs(second as u64));
    }
}
