//! Parallel snapshot tests (requires the `rayon` feature).

#![cfg(feature = "rayon")]

use std::{path::Path, time::Duration};

use snapshotter::{SnapshotOptions, snapshot_many};

#[test]
fn results_keep_input_order() {
    let video = "tests/fixtures/sample_video.mp4";
    let audio = "tests/fixtures/sample_audio_only.m4a";
    if !Path::new(video).exists() || !Path::new(audio).exists() {
        return;
    }

    let paths = [video, "missing.mp4", audio, video];
    let results = snapshot_many(
        &paths,
        (160, 90),
        Duration::from_secs(2),
        &SnapshotOptions::default(),
    );

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().expect("video").dimensions(), (160, 90));
    assert!(results[1].is_err());
    assert!(results[2].is_err());
    assert_eq!(results[0].as_ref().ok(), results[3].as_ref().ok());
}

#[test]
fn late_timestamp_falls_back_to_midpoint() {
    let video = "tests/fixtures/sample_video.mp4";
    if !Path::new(video).exists() {
        return;
    }

    let results = snapshot_many(
        &[video],
        (160, 90),
        Duration::from_secs(3600),
        &SnapshotOptions::default(),
    );
    let frame = results[0].as_ref().expect("midpoint frame");
    let timestamp = frame.timestamp().expect("timestamp");
    assert!(timestamp >= Duration::from_millis(2_000));
}
