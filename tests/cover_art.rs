//! Cover-art integration tests.

use std::path::Path;

use snapshotter::{
    CoverArtMode, ImageFormat, SessionState, SnapshotError, SnapshotOptions, Snapshotter,
};

fn fixture(name: &str) -> Option<String> {
    let path = format!("tests/fixtures/{name}");
    Path::new(&path).exists().then_some(path)
}

#[test]
fn video_without_cover_uses_representative_frame() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    let frame = snapshotter
        .cover_art(CoverArtMode::Default)
        .expect("cover art");
    assert_eq!(frame.dimensions(), (1920, 1080));

    // 5 s clip: the 3 s floor is capped at the midpoint.
    let timestamp = frame.timestamp().expect("timestamp");
    assert!(timestamp.as_secs_f64() >= 2.5, "got {timestamp:?}");
    assert!(timestamp.as_secs_f64() < 3.5, "got {timestamp:?}");
}

#[test]
fn cover_art_modes_crop_derived_frame() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    let square = snapshotter
        .cover_art(CoverArtMode::Thumbnail)
        .expect("thumbnail");
    assert_eq!(square.dimensions(), (1080, 1080));

    let wide = snapshotter
        .cover_art(CoverArtMode::Landscape)
        .expect("landscape");
    assert_eq!(wide.dimensions(), (1920, 1080));
}

#[test]
fn encoded_cover_of_derived_frame_uses_configured_format() {
    let Some(path) = fixture("sample_video.mp4") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    let jpeg = snapshotter
        .cover_art_encoded(CoverArtMode::Default)
        .expect("jpeg cover");
    assert_eq!(jpeg.format(), ImageFormat::Jpeg);
    assert!(jpeg.as_bytes().starts_with(&[0xFF, 0xD8, 0xFF]));

    let options = SnapshotOptions::new().with_cover_art_format(ImageFormat::Png);
    let mut snapshotter = Snapshotter::open_with_options(&path, &options).expect("open");
    let png = snapshotter
        .cover_art_encoded(CoverArtMode::Thumbnail)
        .expect("png cover");
    assert_eq!(png.format(), ImageFormat::Png);
    let decoded = image::load_from_memory(png.as_bytes()).expect("valid png");
    assert_eq!((decoded.width(), decoded.height()), (1080, 1080));
}

#[test]
fn audio_cover_is_decoded() {
    let Some(path) = fixture("sample_audio_cover.mp3") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    let frame = snapshotter
        .cover_art(CoverArtMode::Default)
        .expect("cover art");
    assert_eq!(frame.dimensions(), (500, 500));
}

#[test]
fn embedded_jpeg_is_passed_through() {
    let Some(path) = fixture("sample_audio_cover.mp3") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    let encoded = snapshotter
        .cover_art_encoded(CoverArtMode::Default)
        .expect("encoded cover");
    assert_eq!(encoded.format(), ImageFormat::Jpeg);

    let options = SnapshotOptions::new()
        .with_pass_through_embedded(false)
        .with_cover_art_format(ImageFormat::Png);
    let mut snapshotter = Snapshotter::open_with_options(&path, &options).expect("open");
    let reencoded = snapshotter
        .cover_art_encoded(CoverArtMode::Default)
        .expect("re-encoded cover");
    assert_eq!(reencoded.format(), ImageFormat::Png);
    let decoded = image::load_from_memory(reencoded.as_bytes()).expect("valid png");
    assert_eq!((decoded.width(), decoded.height()), (500, 500));
}

#[test]
fn matroska_cover_names_follow_mode() {
    let Some(path) = fixture("sample_covers.mkv") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    assert!(!snapshotter.is_thumbnail_stream());
    assert_eq!(snapshotter.display_size(), (640, 360));

    let portrait = snapshotter
        .cover_art(CoverArtMode::Default)
        .expect("cover");
    assert_eq!(portrait.dimensions(), (600, 900));

    let small = snapshotter
        .cover_art(CoverArtMode::Thumbnail)
        .expect("small cover");
    assert_eq!(small.dimensions(), (120, 120));

    let landscape = snapshotter
        .cover_art(CoverArtMode::Landscape)
        .expect("landscape cover");
    assert_eq!(landscape.dimensions(), (1280, 720));

    // Reading the covers leaves the motion video decodable.
    let frame = snapshotter
        .snapshot((320, 180), std::time::Duration::from_secs(1))
        .expect("snapshot after covers");
    assert_eq!(frame.dimensions(), (320, 180));
}

#[test]
fn matroska_cover_does_not_allocate_a_decoder() {
    let Some(path) = fixture("sample_covers.mkv") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    for mode in [
        CoverArtMode::Default,
        CoverArtMode::Thumbnail,
        CoverArtMode::Landscape,
    ] {
        snapshotter.cover_art(mode).expect("cover");
        assert_eq!(snapshotter.state(), SessionState::Open);
    }

    snapshotter
        .snapshot((64, 36), std::time::Duration::ZERO)
        .expect("snapshot");
    assert_eq!(snapshotter.state(), SessionState::DecoderReady);
}

#[test]
fn unreadable_cover_falls_back_to_video_frame() {
    let Some(path) = fixture("sample_broken_cover.mkv") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    let cover = snapshotter
        .cover_art(CoverArtMode::Default)
        .expect("cover from video");
    assert_eq!(cover.dimensions(), (640, 360));
    assert!(cover.timestamp().is_some());

    let encoded = snapshotter
        .cover_art_encoded(CoverArtMode::Default)
        .expect("encoded cover from video");
    assert_eq!(encoded.format(), ImageFormat::Jpeg);
}

#[test]
fn still_sequence_cover_is_first_picture() {
    let Some(path) = fixture("sample_stills.mkv") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    let cover = snapshotter
        .cover_art(CoverArtMode::Default)
        .expect("cover art");
    assert_eq!(cover.dimensions(), (320, 180));

    let first = snapshotter
        .snapshot((320, 180), std::time::Duration::ZERO)
        .expect("first picture");
    assert_eq!(cover.data(), first.data());
}

#[test]
fn audio_only_cover_art_fails() {
    let Some(path) = fixture("sample_audio_only.m4a") else {
        return;
    };

    let mut snapshotter = Snapshotter::open(&path).expect("open");
    for mode in [
        CoverArtMode::Default,
        CoverArtMode::Thumbnail,
        CoverArtMode::Landscape,
    ] {
        let error = snapshotter.cover_art(mode).expect_err("no cover");
        assert!(matches!(error, SnapshotError::NoVisualStream));
        assert!(error.is_unavailable());
        assert!(matches!(
            snapshotter.cover_art_encoded(mode),
            Err(SnapshotError::NoVisualStream)
        ));
    }
}
