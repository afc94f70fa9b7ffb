//! Benchmarks for snapshot, cover-art and encoding operations.
//!
//! Run with: cargo bench
//! Run with all features: cargo bench --all-features
//!
//! Requires fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::{path::Path, time::Duration};

use criterion::Criterion;
use snapshotter::{
    CoverArtMode, FfmpegLogLevel, ImageFormat, ScalingQuality, SnapshotOptions, Snapshotter,
    encode, set_ffmpeg_log_level,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";
const SAMPLE_AUDIO_COVER: &str = "tests/fixtures/sample_audio_cover.mp3";

fn benchmark_snapshot(criterion: &mut Criterion) {
    set_ffmpeg_log_level(FfmpegLogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    criterion.bench_function("open + snapshot (cold decoder)", |bencher| {
        bencher.iter(|| {
            let mut snapshotter = Snapshotter::open(SAMPLE_VIDEO).unwrap();
            let _frame = snapshotter
                .snapshot((320, 180), Duration::from_secs(2))
                .unwrap();
        });
    });

    let mut snapshotter = Snapshotter::open(SAMPLE_VIDEO).unwrap();
    criterion.bench_function("snapshot (cached decoder)", |bencher| {
        bencher.iter(|| {
            let _frame = snapshotter
                .snapshot((320, 180), Duration::from_millis(2_500))
                .unwrap();
        });
    });
}

fn benchmark_scaling_quality(criterion: &mut Criterion) {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let mut group = criterion.benchmark_group("scaling quality");
    for (name, quality) in [
        ("fast", ScalingQuality::Fast),
        ("balanced", ScalingQuality::Balanced),
        ("best", ScalingQuality::Best),
    ] {
        let options = SnapshotOptions::new().with_scaling(quality);
        let mut snapshotter = Snapshotter::open_with_options(SAMPLE_VIDEO, &options).unwrap();
        group.bench_function(name, |bencher| {
            bencher.iter(|| {
                let _frame = snapshotter
                    .snapshot((640, 360), Duration::from_secs(1))
                    .unwrap();
            });
        });
    }
    group.finish();
}

fn benchmark_cover_art(criterion: &mut Criterion) {
    if Path::new(SAMPLE_VIDEO).exists() {
        criterion.bench_function("cover art (representative frame)", |bencher| {
            bencher.iter(|| {
                let mut snapshotter = Snapshotter::open(SAMPLE_VIDEO).unwrap();
                let _cover = snapshotter.cover_art(CoverArtMode::Thumbnail).unwrap();
            });
        });
    }

    if Path::new(SAMPLE_AUDIO_COVER).exists() {
        criterion.bench_function("cover art (embedded pass-through)", |bencher| {
            bencher.iter(|| {
                let mut snapshotter = Snapshotter::open(SAMPLE_AUDIO_COVER).unwrap();
                let _cover = snapshotter
                    .cover_art_encoded(CoverArtMode::Default)
                    .unwrap();
            });
        });
    }
}

fn benchmark_encoding(criterion: &mut Criterion) {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let mut snapshotter = Snapshotter::open(SAMPLE_VIDEO).unwrap();
    let frame = snapshotter
        .snapshot((1280, 720), Duration::from_secs(1))
        .unwrap();

    let mut group = criterion.benchmark_group("encode 1280x720");
    group.bench_function("png", |bencher| {
        bencher.iter(|| encode(&frame, ImageFormat::Png, 90).unwrap());
    });
    group.bench_function("jpeg q90", |bencher| {
        bencher.iter(|| encode(&frame, ImageFormat::Jpeg, 90).unwrap());
    });
    group.finish();
}

#[cfg(feature = "rayon")]
fn benchmark_parallel(criterion: &mut Criterion) {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let paths = [SAMPLE_VIDEO; 8];
    let options = SnapshotOptions::default();
    criterion.bench_function("snapshot_many 8 sources", |bencher| {
        bencher.iter(|| {
            let _results =
                snapshotter::snapshot_many(&paths, (320, 180), Duration::from_secs(2), &options);
        });
    });
}

#[cfg(not(feature = "rayon"))]
fn benchmark_parallel(_criterion: &mut Criterion) {}

criterion::criterion_group!(
    benches,
    benchmark_snapshot,
    benchmark_scaling_quality,
    benchmark_cover_art,
    benchmark_encoding,
    benchmark_parallel,
);
criterion::criterion_main!(benches);
