//! Write PNG snapshots at a few positions of a media file.
//!
//! Usage:
//!   cargo run --example snapshot_png -- <input_file> [WIDTHxHEIGHT]

use std::error::Error;
use std::time::Duration;

use snapshotter::Snapshotter;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut arguments = std::env::args().skip(1);
    let input_path = arguments
        .next()
        .unwrap_or_else(|| "input.mp4".to_string());
    let size = arguments
        .next()
        .and_then(|value| {
            let (width, height) = value.split_once('x')?;
            Some((width.parse().ok()?, height.parse().ok()?))
        })
        .unwrap_or((320, 180));

    println!("Opening {input_path}...");
    let mut snapshotter = Snapshotter::open(&input_path)?;
    let (width, height) = snapshotter.display_size();
    println!(
        "{}: {}x{}, {} s, {} audio channels",
        snapshotter.title(),
        width,
        height,
        snapshotter.duration(),
        snapshotter.channels()
    );

    let duration = snapshotter.duration_exact();
    for (index, fraction) in [0.1, 0.5, 0.9].into_iter().enumerate() {
        let at = duration.mul_f64(fraction);
        let image = snapshotter.snapshot_png(size, at)?;
        let filename = format!("snapshot_{index}.png");
        image.save(&filename)?;
        println!("Saved {filename} ({:?}, {} bytes)", at, image.len());
    }

    // Past the end is a seek error, not a decode error.
    match snapshotter.snapshot(size, duration + Duration::from_secs(1)) {
        Ok(_) => println!("Unexpected frame past the end"),
        Err(error) => println!("Past the end: {error}"),
    }

    Ok(())
}
