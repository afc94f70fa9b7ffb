//! Take one snapshot from each of many files in parallel.
//!
//! Usage:
//!   cargo run --example batch --features rayon -- <file>...

use std::error::Error;
use std::time::Duration;

use snapshotter::{ImageFormat, SnapshotOptions, encode, snapshot_many};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: batch <file>...");
        return Ok(());
    }

    let results = snapshot_many(
        &paths,
        (256, 256),
        Duration::from_secs(10),
        &SnapshotOptions::default(),
    );

    for (index, (path, result)) in paths.iter().zip(results).enumerate() {
        match result {
            Ok(frame) => {
                let filename = format!("batch_{index}.jpg");
                encode(&frame, ImageFormat::Jpeg, 85)?.save(&filename)?;
                println!("{path}: {}x{} -> {filename}", frame.width(), frame.height());
            }
            Err(error) => println!("{path}: no preview ({error})"),
        }
    }

    Ok(())
}
