//! Extract cover art in every mode.
//!
//! Usage:
//!   cargo run --example cover_art -- <input_file>

use std::error::Error;

use snapshotter::{CoverArtMode, SnapshotError, Snapshotter};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mkv".to_string());

    let mut snapshotter = Snapshotter::open(&input_path)?;
    if snapshotter.is_thumbnail_stream() {
        println!("{input_path} carries still pictures only");
    }

    for (name, mode) in [
        ("default", CoverArtMode::Default),
        ("thumbnail", CoverArtMode::Thumbnail),
        ("landscape", CoverArtMode::Landscape),
    ] {
        match snapshotter.cover_art_encoded(mode) {
            Ok(image) => {
                let filename = format!("cover_{name}.{}", image.format().extension());
                image.save(&filename)?;
                println!("Saved {filename} ({}, {} bytes)", image.mime_type(), image.len());
            }
            Err(SnapshotError::NoVisualStream) => {
                println!("No preview available for {input_path}");
                break;
            }
            Err(error) => return Err(error.into()),
        }
    }

    snapshotter.close();
    Ok(())
}
