//! Time loading a MovieLens directory.
//!
//! Run with: cargo run --release -p data-loader --example load_dataset -- data/ml-1m

use data_loader::Dataset;
use std::path::PathBuf;
use std::time::Instant;

fn main() -> data_loader::Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/ml-1m"));

    let start = Instant::now();
    let dataset = Dataset::load_from_dir(&data_dir)?;
    let elapsed = start.elapsed();
    let (movies, ratings) = dataset.counts();

    println!("Time taken: {:?}", elapsed);
    println!("Movies: {}", movies);
    println!("Ratings: {}", ratings);
    println!(
        "Performance: {:.0} ratings/second",
        ratings as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
