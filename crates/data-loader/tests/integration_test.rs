//! Integration tests for dataset loading.
//!
//! These write small MovieLens directories to a temp location and load them
//! through the public API.

use data_loader::sample::{self, SampleConfig};
use data_loader::{DataLoadError, Dataset, Rating};
use std::fs;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_load_csv_layout() {
    let dir = temp_dir("data-loader-csv");
    fs::write(
        dir.join("ratings.csv"),
        "userId,movieId,rating,timestamp\n1,1,4.0,964982703\n1,50,5.0,964982931\n2,1,3.5,1445714835\n",
    )
    .unwrap();
    fs::write(
        dir.join("movies.csv"),
        "movieId,title,genres\n1,Toy Story (1995),Adventure|Animation|Children|Comedy|Fantasy\n\
         50,\"Usual Suspects, The (1995)\",Crime|Mystery|Thriller\n",
    )
    .unwrap();

    let dataset = Dataset::load_from_dir(&dir).unwrap();
    assert_eq!(dataset.counts(), (2, 3));
    assert_eq!(dataset.ratings[2], Rating::new(2, 1, 3.5, 1445714835));
    assert_eq!(dataset.movies[1].title, "Usual Suspects, The (1995)");
    assert!(dataset.movies[1].genres.contains("Crime"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_dat_layout_preferred_over_csv() {
    let dir = temp_dir("data-loader-both");
    fs::write(dir.join("ratings.dat"), "7::3::2::978300760\n").unwrap();
    fs::write(dir.join("movies.dat"), "3::Grumpier Old Men (1995)::Comedy|Romance\n").unwrap();
    fs::write(dir.join("ratings.csv"), "userId,movieId,rating,timestamp\n").unwrap();
    fs::write(dir.join("movies.csv"), "movieId,title,genres\n").unwrap();

    let dataset = Dataset::load_from_dir(&dir).unwrap();
    assert_eq!(dataset.ratings, vec![Rating::new(7, 3, 2.0, 978300760)]);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_malformed_csv_row() {
    let dir = temp_dir("data-loader-bad-csv");
    fs::write(dir.join("ratings.csv"), "userId,movieId,rating,timestamp\n1,x,4.0,1\n").unwrap();
    fs::write(dir.join("movies.csv"), "movieId,title,genres\n").unwrap();

    let err = Dataset::load_from_dir(&dir).unwrap_err();
    assert!(matches!(err, DataLoadError::Csv(_)));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_sample_movies_cover_ratings() {
    let dataset = sample::generate(&SampleConfig::default());
    let (movies, ratings) = dataset.counts();
    assert_eq!(movies, 80);
    assert_eq!(ratings, 120 * 20);
    assert!(
        dataset
            .ratings
            .iter()
            .all(|r| dataset.movies.iter().any(|m| m.id == r.movie_id))
    );
    assert!(dataset.movies.iter().all(|m| (1..=3).contains(&m.genres.len())));
}
