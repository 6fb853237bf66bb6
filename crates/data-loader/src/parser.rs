//! Parsers for the two MovieLens file layouts.
//!
//! - `ratings.dat` / `movies.dat` (ML-1M): `::`-separated, ISO-8859-1 encoded
//!   - `userId::movieId::rating::timestamp`
//!   - `movieId::title::Genre|Genre`
//! - `ratings.csv` / `movies.csv` (ml-latest): headered CSV, quoted titles
//!
//! The `*_dat` and `*_csv` functions work on in-memory text or any reader;
//! `parse_ratings` / `parse_movies` pick one by file extension.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Genre string MovieLens uses for movies without genres
const NO_GENRES: &str = "(no genres listed)";

/// Read a whole file as ISO-8859-1 (Latin-1).
///
/// Every Latin-1 byte maps directly onto the Unicode code point of the same value.
fn read_latin1(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes.iter().map(|&b| b as char).collect())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Pull the next `::` field or report which one was missing
fn next_field<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    file: &str,
    line: usize,
    name: &str,
) -> Result<&'a str> {
    parts.next().ok_or_else(|| DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: format!("Missing {}", name),
    })
}

fn parse_number<T>(raw: &str, file: &str, line: usize, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: format!("Invalid {}: {}", name, e),
    })
}

/// Ratings must at least be finite numbers; range checks belong to the engine
fn check_rating(rating: f32) -> Result<f32> {
    if rating.is_finite() {
        Ok(rating)
    } else {
        Err(DataLoadError::InvalidValue {
            field: "rating".to_string(),
            value: rating.to_string(),
        })
    }
}

/// Split a `|`-separated genre list into a set
fn parse_genres(s: &str) -> BTreeSet<String> {
    s.split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty() && *g != NO_GENRES)
        .map(str::to_string)
        .collect()
}

/// Parse `ratings.dat` content: `userId::movieId::rating::timestamp`
pub fn parse_ratings_dat(content: &str) -> Result<Vec<Rating>> {
    const FILE: &str = "ratings.dat";
    let mut ratings = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split("::");
        let user_id = next_field(&mut parts, FILE, line_no, "userId")?;
        let movie_id = next_field(&mut parts, FILE, line_no, "movieId")?;
        let rating = next_field(&mut parts, FILE, line_no, "rating")?;
        let timestamp = next_field(&mut parts, FILE, line_no, "timestamp")?;

        ratings.push(Rating {
            user_id: parse_number(user_id, FILE, line_no, "userId")?,
            movie_id: parse_number(movie_id, FILE, line_no, "movieId")?,
            rating: check_rating(parse_number(rating, FILE, line_no, "rating")?)?,
            timestamp: parse_number(timestamp, FILE, line_no, "timestamp")?,
        });
    }
    Ok(ratings)
}

/// Parse `movies.dat` content: `movieId::title::genres`
pub fn parse_movies_dat(content: &str) -> Result<Vec<Movie>> {
    const FILE: &str = "movies.dat";
    let mut movies = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split("::");
        let movie_id = next_field(&mut parts, FILE, line_no, "movieId")?;
        let title = next_field(&mut parts, FILE, line_no, "title")?;
        let genres = next_field(&mut parts, FILE, line_no, "genres")?;

        movies.push(Movie {
            id: parse_number(movie_id, FILE, line_no, "movieId")?,
            title: title.to_string(),
            genres: parse_genres(genres),
        });
    }
    Ok(movies)
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    #[serde(rename = "userId")]
    user_id: UserId,
    #[serde(rename = "movieId")]
    movie_id: MovieId,
    rating: f32,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct MovieRow {
    #[serde(rename = "movieId")]
    movie_id: MovieId,
    title: String,
    genres: String,
}

/// Parse headered `ratings.csv` (`userId,movieId,rating,timestamp`)
pub fn parse_ratings_csv<R: Read>(reader: R) -> Result<Vec<Rating>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut ratings = Vec::new();
    for row in csv_reader.deserialize() {
        let row: RatingRow = row?;
        ratings.push(Rating {
            user_id: row.user_id,
            movie_id: row.movie_id,
            rating: check_rating(row.rating)?,
            timestamp: row.timestamp,
        });
    }
    Ok(ratings)
}

/// Parse headered `movies.csv` (`movieId,title,genres`)
pub fn parse_movies_csv<R: Read>(reader: R) -> Result<Vec<Movie>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut movies = Vec::new();
    for row in csv_reader.deserialize() {
        let row: MovieRow = row?;
        movies.push(Movie {
            id: row.movie_id,
            title: row.title,
            genres: parse_genres(&row.genres),
        });
    }
    Ok(movies)
}

/// Parse a ratings file, choosing the layout by extension
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    if is_csv(path) {
        parse_ratings_csv(File::open(path)?)
    } else {
        parse_ratings_dat(&read_latin1(path)?)
    }
}

/// Parse a movies file, choosing the layout by extension
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    if is_csv(path) {
        parse_movies_csv(File::open(path)?)
    } else {
        parse_movies_dat(&read_latin1(path)?)
    }
}
