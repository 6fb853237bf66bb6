//! Core record types handed to the recommendation engine.
//!
//! Everything here is plain data: ratings and movies are immutable once
//! parsed, and `Dataset` is just the pair of record collections.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

/// Genre vocabulary used by the MovieLens datasets.
pub const GENRES: [&str; 18] = [
    "Action",
    "Adventure",
    "Animation",
    "Children's",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Fantasy",
    "Film-Noir",
    "Horror",
    "Musical",
    "Mystery",
    "Romance",
    "Sci-Fi",
    "Thriller",
    "War",
    "Western",
];

// =============================================================================
// Records
// =============================================================================

/// A single explicit rating from a user for a movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value, expected in 1.0..=5.0
    pub rating: f32,
    /// Unix timestamp when rating was made
    pub timestamp: i64,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, rating: f32, timestamp: i64) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
            timestamp,
        }
    }
}

/// Reference data for one movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Genre names; a `BTreeSet` keeps display order stable
    pub genres: BTreeSet<String>,
}

impl Movie {
    pub fn new<I, S>(id: MovieId, title: impl Into<String>, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            title: title.into(),
            genres: genres.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Parsed ratings plus movie metadata, as handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub ratings: Vec<Rating>,
    pub movies: Vec<Movie>,
}

impl Dataset {
    pub fn new(ratings: Vec<Rating>, movies: Vec<Movie>) -> Self {
        Self { ratings, movies }
    }

    /// Number of (movies, ratings) records
    pub fn counts(&self) -> (usize, usize) {
        (self.movies.len(), self.ratings.len())
    }
}
