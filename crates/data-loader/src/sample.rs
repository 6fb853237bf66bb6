//! Seeded synthetic MovieLens-style data.
//!
//! Every user gets a taste value per genre and every movie a quality bias;
//! ratings are `3 + bias + 1.5 * taste(movie genres) + noise`, rounded to
//! whole stars. That leaves real structure for collaborative filtering to
//! find while staying fully reproducible for a given seed.

use crate::types::{Dataset, GENRES, Movie, MovieId, Rating, UserId};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Shape of the generated dataset
#[derive(Debug, Clone, Copy)]
pub struct SampleConfig {
    pub users: usize,
    pub movies: usize,
    /// Capped at `movies`
    pub ratings_per_user: usize,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            users: 120,
            movies: 80,
            ratings_per_user: 20,
            seed: 42,
        }
    }
}

impl SampleConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Generate a dataset; identical configs always yield identical records.
pub fn generate(config: &SampleConfig) -> Dataset {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut movies = Vec::with_capacity(config.movies);
    let mut movie_genres: Vec<Vec<usize>> = Vec::with_capacity(config.movies);
    let mut movie_bias: Vec<f64> = Vec::with_capacity(config.movies);
    for m in 0..config.movies {
        let genre_count = rng.random_range(1..=3);
        let genres = index::sample(&mut rng, GENRES.len(), genre_count).into_vec();
        let id = (m + 1) as MovieId;
        let year = 1970 + (m % 50);
        movies.push(Movie::new(
            id,
            format!("Sample Movie {} ({})", id, year),
            genres.iter().map(|&g| GENRES[g]),
        ));
        movie_genres.push(genres);
        movie_bias.push(rng.random_range(-0.75..0.75));
    }

    let per_user = config.ratings_per_user.min(config.movies);
    let mut ratings = Vec::with_capacity(config.users * per_user);
    let mut timestamp: i64 = 978_300_000;
    for u in 0..config.users {
        let taste: Vec<f64> = (0..GENRES.len())
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();
        for m in index::sample(&mut rng, config.movies, per_user) {
            let genres = &movie_genres[m];
            let affinity = genres.iter().map(|&g| taste[g]).sum::<f64>() / genres.len() as f64;
            let noise = rng.random_range(-0.5..0.5);
            let value = (3.0 + movie_bias[m] + 1.5 * affinity + noise)
                .round()
                .clamp(1.0, 5.0);
            ratings.push(Rating::new(
                (u + 1) as UserId,
                (m + 1) as MovieId,
                value as f32,
                timestamp,
            ));
            timestamp += 1;
        }
    }

    debug!(
        users = config.users,
        movies = movies.len(),
        ratings = ratings.len(),
        "Generated sample dataset"
    );
    Dataset::new(ratings, movies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_shape() {
        let config = SampleConfig {
            users: 10,
            movies: 8,
            ratings_per_user: 5,
            seed: 7,
        };
        let dataset = generate(&config);

        assert_eq!(dataset.movies.len(), 8);
        assert_eq!(dataset.ratings.len(), 50);
        assert!(dataset.ratings.iter().all(|r| (1.0..=5.0).contains(&r.rating)));

        let pairs: HashSet<(UserId, MovieId)> = dataset
            .ratings
            .iter()
            .map(|r| (r.user_id, r.movie_id))
            .collect();
        assert_eq!(pairs.len(), 50, "no user rates a movie twice");
    }

    #[test]
    fn test_generate_is_deterministic() {
        let config = SampleConfig::default().with_seed(3);
        assert_eq!(generate(&config).ratings, generate(&config).ratings);
        assert_ne!(
            generate(&config).ratings,
            generate(&config.with_seed(4)).ratings
        );
    }

    #[test]
    fn test_ratings_per_user_capped() {
        let config = SampleConfig {
            users: 2,
            movies: 3,
            ratings_per_user: 10,
            seed: 1,
        };
        assert_eq!(generate(&config).ratings.len(), 6);
    }
}
