//! Benchmarks for similarity, fitting and recommendation
//!
//! Run with: cargo bench --package recommender
//!
//! Uses the seeded synthetic sample, so no dataset download is needed.

use criterion::{Criterion, criterion_group, criterion_main};
use data_loader::sample::{self, SampleConfig};
use recommender::{
    Algorithm, Axis, EngineConfig, MovieCatalog, Predictor, RatingStore, RecommendationService,
    pairwise_cosine,
};
use std::hint::black_box;

fn load_sample() -> (RatingStore, data_loader::Dataset) {
    let dataset = sample::generate(&SampleConfig {
        users: 400,
        movies: 200,
        ratings_per_user: 40,
        seed: 42,
    });
    let store = RatingStore::build(&dataset.ratings).expect("Failed to build rating store");
    (store, dataset)
}

fn bench_similarity(c: &mut Criterion) {
    let (store, _) = load_sample();

    c.bench_function("cosine_users", |b| {
        b.iter(|| black_box(pairwise_cosine(black_box(store.matrix()), Axis::Rows)))
    });
    c.bench_function("cosine_items", |b| {
        b.iter(|| black_box(pairwise_cosine(black_box(store.matrix()), Axis::Cols)))
    });
}

fn bench_fit(c: &mut Criterion) {
    let (store, _) = load_sample();
    let config = EngineConfig::default();

    for algorithm in [
        Algorithm::UserBased,
        Algorithm::ItemBased,
        Algorithm::MatrixFactorization,
    ] {
        c.bench_function(&format!("fit_{}", algorithm), |b| {
            b.iter(|| {
                let mut predictor = config.build_predictor(algorithm);
                predictor.fit(black_box(store.matrix())).unwrap();
                black_box(predictor)
            })
        });
    }
}

fn bench_recommend(c: &mut Criterion) {
    let (store, dataset) = load_sample();
    let mut predictor = EngineConfig::default().build_predictor(Algorithm::ItemBased);
    predictor.fit(store.matrix()).expect("Failed to fit predictor");
    let service = RecommendationService::new(store, MovieCatalog::new(&dataset.movies));

    c.bench_function("recommend_top_10", |b| {
        b.iter(|| {
            let recs = service.recommend(black_box(1), predictor.as_ref(), 10).unwrap();
            black_box(recs)
        })
    });
}

criterion_group!(benches, bench_similarity, bench_fit, bench_recommend);
criterion_main!(benches);
