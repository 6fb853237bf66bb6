use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::sample::{self, SampleConfig};
use data_loader::{Dataset, MovieId, UserId};
use recommender::{
    Algorithm, ComparisonRow, EngineConfig, MovieCatalog, Predictor, RankingReport, RatingStore,
    Recommendation, RecommendationService, SimilarMovie,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// movie-recs - Collaborative filtering movie recommender
#[derive(Parser)]
#[command(name = "movie-recs")]
#[command(about = "Movie recommendations with user/item CF and matrix factorization", long_about = None)]
struct Cli {
    /// MovieLens directory (ratings/movies as .dat or .csv); a synthetic
    /// sample is generated when omitted
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON engine config; missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Random seed for splitting, SVD and the synthetic sample
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Neighborhood size K for user/item CF
    #[arg(long, global = true)]
    neighbors: Option<usize>,

    /// Rank of the matrix factorization
    #[arg(long, global = true)]
    factors: Option<usize>,

    /// Fraction of ratings held out for evaluation
    #[arg(long, global = true)]
    test_fraction: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show user, movie and rating counts and sparsity
    Stats,

    /// Split, fit every algorithm and compare accuracy on the held-out ratings
    Evaluate {
        /// Also compute precision/recall/NDCG at K
        #[arg(long)]
        ranking: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Get movie recommendations for a user
    Recommend {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: UserId,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        limit: usize,

        /// user-based, item-based, matrix-factorization or global-mean
        #[arg(long, default_value = "item-based")]
        algorithm: Algorithm,
    },

    /// List the movies most similar to a movie
    Similar {
        /// Movie ID to find neighbors for
        #[arg(long)]
        movie_id: MovieId,

        /// Number of movies to return
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let dataset = load_dataset(cli.data_dir.as_deref(), config.seed)?;

    let start = Instant::now();
    let store = RatingStore::build(&dataset.ratings).context("Failed to build rating matrix")?;
    println!(
        "{} Built rating matrix in {:?}",
        "✓".green(),
        start.elapsed()
    );

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Stats => handle_stats(&store, &dataset),
        Commands::Evaluate { ranking, json } => handle_evaluate(&config, &store, ranking, json)?,
        Commands::Recommend {
            user_id,
            limit,
            algorithm,
        } => handle_recommend(&config, store, &dataset, user_id, limit, algorithm)?,
        Commands::Similar { movie_id, limit } => {
            handle_similar(store, &dataset, movie_id, limit)?
        }
    }

    Ok(())
}

/// Config file (if any) with command-line overrides applied
fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(neighbors) = cli.neighbors {
        config.neighbors = neighbors;
    }
    if let Some(factors) = cli.factors {
        config.n_factors = factors;
    }
    if let Some(fraction) = cli.test_fraction {
        config.test_fraction = fraction;
    }
    config.validate().context("Invalid configuration")?;
    info!(?config, "Engine configuration");
    Ok(config)
}

fn load_dataset(data_dir: Option<&Path>, seed: u64) -> Result<Dataset> {
    let start = Instant::now();
    let dataset = match data_dir {
        Some(dir) => {
            println!("Loading MovieLens dataset from {}...", dir.display());
            Dataset::load_from_dir(dir).context("Failed to load MovieLens dataset")?
        }
        None => {
            println!(
                "{}",
                "No --data-dir given, using the synthetic sample dataset".yellow()
            );
            sample::generate(&SampleConfig::default().with_seed(seed))
        }
    };
    let (movies, ratings) = dataset.counts();
    println!(
        "{} Loaded {} ratings and {} movies in {:?}",
        "✓".green(),
        ratings,
        movies,
        start.elapsed()
    );
    Ok(dataset)
}

/// Handle the 'stats' command
fn handle_stats(store: &RatingStore, dataset: &Dataset) {
    let summary = store.summary();
    let mean = store.matrix().global_mean().unwrap_or(0.0);

    println!("{}", "Dataset statistics:".bold().blue());
    println!("{}Users: {}", "• ".green(), summary.users);
    println!("{}Movies rated: {}", "• ".green(), summary.movies);
    println!("{}Movies in catalog: {}", "• ".green(), dataset.movies.len());
    println!("{}Ratings: {}", "• ".green(), summary.ratings);
    println!("{}Sparsity: {:.4}", "• ".cyan(), summary.sparsity);
    println!("{}Mean rating: {:.3}", "• ".cyan(), mean);
}

#[derive(Serialize)]
struct EvaluationOutput<'a> {
    config: &'a EngineConfig,
    train: usize,
    test: usize,
    comparison: Vec<ComparisonRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ranking: Option<Vec<(String, RankingReport)>>,
}

/// Handle the 'evaluate' command
fn handle_evaluate(
    config: &EngineConfig,
    store: &RatingStore,
    ranking: bool,
    json: bool,
) -> Result<()> {
    let split = config
        .splitter()?
        .split(store.ratings())
        .context("Failed to split ratings")?;
    let train = store
        .matrix_from(&split.train)
        .context("Failed to build train matrix")?;

    let evaluator = config.evaluator();
    let mut predictors = config.build_all();
    let comparison = evaluator
        .compare(&mut predictors, &train, &split.test)
        .context("Failed to compare predictors")?;

    let ranking = if ranking {
        let mut reports = Vec::with_capacity(predictors.len());
        for predictor in &predictors {
            let report = evaluator
                .ranking(predictor.as_ref(), &split.test)
                .with_context(|| format!("Failed to rank with {}", predictor.name()))?;
            reports.push((predictor.name().to_string(), report));
        }
        Some(reports)
    } else {
        None
    };

    let output = EvaluationOutput {
        config,
        train: split.train.len(),
        test: split.test.len(),
        comparison,
        ranking,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_evaluation(&output);
    }
    Ok(())
}

fn print_evaluation(output: &EvaluationOutput<'_>) {
    println!(
        "{}",
        format!(
            "Evaluation on {} test ratings ({} train):",
            output.test, output.train
        )
        .bold()
        .blue()
    );
    println!(
        "{:<22} {:>8} {:>8} {:>9} {:>8} {:>9}",
        "algorithm", "rmse", "mae", "evaluated", "skipped", "fit (ms)"
    );
    let best = output
        .comparison
        .iter()
        .map(|row| row.rmse)
        .fold(f64::INFINITY, f64::min);
    for row in &output.comparison {
        let name = if row.rmse == best {
            row.algorithm.green().bold()
        } else {
            row.algorithm.normal()
        };
        println!(
            "{:<22} {:>8.4} {:>8.4} {:>9} {:>8} {:>9}",
            name, row.rmse, row.mae, row.evaluated, row.skipped, row.fit_millis
        );
    }

    if let Some(reports) = &output.ranking {
        println!();
        let k = output.config.ranking_k;
        println!(
            "{}",
            format!(
                "Ranking at K = {} (relevant: rating >= {}):",
                k, output.config.relevance_threshold
            )
            .bold()
            .blue()
        );
        println!(
            "{:<22} {:>12} {:>12} {:>12} {:>6}",
            "algorithm",
            format!("precision@{}", k),
            format!("recall@{}", k),
            format!("ndcg@{}", k),
            "users"
        );
        for (name, report) in reports {
            println!(
                "{:<22} {:>12.4} {:>12.4} {:>12.4} {:>6}",
                name, report.precision_at_k, report.recall_at_k, report.ndcg_at_k, report.users
            );
        }
    }
}

/// Handle the 'recommend' command
fn handle_recommend(
    config: &EngineConfig,
    store: RatingStore,
    dataset: &Dataset,
    user_id: UserId,
    limit: usize,
    algorithm: Algorithm,
) -> Result<()> {
    if store.matrix().user_index(user_id).is_none() {
        return Err(anyhow!("User {} not found", user_id));
    }

    let start = Instant::now();
    let mut predictor = config.build_predictor(algorithm);
    predictor
        .fit(store.matrix())
        .with_context(|| format!("Failed to fit {}", algorithm))?;
    println!("{} Fitted {} in {:?}", "✓".green(), algorithm, start.elapsed());

    let service = RecommendationService::new(store, MovieCatalog::new(&dataset.movies));
    let recommendations = service.recommend(user_id, predictor.as_ref(), limit)?;
    print_recommendations(user_id, algorithm, &recommendations);
    Ok(())
}

/// Handle the 'similar' command
fn handle_similar(
    store: RatingStore,
    dataset: &Dataset,
    movie_id: MovieId,
    limit: usize,
) -> Result<()> {
    let service = RecommendationService::new(store, MovieCatalog::new(&dataset.movies));
    let title = service
        .catalog()
        .get(movie_id)
        .map(|m| m.title.clone())
        .unwrap_or_else(|| format!("movie {}", movie_id));
    let similar = service
        .similar_items(movie_id, limit)
        .map_err(|_| anyhow!("Movie {} has no ratings", movie_id))?;
    print_similar(&title, &similar);
    Ok(())
}

fn print_recommendations(user_id: UserId, algorithm: Algorithm, recommendations: &[Recommendation]) {
    println!(
        "{}",
        format!("Recommendations for user {} ({}):", user_id, algorithm)
            .bold()
            .blue()
    );
    if recommendations.is_empty() {
        println!("  {}", "Nothing left to recommend".yellow());
    }
    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} [{}] - Predicted: {:.2}",
            (rank + 1).to_string().green(),
            rec.title,
            rec.genres.join(", "),
            rec.predicted_rating
        );
    }
}

fn print_similar(title: &str, similar: &[SimilarMovie]) {
    println!("{}", format!("Movies similar to {}:", title).bold().blue());
    if similar.is_empty() {
        println!("  {}", "No movie shares a rater with it".yellow());
    }
    for (rank, movie) in similar.iter().enumerate() {
        println!(
            "{}. {} (id {}) - Similarity: {:.3}",
            (rank + 1).to_string().green(),
            movie.title,
            movie.movie_id,
            movie.similarity
        );
    }
}
