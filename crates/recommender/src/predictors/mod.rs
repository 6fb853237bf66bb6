//! Predictor implementations.

mod baseline;
mod item_based;
mod matrix_factorization;
mod neighborhood;
mod user_based;

pub use baseline::GlobalMean;
pub use item_based::ItemBasedCF;
pub use matrix_factorization::{FactorModel, MatrixFactorization};
pub use neighborhood::DEFAULT_NEIGHBORS;
pub use user_based::UserBasedCF;
