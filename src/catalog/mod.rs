//! Product catalog: typo-tolerant ranking over a product list fetched in bulk.
//!
//! Ranking is pure and synchronous (`search`); fetching lives in `client`.

pub mod client;
pub mod levenshtein;
pub mod search;
pub mod types;

pub use client::CatalogClient;
pub use levenshtein::{edit_distance, levenshtein};
pub use search::{score_product, search, search_with_scores};
pub use types::{MatchResult, Product, ProductId};
