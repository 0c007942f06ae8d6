//! Typo-tolerant product ranking.
//!
//! Scores are additive per product:
//! - query is a substring of the name: +10
//! - otherwise, name prefix (query length) within 2 edits of the query: +5
//! - query is a substring of the description: +2
//! - per query word: some name word within threshold: +3, some description word: +1
//!
//! Products scoring 0 are dropped; the rest are sorted by score, highest first,
//! keeping input order among equal scores.

use super::levenshtein::edit_distance;
use super::types::{MatchResult, Product};

pub const NAME_SUBSTRING_SCORE: u32 = 10;
pub const NAME_PREFIX_FUZZY_SCORE: u32 = 5;
pub const DESCRIPTION_SUBSTRING_SCORE: u32 = 2;
pub const NAME_WORD_SCORE: u32 = 3;
pub const DESCRIPTION_WORD_SCORE: u32 = 1;

/// Maximum edits between the query and the name prefix for the prefix rule
pub const NAME_PREFIX_MAX_DISTANCE: usize = 2;

/// Query words longer than this tolerate two edits, shorter ones only one
const LONG_WORD_LEN: usize = 4;

/// Query after trimming and lower-casing, split into words once
struct NormalizedQuery {
    text: String,
    char_len: usize,
    words: Vec<String>,
}

impl NormalizedQuery {
    fn parse(query: &str) -> Option<Self> {
        let text = query.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }

        let words = text.split_whitespace().map(str::to_string).collect();
        let char_len = text.chars().count();

        Some(Self {
            text,
            char_len,
            words,
        })
    }
}

fn word_threshold(word: &str) -> usize {
    if word.chars().count() > LONG_WORD_LEN {
        2
    } else {
        1
    }
}

fn any_word_within(haystack: &str, word: &str, threshold: usize) -> bool {
    haystack
        .split_whitespace()
        .any(|candidate| edit_distance(candidate, word) <= threshold)
}

fn score_normalized(product: &Product, query: &NormalizedQuery) -> u32 {
    let name = product.name.to_lowercase();
    let description = product.description.to_lowercase();
    let mut score = 0;

    if name.contains(&query.text) {
        score += NAME_SUBSTRING_SCORE;
    } else {
        // Only the start of the name is compared, never the whole name
        let prefix: String = name.chars().take(query.char_len).collect();
        if edit_distance(&query.text, &prefix) <= NAME_PREFIX_MAX_DISTANCE {
            score += NAME_PREFIX_FUZZY_SCORE;
        }
    }

    if description.contains(&query.text) {
        score += DESCRIPTION_SUBSTRING_SCORE;
    }

    // Repeated query words each count
    for word in &query.words {
        let threshold = word_threshold(word);
        if any_word_within(&name, word, threshold) {
            score += NAME_WORD_SCORE;
        }
        if any_word_within(&description, word, threshold) {
            score += DESCRIPTION_WORD_SCORE;
        }
    }

    score
}

/// Relevance of a single product for `query`; 0 when nothing matches or the query is blank
pub fn score_product(product: &Product, query: &str) -> u32 {
    NormalizedQuery::parse(query)
        .map(|q| score_normalized(product, &q))
        .unwrap_or(0)
}

/// Matching products with their scores, best first
pub fn search_with_scores<'a>(products: &'a [Product], query: &str) -> Vec<MatchResult<'a>> {
    let Some(query) = NormalizedQuery::parse(query) else {
        return Vec::new();
    };

    let mut results: Vec<MatchResult<'a>> = products
        .iter()
        .filter_map(|product| {
            let score = score_normalized(product, &query);
            (score > 0).then_some(MatchResult { product, score })
        })
        .collect();

    // sort_by is stable: equal scores keep catalog order
    results.sort_by(|a, b| b.score.cmp(&a.score));
    results
}

/// Matching products, best first
pub fn search<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    search_with_scores(products, query)
        .into_iter()
        .map(|result| result.product)
        .collect()
}
