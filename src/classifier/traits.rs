// Classifier trait: the swap-ready abstraction.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Probability that a text belongs to one category (e.g. "insult").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub probability: f64,
}

impl CategoryScore {
    pub fn new(category: impl Into<String>, probability: f64) -> Self {
        Self {
            category: category.into(),
            probability,
        }
    }
}

/// Trait for classifying text. Implementations must be async because
/// providers either call HTTP APIs or offload inference to a blocking pool.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Per-category probabilities for a single text.
    async fn classify(&self, text: &str) -> Result<Vec<CategoryScore>>;
}

/// Highest probability across categories, 0.0 when there are none.
pub fn max_probability(scores: &[CategoryScore]) -> f64 {
    scores
        .iter()
        .map(|s| s.probability)
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_probability_picks_highest() {
        let scores = vec![
            CategoryScore::new("insult", 0.4),
            CategoryScore::new("threat", 0.9),
            CategoryScore::new("toxicity", 0.7),
        ];
        assert!((max_probability(&scores) - 0.9).abs() < 1e-10);
    }

    #[test]
    fn test_max_probability_empty_is_zero() {
        assert_eq!(max_probability(&[]), 0.0);
    }
}
