// Google Perspective API classifier.
//
// Perspective analyzes text for toxicity, identity attacks, insults, etc.
// It's free to use but rate-limited to ~1 QPS, and it is being sunset at the
// end of 2026; it stays behind the Classifier trait so it can be dropped
// without touching the engine.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{CategoryScore, Classifier};

const ANALYZE_URL: &str = "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Attributes requested from Perspective, reported as lowercase categories.
const ATTRIBUTES: [&str; 6] = [
    "TOXICITY",
    "SEVERE_TOXICITY",
    "IDENTITY_ATTACK",
    "INSULT",
    "PROFANITY",
    "THREAT",
];

pub struct PerspectiveClassifier {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl PerspectiveClassifier {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            // Perspective free tier: 1 query per second
            rate_limiter: RateLimiter::new(1.0),
        }
    }
}

#[async_trait]
impl Classifier for PerspectiveClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<CategoryScore>> {
        self.rate_limiter.acquire().await;

        let request = build_request(text);

        let response = self
            .client
            .post(ANALYZE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to call Perspective API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Perspective API returned {}: {}", status, body);
        }

        let result: PerspectiveResponse = response
            .json()
            .await
            .context("Failed to parse Perspective API response")?;

        let scores = extract_scores(&result);

        debug!(
            categories = scores.len(),
            max_probability = super::traits::max_probability(&scores),
            text_preview = %crate::output::truncate_chars(text, 50),
            "Perspective classified text"
        );

        Ok(scores)
    }
}

fn build_request(text: &str) -> PerspectiveRequest {
    PerspectiveRequest {
        comment: Comment {
            text: text.to_string(),
        },
        requested_attributes: ATTRIBUTES
            .iter()
            .map(|a| (a.to_string(), AttributeConfig {}))
            .collect(),
        languages: vec!["en".to_string()],
    }
}

/// Summary score per returned attribute, in the order we requested them.
fn extract_scores(response: &PerspectiveResponse) -> Vec<CategoryScore> {
    ATTRIBUTES
        .iter()
        .filter_map(|attr| {
            response
                .attribute_scores
                .get(*attr)
                .map(|score| CategoryScore::new(attr.to_lowercase(), score.summary_score.value))
        })
        .collect()
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest {
    comment: Comment,
    requested_attributes: HashMap<String, AttributeConfig>,
    languages: Vec<String>,
}

#[derive(Serialize)]
struct Comment {
    text: String,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    attribute_scores: HashMap<String, AttributeScore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Deserialize)]
struct SummaryScore {
    value: f64,
}
