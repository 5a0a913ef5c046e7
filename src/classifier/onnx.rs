// Local ONNX classifier using Detoxify's unbiased-toxic-roberta model.
//
// Runs entirely on the local CPU: no API calls, no rate limits, no network
// dependency once the model is downloaded. The model was trained to reduce
// bias around identity mentions, so quoting a group name alone doesn't trip
// the identity_attack category.
//
// Model: protectai/unbiased-toxic-roberta-onnx (quantized, ~126MB)
// Output: 7 categories with independent 0-1 probabilities via sigmoid.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::download::{MODEL_FILE, TOKENIZER_FILE};
use super::traits::{CategoryScore, Classifier};

/// Labels output by unbiased-toxic-roberta, in the order the model returns them.
pub const LABEL_ORDER: [&str; 7] = [
    "toxicity",
    "severe_toxicity",
    "obscene",
    "identity_attack",
    "insult",
    "threat",
    "sexual_explicit",
];

/// RoBERTa's padding token id.
const PAD_TOKEN_ID: i64 = 1;

/// Local ONNX classifier. Holds the session and tokenizer behind Arc so
/// inference can be offloaded to spawn_blocking.
pub struct OnnxClassifier {
    // ort::Session::run takes &mut self, hence the Mutex
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxClassifier {
    /// Load the ONNX model and tokenizer from the given directory.
    ///
    /// Blocking: call from `ClassifierSlot::load_blocking`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `hateblock download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `hateblock download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        debug!("Loaded ONNX classifier from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl Classifier for OnnxClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<CategoryScore>> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        // Tokenization and inference are CPU-bound; keep them off the runtime
        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            let (input_ids, attention_mask) = pad_inputs(input_ids, attention_mask);
            let shape = [1i64, input_ids.len() as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // Output shape: [1, 7], raw logits (pre-sigmoid)
                let (_out_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            let scores = logits_to_scores(&logits)?;

            debug!(
                max_probability = super::traits::max_probability(&scores),
                text_preview = %crate::output::truncate_chars(&text, 50),
                "ONNX classified text"
            );

            Ok(scores)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Empty encodings still need one position for the model to run.
fn pad_inputs(mut ids: Vec<i64>, mut mask: Vec<i64>) -> (Vec<i64>, Vec<i64>) {
    if ids.is_empty() {
        ids.push(PAD_TOKEN_ID);
        mask.push(0);
    }
    (ids, mask)
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Map one row of raw logits to labelled probabilities.
fn logits_to_scores(logits: &[f32]) -> Result<Vec<CategoryScore>> {
    if logits.len() < LABEL_ORDER.len() {
        anyhow::bail!(
            "Model returned {} logits, expected {}",
            logits.len(),
            LABEL_ORDER.len()
        );
    }
    Ok(LABEL_ORDER
        .iter()
        .zip(logits)
        .map(|(label, &logit)| CategoryScore::new(*label, sigmoid(logit as f64)))
        .collect())
}
