// Classification fusion: keyword screen first, classifier second.
//
// A keyword hit is final and never reaches the classifier. Otherwise the
// classifier's per-category probabilities decide: toxic iff any single
// category reaches the threshold. The threshold is read from the settings
// channel after the classifier answers, so a change made mid-flight applies.
//
// Everything that prevents a confident answer (classifier still loading,
// failed to load, or erroring on this text) leaves the content visible.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::classifier::{max_probability, CategoryScore, ClassifierSlot};
use crate::filter::LexicalFilter;
use crate::output::truncate_chars;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Lexical,
    Classifier,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub toxic: bool,
    /// Highest category probability seen; 1.0 for keyword hits.
    pub max_probability: f64,
    pub source: VerdictSource,
}

#[derive(Debug)]
pub enum Evaluation {
    /// Empty or whitespace-only text; nothing was checked.
    Skipped,
    Verdict(Verdict),
    /// No keyword hit and no classifier available.
    Unavailable,
    /// The classifier errored on this text.
    Failed(anyhow::Error),
}

impl Evaluation {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Evaluation::Verdict(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_toxic(&self) -> bool {
        self.verdict().is_some_and(|v| v.toxic)
    }
}

/// Decide from classifier output alone.
pub fn decide(scores: &[CategoryScore], threshold: f64) -> Verdict {
    Verdict {
        toxic: scores.iter().any(|s| s.probability >= threshold),
        max_probability: max_probability(scores),
        source: VerdictSource::Classifier,
    }
}

pub struct Fusion {
    filter: LexicalFilter,
    classifier: ClassifierSlot,
    settings: watch::Receiver<Settings>,
}

impl Fusion {
    pub fn new(
        filter: LexicalFilter,
        classifier: ClassifierSlot,
        settings: watch::Receiver<Settings>,
    ) -> Self {
        Self {
            filter,
            classifier,
            settings,
        }
    }

    pub fn classifier(&self) -> &ClassifierSlot {
        &self.classifier
    }

    pub async fn evaluate(&self, text: &str) -> Evaluation {
        if text.trim().is_empty() {
            return Evaluation::Skipped;
        }

        if self.filter.matches(text) {
            debug!(text_preview = %truncate_chars(text, 50), "Keyword match");
            return Evaluation::Verdict(Verdict {
                toxic: true,
                max_probability: 1.0,
                source: VerdictSource::Lexical,
            });
        }

        let Some(classifier) = self.classifier.current() else {
            return Evaluation::Unavailable;
        };

        match classifier.classify(text).await {
            Ok(scores) => {
                let threshold = self.settings.borrow().threshold;
                let verdict = decide(&scores, threshold);
                debug!(
                    toxic = verdict.toxic,
                    max_probability = verdict.max_probability,
                    threshold,
                    text_preview = %truncate_chars(text, 50),
                    "Classifier verdict"
                );
                Evaluation::Verdict(verdict)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    text_preview = %truncate_chars(text, 50),
                    "Classification failed, leaving content visible"
                );
                Evaluation::Failed(e)
            }
        }
    }
}
