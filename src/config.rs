use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::classifier::onnx::OnnxClassifier;
use crate::classifier::perspective::PerspectiveClassifier;
use crate::classifier::{Classifier, ClassifierSlot};
use crate::engine::DEFAULT_CONCURRENCY;
use crate::filter::LexicalFilter;

/// Which classifier backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierBackend {
    /// Local ONNX model (default), no API key needed
    Onnx,
    /// Google Perspective API (requires PERSPECTIVE_API_KEY)
    Perspective,
    /// Keyword filter only
    None,
}

impl ClassifierBackend {
    fn from_env_value(value: Option<&str>) -> Result<Self> {
        match value.map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("onnx") => Ok(Self::Onnx),
            Some("perspective") => Ok(Self::Perspective),
            Some("none") | Some("keywords") => Ok(Self::None),
            Some(other) => anyhow::bail!(
                "Unknown HATEBLOCK_CLASSIFIER '{other}' (expected onnx, perspective or none)"
            ),
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars (never hardcoded). The .env file is loaded
/// automatically at startup via dotenvy.
pub struct Config {
    pub db_path: String,
    pub classifier_backend: ClassifierBackend,
    pub perspective_api_key: String,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    /// Optional replacement for the built-in keyword list
    pub keywords_file: Option<PathBuf>,
    /// Content units classified concurrently during a scan
    pub scan_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let classifier_backend =
            ClassifierBackend::from_env_value(env::var("HATEBLOCK_CLASSIFIER").ok().as_deref())?;

        let model_dir = env::var("HATEBLOCK_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::classifier::download::default_model_dir());

        let scan_concurrency = match env::var("HATEBLOCK_SCAN_CONCURRENCY") {
            Ok(v) => v
                .parse::<usize>()
                .with_context(|| format!("Invalid HATEBLOCK_SCAN_CONCURRENCY '{v}'"))?
                .max(1),
            Err(_) => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            db_path: env::var("HATEBLOCK_DB_PATH").unwrap_or_else(|_| "./hateblock.db".to_string()),
            classifier_backend,
            perspective_api_key: env::var("PERSPECTIVE_API_KEY").unwrap_or_default(),
            model_dir,
            keywords_file: env::var("HATEBLOCK_KEYWORDS_FILE").ok().map(PathBuf::from),
            scan_concurrency,
        })
    }

    /// The keyword filter: the configured list, or the built-in one.
    pub fn lexical_filter(&self) -> Result<LexicalFilter> {
        match &self.keywords_file {
            Some(path) => LexicalFilter::from_file(path),
            None => Ok(LexicalFilter::default()),
        }
    }

    /// Start loading the configured classifier.
    ///
    /// Returns a slot in `Loading` state and the future that settles it. A
    /// backend that can't be set up settles as `Failed`; the engine keeps
    /// running on keywords alone either way.
    pub fn classifier_loader(
        &self,
    ) -> (ClassifierSlot, impl std::future::Future<Output = ()> + Send + 'static) {
        let slot = ClassifierSlot::loading();
        let backend = self.classifier_backend.clone();
        let model_dir = self.model_dir.clone();
        let api_key = self.perspective_api_key.clone();
        let settle = slot.clone();

        let load = async move {
            match backend {
                ClassifierBackend::None => {
                    settle.set_disabled();
                }
                ClassifierBackend::Perspective => {
                    if api_key.is_empty() {
                        settle.set_failed(
                            "PERSPECTIVE_API_KEY not set. Add it to your .env file.",
                        );
                    } else {
                        settle.set_ready(Arc::new(PerspectiveClassifier::new(api_key)));
                    }
                }
                ClassifierBackend::Onnx => {
                    settle
                        .load_blocking(move || {
                            let classifier = OnnxClassifier::load(&model_dir)?;
                            Ok(Arc::new(classifier) as Arc<dyn Classifier>)
                        })
                        .await;
                }
            }
        };

        (slot, load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierState;

    #[test]
    fn test_backend_parsing() {
        assert_eq!(
            ClassifierBackend::from_env_value(None).unwrap(),
            ClassifierBackend::Onnx
        );
        assert_eq!(
            ClassifierBackend::from_env_value(Some("Perspective")).unwrap(),
            ClassifierBackend::Perspective
        );
        assert_eq!(
            ClassifierBackend::from_env_value(Some("none")).unwrap(),
            ClassifierBackend::None
        );
        assert!(ClassifierBackend::from_env_value(Some("gpt")).is_err());
    }

    fn config_with(backend: ClassifierBackend) -> Config {
        Config {
            db_path: ":memory:".to_string(),
            classifier_backend: backend,
            perspective_api_key: String::new(),
            model_dir: std::env::temp_dir().join("hateblock-config-no-model"),
            keywords_file: None,
            scan_concurrency: 1,
        }
    }

    #[tokio::test]
    async fn test_missing_onnx_model_settles_failed() {
        let (slot, load) = config_with(ClassifierBackend::Onnx).classifier_loader();
        assert_eq!(slot.state().label(), "loading");
        load.await;
        assert!(matches!(slot.state(), ClassifierState::Failed(_)));
    }

    #[tokio::test]
    async fn test_perspective_without_key_settles_failed() {
        let (slot, load) = config_with(ClassifierBackend::Perspective).classifier_loader();
        load.await;
        match slot.state() {
            ClassifierState::Failed(reason) => assert!(reason.contains("PERSPECTIVE_API_KEY")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_default_filter_without_keywords_file() {
        let filter = config_with(ClassifierBackend::None).lexical_filter().unwrap();
        assert!(filter.matches("you moron"));
    }
}
