// Classifier load state.
//
// Loading a model can take seconds (or fail outright when the model files are
// missing). The slot starts in `Loading`, settles into `Ready` or `Failed`,
// and anyone can wait for it to settle. While it isn't `Ready` the engine
// runs lexical-only.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use super::traits::Classifier;

#[derive(Clone)]
pub enum ClassifierState {
    Loading,
    Ready(Arc<dyn Classifier>),
    Failed(String),
    /// No classifier configured at all (keyword-only mode).
    Disabled,
}

impl ClassifierState {
    pub fn label(&self) -> &'static str {
        match self {
            ClassifierState::Loading => "loading",
            ClassifierState::Ready(_) => "ready",
            ClassifierState::Failed(_) => "failed",
            ClassifierState::Disabled => "disabled",
        }
    }

    fn is_settled(&self) -> bool {
        !matches!(self, ClassifierState::Loading)
    }
}

impl std::fmt::Debug for ClassifierState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierState::Failed(reason) => write!(f, "Failed({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Clone)]
pub struct ClassifierSlot {
    tx: Arc<watch::Sender<ClassifierState>>,
}

impl ClassifierSlot {
    fn with_state(state: ClassifierState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    pub fn loading() -> Self {
        Self::with_state(ClassifierState::Loading)
    }

    pub fn ready(classifier: Arc<dyn Classifier>) -> Self {
        Self::with_state(ClassifierState::Ready(classifier))
    }

    pub fn disabled() -> Self {
        Self::with_state(ClassifierState::Disabled)
    }

    pub fn state(&self) -> ClassifierState {
        self.tx.borrow().clone()
    }

    /// The classifier, if one has finished loading.
    pub fn current(&self) -> Option<Arc<dyn Classifier>> {
        match &*self.tx.borrow() {
            ClassifierState::Ready(c) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    pub fn set_ready(&self, classifier: Arc<dyn Classifier>) {
        self.tx.send_replace(ClassifierState::Ready(classifier));
    }

    pub fn set_failed(&self, reason: impl Into<String>) {
        self.tx.send_replace(ClassifierState::Failed(reason.into()));
    }

    pub fn set_disabled(&self) {
        self.tx.send_replace(ClassifierState::Disabled);
    }

    /// Wait until the slot is no longer `Loading`.
    pub async fn settled(&self) -> ClassifierState {
        let mut rx = self.tx.subscribe();
        let state = match rx.wait_for(ClassifierState::is_settled).await {
            Ok(state) => state.clone(),
            // Sender lives as long as self, so this can't close under us
            Err(_) => self.state(),
        };
        state
    }

    /// Run a blocking loader off the async runtime and settle the slot with
    /// its outcome. Load failures are logged, never propagated.
    pub async fn load_blocking<F>(&self, loader: F)
    where
        F: FnOnce() -> Result<Arc<dyn Classifier>> + Send + 'static,
    {
        match tokio::task::spawn_blocking(loader).await {
            Ok(Ok(classifier)) => {
                info!("Classifier loaded");
                self.set_ready(classifier);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to load classifier, using keyword filter only");
                self.set_failed(e.to_string());
            }
            Err(e) => {
                warn!(error = %e, "Classifier loader panicked, using keyword filter only");
                self.set_failed(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::traits::CategoryScore;
    use async_trait::async_trait;

    struct Constant;

    #[async_trait]
    impl Classifier for Constant {
        async fn classify(&self, _text: &str) -> Result<Vec<CategoryScore>> {
            Ok(vec![CategoryScore::new("toxicity", 0.5)])
        }
    }

    #[tokio::test]
    async fn test_loading_has_no_classifier() {
        let slot = ClassifierSlot::loading();
        assert!(slot.current().is_none());
        assert_eq!(slot.state().label(), "loading");
    }

    #[tokio::test]
    async fn test_load_success_settles_ready() {
        let slot = ClassifierSlot::loading();
        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.settled().await.label() })
        };
        slot.load_blocking(|| Ok(Arc::new(Constant) as Arc<dyn Classifier>))
            .await;
        assert_eq!(waiter.await.unwrap(), "ready");
        assert!(slot.current().is_some());
    }

    #[tokio::test]
    async fn test_load_failure_settles_failed() {
        let slot = ClassifierSlot::loading();
        slot.load_blocking(|| anyhow::bail!("model files missing"))
            .await;
        match slot.settled().await {
            ClassifierState::Failed(reason) => assert!(reason.contains("missing")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn test_disabled_is_already_settled() {
        let slot = ClassifierSlot::disabled();
        assert_eq!(slot.settled().await.label(), "disabled");
    }
}
