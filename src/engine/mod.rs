// Suppression engine: scanner, container resolver, fusion, suppressor and
// mutation tracking wired together around one shared document.
//
// Control flow for every unit of content:
//   scan / mutation -> container resolution -> fusion -> suppression
//
// The tree walk is synchronous under the document lock. Classification runs
// afterwards with the lock released, so verdicts may land after the page has
// changed again; the suppressor drops verdicts for removed elements.

pub mod container;
pub mod fusion;
pub mod scanner;
pub mod session;
pub mod suppress;
pub mod tracker;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::debug;

use crate::classifier::ClassifierSlot;
use crate::dom::{self, NodeId, SharedDocument};
use crate::filter::LexicalFilter;
use crate::settings::Settings;
use crate::storage::Storage;

use fusion::{Evaluation, Fusion};
use scanner::ContentUnit;
use suppress::Suppressor;

pub use session::Session;
pub use tracker::{MutationTracker, TrackerState};

/// Default number of content units classified at the same time.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What happened to one content unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Suppressed,
    /// Toxic, but there was no live element to mark.
    ToxicUnattached,
    Clean,
    Skipped,
    Unavailable,
    Failed,
}

/// Tally of one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub units: usize,
    pub suppressed: usize,
    pub toxic_unattached: usize,
    pub clean: usize,
    pub unavailable: usize,
    pub failed: usize,
}

impl ScanReport {
    fn record(&mut self, outcome: UnitOutcome) {
        self.units += 1;
        match outcome {
            UnitOutcome::Suppressed => self.suppressed += 1,
            UnitOutcome::ToxicUnattached => self.toxic_unattached += 1,
            UnitOutcome::Clean => self.clean += 1,
            UnitOutcome::Unavailable => self.unavailable += 1,
            UnitOutcome::Failed => self.failed += 1,
            UnitOutcome::Skipped => {}
        }
    }
}

pub struct Engine {
    document: SharedDocument,
    fusion: Fusion,
    suppressor: Suppressor,
    settings: watch::Receiver<Settings>,
    concurrency: usize,
}

impl Engine {
    pub fn new(
        document: SharedDocument,
        filter: LexicalFilter,
        classifier: ClassifierSlot,
        storage: Arc<dyn Storage>,
        settings: watch::Receiver<Settings>,
    ) -> Self {
        Self {
            fusion: Fusion::new(filter, classifier, settings.clone()),
            suppressor: Suppressor::new(Arc::clone(&document), storage),
            document,
            settings,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn classifier(&self) -> &ClassifierSlot {
        self.fusion.classifier()
    }

    /// A fresh receiver on the settings channel the engine decides with.
    pub fn settings(&self) -> watch::Receiver<Settings> {
        self.settings.clone()
    }

    /// Classify text without touching the document.
    pub async fn evaluate(&self, text: &str) -> Evaluation {
        self.fusion.evaluate(text).await
    }

    /// Scan the subtree at `root` (the whole body when `None`).
    pub async fn scan(&self, root: Option<NodeId>) -> ScanReport {
        let units = {
            let doc = dom::lock(&self.document);
            let root = root.unwrap_or_else(|| doc.body());
            if !doc.contains(root) {
                return ScanReport::default();
            }
            scanner::collect_units(&doc, root)
        };
        debug!(units = units.len(), "Scanning");

        let outcomes: Vec<UnitOutcome> = stream::iter(units)
            .map(|unit| self.process(unit))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = ScanReport::default();
        for outcome in outcomes {
            report.record(outcome);
        }
        report
    }

    /// Evaluate one text node in isolation (in-place edits).
    pub async fn evaluate_node(&self, text_node: NodeId) -> Option<UnitOutcome> {
        let unit = {
            let doc = dom::lock(&self.document);
            scanner::single_unit(&doc, text_node)
        }?;
        Some(self.process(unit).await)
    }

    async fn process(&self, unit: ContentUnit) -> UnitOutcome {
        match self.fusion.evaluate(&unit.text).await {
            Evaluation::Verdict(v) if v.toxic => {
                let outcome = self.suppressor.suppress(unit.container, &unit.text).await;
                if outcome.is_marked() {
                    UnitOutcome::Suppressed
                } else {
                    UnitOutcome::ToxicUnattached
                }
            }
            Evaluation::Verdict(_) => UnitOutcome::Clean,
            Evaluation::Skipped => UnitOutcome::Skipped,
            Evaluation::Unavailable => UnitOutcome::Unavailable,
            Evaluation::Failed(_) => UnitOutcome::Failed,
        }
    }
}
