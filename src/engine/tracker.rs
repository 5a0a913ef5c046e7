// Mutation tracking: keep suppression live as the page changes.
//
// While active, the tracker owns the document's observer channel. Each batch
// is dispatched as it arrives: added nodes get a subtree scan, in-place text
// edits get the single-node path. Every piece of work is spawned, so a slow
// classifier call never holds up the next batch. Stopping disconnects the
// observer and stops consuming; work already spawned runs to completion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dom::{self, MutationBatch, MutationRecord};

use super::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Active,
    Inactive,
}

pub struct MutationTracker {
    engine: Arc<Engine>,
    consumer: Option<JoinHandle<()>>,
    dispatched: Arc<AtomicUsize>,
}

impl MutationTracker {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            consumer: None,
            dispatched: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.consumer.is_some() {
            TrackerState::Active
        } else {
            TrackerState::Inactive
        }
    }

    /// Number of scans / node evaluations started so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Inactive -> Active. No-op when already active.
    pub fn start(&mut self) {
        if self.consumer.is_some() {
            return;
        }
        let rx = dom::lock(self.engine.document()).observe();
        let engine = Arc::clone(&self.engine);
        let dispatched = Arc::clone(&self.dispatched);
        self.consumer = Some(tokio::spawn(consume(engine, rx, dispatched)));
        info!("Monitoring page for changes");
    }

    /// Active -> Inactive. No-op when already inactive.
    pub fn stop(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            dom::lock(self.engine.document()).disconnect();
            consumer.abort();
            info!("Stopped monitoring page");
        }
    }
}

impl Drop for MutationTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn consume(
    engine: Arc<Engine>,
    mut rx: mpsc::UnboundedReceiver<MutationBatch>,
    dispatched: Arc<AtomicUsize>,
) {
    while let Some(batch) = rx.recv().await {
        dispatch_batch(&engine, batch, &dispatched);
    }
    debug!("Mutation observer closed");
}

/// Spawn the work for one batch of mutation records.
pub fn dispatch_batch(engine: &Arc<Engine>, batch: MutationBatch, dispatched: &AtomicUsize) {
    debug!(records = batch.len(), "Handling mutation batch");
    for record in batch {
        match record {
            MutationRecord::ChildList { added, .. } => {
                for node in added {
                    dispatched.fetch_add(1, Ordering::SeqCst);
                    let engine = Arc::clone(engine);
                    tokio::spawn(async move {
                        engine.scan(Some(node)).await;
                    });
                }
            }
            MutationRecord::CharacterData { target } => {
                dispatched.fetch_add(1, Ordering::SeqCst);
                let engine = Arc::clone(engine);
                tokio::spawn(async move {
                    engine.evaluate_node(target).await;
                });
            }
        }
    }
}
