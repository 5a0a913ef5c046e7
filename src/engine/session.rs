// Engine lifecycle: follow the enabled switch.
//
// At start the tracker is switched on if the engine is enabled, and a full
// scan runs once the classifier has settled (loaded or failed). Afterwards
// settings changes drive the tracker: disabling stops monitoring but leaves
// existing suppressions alone, re-enabling resumes monitoring and rescans
// the page. Threshold changes only affect evaluations made after the change.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::settings::Settings;

use super::{Engine, MutationTracker, ScanReport};

pub struct Session {
    engine: Arc<Engine>,
    tracker: MutationTracker,
    settings: watch::Receiver<Settings>,
    current: Settings,
    initial_scan: Option<ScanReport>,
}

impl Session {
    pub async fn start(engine: Arc<Engine>) -> Self {
        let mut settings = engine.settings();
        let current = *settings.borrow_and_update();
        let mut session = Self {
            tracker: MutationTracker::new(Arc::clone(&engine)),
            engine,
            settings,
            current,
            initial_scan: None,
        };

        if current.enabled {
            session.tracker.start();
            let state = session.engine.classifier().settled().await;
            info!(classifier = state.label(), "Scanning page");
            session.initial_scan = Some(session.engine.scan(None).await);
        } else {
            info!("HateBlock is disabled, not scanning this page");
        }

        session
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn tracker(&self) -> &MutationTracker {
        &self.tracker
    }

    /// Report of the scan run by `start`, if the engine was enabled.
    pub fn initial_scan(&self) -> Option<&ScanReport> {
        self.initial_scan.as_ref()
    }

    /// React to new settings. Returns the report of a rescan, if one ran.
    pub async fn apply(&mut self, next: Settings) -> Option<ScanReport> {
        let previous = std::mem::replace(&mut self.current, next);

        if previous.threshold != next.threshold {
            info!(threshold = next.threshold, "Toxicity threshold changed");
        }

        match (previous.enabled, next.enabled) {
            (true, false) => {
                self.tracker.stop();
                info!("HateBlock disabled, existing blocks stay in place");
                None
            }
            (false, true) => {
                info!("HateBlock enabled, scanning page");
                self.tracker.start();
                Some(self.engine.scan(None).await)
            }
            _ => None,
        }
    }

    /// Follow settings changes until the settings channel closes.
    pub async fn run(mut self) {
        while self.settings.changed().await.is_ok() {
            let next = *self.settings.borrow_and_update();
            self.apply(next).await;
        }
        self.tracker.stop();
    }
}
