// User settings: the enabled switch and the classifier threshold.
//
// Settings change at any time (the `settings` command, or an embedding host's
// own UI). The engine never copies them: it holds a watch receiver and reads
// the current value at each decision point, so a threshold change applies to
// the next evaluation without reloading the classifier.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::storage::Storage;

/// Default toxicity threshold (0.8 = block at >= 80% category confidence).
pub const DEFAULT_THRESHOLD: f64 = 0.8;

const KEY_ENABLED: &str = "enabled";
const KEY_THRESHOLD: &str = "threshold";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub enabled: bool,
    pub threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Reject thresholds outside [0, 1] (and NaN).
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("Threshold must be between 0.0 and 1.0, got {threshold}");
    }
    Ok(())
}

/// Writer side of the settings channel.
pub struct SettingsHandle {
    tx: watch::Sender<Settings>,
}

impl SettingsHandle {
    pub fn new(initial: Settings) -> Result<Self> {
        validate_threshold(initial.threshold)?;
        let (tx, _rx) = watch::channel(initial);
        Ok(Self { tx })
    }

    /// A receiver that observes every later change.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Settings {
        *self.tx.borrow()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.tx.send_if_modified(|s| {
            let changed = s.enabled != enabled;
            s.enabled = enabled;
            changed
        });
    }

    pub fn set_threshold(&self, threshold: f64) -> Result<()> {
        validate_threshold(threshold)?;
        self.tx.send_if_modified(|s| {
            let changed = s.threshold != threshold;
            s.threshold = threshold;
            changed
        });
        Ok(())
    }
}

/// Load persisted settings, falling back to defaults for missing keys.
pub async fn load(storage: &dyn Storage) -> Result<Settings> {
    let defaults = Settings::default();
    let enabled = match storage.get_setting(KEY_ENABLED).await? {
        Some(v) => v.parse::<bool>()?,
        None => defaults.enabled,
    };
    let threshold = match storage.get_setting(KEY_THRESHOLD).await? {
        Some(v) => v.parse::<f64>()?,
        None => defaults.threshold,
    };
    validate_threshold(threshold)?;
    Ok(Settings { enabled, threshold })
}

/// Persist both settings.
pub async fn save(storage: &dyn Storage, settings: &Settings) -> Result<()> {
    validate_threshold(settings.threshold)?;
    storage
        .set_setting(KEY_ENABLED, &settings.enabled.to_string())
        .await?;
    storage
        .set_setting(KEY_THRESHOLD, &settings.threshold.to_string())
        .await?;
    Ok(())
}

/// Write defaults for any setting that has never been stored.
pub async fn initialize_defaults(storage: &dyn Storage) -> Result<Settings> {
    let defaults = Settings::default();
    if storage.get_setting(KEY_ENABLED).await?.is_none() {
        storage
            .set_setting(KEY_ENABLED, &defaults.enabled.to_string())
            .await?;
    }
    if storage.get_setting(KEY_THRESHOLD).await?.is_none() {
        storage
            .set_setting(KEY_THRESHOLD, &defaults.threshold.to_string())
            .await?;
    }
    load(storage).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.enabled);
        assert!((s.threshold - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-0.01).is_err());
        assert!(validate_threshold(1.01).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_handle_rejects_bad_threshold_and_keeps_old_value() {
        let handle = SettingsHandle::new(Settings::default()).unwrap();
        assert!(handle.set_threshold(2.0).is_err());
        assert!((handle.current().threshold - 0.8).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_subscriber_sees_changes() {
        let handle = SettingsHandle::new(Settings::default()).unwrap();
        let mut rx = handle.subscribe();
        handle.set_enabled(false);
        rx.changed().await.unwrap();
        assert!(!rx.borrow().enabled);

        handle.set_threshold(0.3).unwrap();
        rx.changed().await.unwrap();
        assert!((rx.borrow().threshold - 0.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unchanged_value_does_not_notify() {
        let handle = SettingsHandle::new(Settings::default()).unwrap();
        let rx = handle.subscribe();
        handle.set_enabled(true);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_persist_roundtrip_and_defaults() {
        let storage = MemoryStorage::default();
        let initial = initialize_defaults(&storage).await.unwrap();
        assert_eq!(initial, Settings::default());

        let updated = Settings {
            enabled: false,
            threshold: 0.55,
        };
        save(&storage, &updated).await.unwrap();
        assert_eq!(load(&storage).await.unwrap(), updated);

        // Re-running defaults must not clobber stored values
        assert_eq!(initialize_defaults(&storage).await.unwrap(), updated);
    }
}
