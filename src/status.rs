// System status display: database, settings, audit log size, model files.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ClassifierBackend, Config};
use crate::output::terminal;
use crate::storage::Storage;

/// Display system status to the terminal.
pub async fn show(storage: &Arc<dyn Storage>, config: &Config) -> Result<()> {
    let file_size = std::fs::metadata(&config.db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", config.db_path, file_size);

    let settings = crate::settings::load(storage.as_ref()).await?;
    terminal::display_settings(&settings);

    let blocked = storage.audit_entry_count().await?;
    println!("Blocked content logged: {}", blocked);
    if let Some(latest) = storage.recent_audit_entries(1).await?.first() {
        println!("  Most recent: {}", latest.timestamp);
    }

    match config.classifier_backend {
        ClassifierBackend::Onnx => {
            if crate::classifier::download::model_files_present(&config.model_dir) {
                println!("Classifier: ONNX model at {}", config.model_dir.display());
            } else {
                println!("Classifier: ONNX model not downloaded");
                println!("  Run `hateblock download-model` to enable it");
            }
        }
        ClassifierBackend::Perspective => {
            if config.perspective_api_key.is_empty() {
                println!("Classifier: Perspective API (PERSPECTIVE_API_KEY not set)");
            } else {
                println!("Classifier: Perspective API");
            }
        }
        ClassifierBackend::None => println!("Classifier: off (keyword filter only)"),
    }

    match &config.keywords_file {
        Some(path) if Path::new(path).exists() => {
            println!("Keyword list: {}", path.display());
        }
        Some(path) => println!("Keyword list: {} (missing)", path.display()),
        None => println!("Keyword list: built-in"),
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
