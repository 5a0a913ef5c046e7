// Colored terminal output for settings, the audit log and scan results.
//
// main.rs display calls delegate here so formatting stays in one place.

use colored::Colorize;

use crate::classifier::ClassifierState;
use crate::engine::ScanReport;
use crate::settings::Settings;
use crate::storage::AuditEntry;

use super::{display_host, truncate_chars};

/// Characters of blocked text shown per log line.
const SNIPPET_CHARS: usize = 100;

pub fn display_settings(settings: &Settings) {
    let state = if settings.enabled {
        "enabled".green().bold()
    } else {
        "disabled".red().bold()
    };
    println!("  HateBlock: {}", state);
    println!("  Threshold: {:.2}", settings.threshold);
}

/// Display audit entries (expected newest first).
pub fn display_logs(entries: &[AuditEntry]) {
    if entries.is_empty() {
        println!("{}", "No content blocked yet.".dimmed());
        return;
    }

    println!(
        "\n{}",
        format!("=== Blocked content ({} most recent) ===", entries.len()).bold()
    );
    for entry in entries {
        println!(
            "  {} {}: {}",
            entry.timestamp.dimmed(),
            display_host(&entry.url).cyan(),
            truncate_chars(&entry.text, SNIPPET_CHARS),
        );
    }
}

pub fn display_classifier_state(state: &ClassifierState) {
    match state {
        ClassifierState::Ready(_) => println!("  Classifier: {}", "ready".green()),
        ClassifierState::Loading => println!("  Classifier: {}", "loading".yellow()),
        ClassifierState::Disabled => {
            println!("  Classifier: {}", "off (keyword filter only)".dimmed())
        }
        ClassifierState::Failed(reason) => {
            println!(
                "  Classifier: {} {}",
                "unavailable, keyword filter only".yellow(),
                format!("({})", truncate_chars(reason, 80)).dimmed()
            );
        }
    }
}

pub fn display_scan_report(report: &ScanReport) {
    println!("\n{}", "Scan complete.".bold());
    println!("  Content units: {}", report.units);
    if report.suppressed > 0 {
        println!("  {} {}", "Blocked:".red().bold(), report.suppressed);
    } else {
        println!("  Blocked: 0");
    }
    println!("  Clean: {}", report.clean);
    if report.toxic_unattached > 0 {
        println!(
            "  Toxic but not blockable (no container): {}",
            report.toxic_unattached
        );
    }
    if report.unavailable > 0 {
        println!(
            "  {} {} (no classifier, no keyword match)",
            "Unchecked:".yellow(),
            report.unavailable
        );
    }
    if report.failed > 0 {
        println!("  {} {}", "Classifier errors:".yellow(), report.failed);
    }
}
