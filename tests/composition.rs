// Composition tests: HTML import -> engine -> SQLite audit log -> HTML export.
//
// Uses the keyword filter only (no model files needed). Databases are created
// under the system temp dir and removed afterwards.

use std::path::PathBuf;
use std::sync::Arc;

use hateblock::classifier::ClassifierSlot;
use hateblock::dom::{self, html::parse_html};
use hateblock::engine::suppress::{LABEL_CLASS, SUPPRESSED_CLASS};
use hateblock::engine::Engine;
use hateblock::filter::LexicalFilter;
use hateblock::settings::{self, SettingsHandle};
use hateblock::storage;

const THREAD: &str = r#"<!DOCTYPE html>
<html>
<head><title>Thread</title><style>.x { content: "hate"; }</style></head>
<body>
  <header><h1>Weekend hiking thread</h1></header>
  <ul class="comments">
    <li><div class="comment"><span class="author">amy</span><p>Great trail, thanks for sharing!</p></div></li>
    <li><div class="comment"><span class="author">bob</span><p>You are an idiot for going there</p></div></li>
    <li><div class="comment"><span class="author">cal</span><p>Which parking lot did you use?</p></div></li>
  </ul>
  <script>var stupid = true;</script>
</body>
</html>"#;

fn temp_db(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "hateblock-{name}-{}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path
}

fn cleanup(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[tokio::test]
async fn parsed_thread_blocks_only_the_insult() {
    let db = temp_db("thread");
    let db_path = db.to_str().unwrap().to_string();
    let store = storage::initialize_sqlite(&db_path).unwrap();
    let current = settings::initialize_defaults(store.as_ref()).await.unwrap();
    let handle = SettingsHandle::new(current).unwrap();

    let doc = dom::share(parse_html(THREAD, "https://hikes.example.com/t/7").unwrap());
    let engine = Arc::new(Engine::new(
        Arc::clone(&doc),
        LexicalFilter::default(),
        ClassifierSlot::disabled(),
        Arc::clone(&store),
        handle.subscribe(),
    ));

    let report = engine.scan(None).await;
    assert_eq!(report.suppressed, 1);
    assert_eq!(report.failed, 0);

    {
        let doc = dom::lock(&doc);
        let blocked: Vec<_> = doc
            .descendants(doc.body())
            .into_iter()
            .filter(|&n| doc.has_class(n, SUPPRESSED_CLASS))
            .collect();
        assert_eq!(blocked.len(), 1);
        assert!(doc.text_content(blocked[0]).contains("You are an idiot"));
        assert!(!doc.text_content(blocked[0]).contains("Great trail"));

        let html = doc.to_html();
        assert!(html.contains(SUPPRESSED_CLASS));
        assert!(html.contains(LABEL_CLASS));
        assert!(html.contains("[Blocked by HateBlock]"));
        assert!(html.contains("var stupid = true;"));
    }

    // The audit log survives reopening the database
    drop(engine);
    drop(store);
    let reopened = storage::open_sqlite(&db_path).unwrap();
    let entries = reopened.recent_audit_entries(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].text.contains("You are an idiot for going there"));
    assert_eq!(entries[0].url, "https://hikes.example.com/t/7");

    drop(reopened);
    cleanup(&db);
}

#[tokio::test]
async fn settings_persist_across_connections() {
    let db = temp_db("settings");
    let db_path = db.to_str().unwrap().to_string();

    {
        let store = storage::initialize_sqlite(&db_path).unwrap();
        settings::initialize_defaults(store.as_ref()).await.unwrap();
        let mut current = settings::load(store.as_ref()).await.unwrap();
        current.enabled = false;
        current.threshold = 0.35;
        settings::save(store.as_ref(), &current).await.unwrap();
    }

    let store = storage::open_sqlite(&db_path).unwrap();
    let loaded = settings::load(store.as_ref()).await.unwrap();
    assert!(!loaded.enabled);
    assert!((loaded.threshold - 0.35).abs() < f64::EPSILON);

    drop(store);
    cleanup(&db);
}

#[tokio::test]
async fn recent_entries_come_newest_first() {
    let db = temp_db("order");
    let db_path = db.to_str().unwrap().to_string();
    let store = storage::initialize_sqlite(&db_path).unwrap();

    for text in ["first", "second", "third"] {
        let entry = storage::AuditEntry::now(text, "https://example.com/");
        store.append_audit_entry(&entry).await.unwrap();
    }

    let recent = store.recent_audit_entries(2).await.unwrap();
    let texts: Vec<&str> = recent.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["third", "second"]);
    assert_eq!(store.audit_entry_count().await.unwrap(), 3);

    drop(store);
    cleanup(&db);
}
