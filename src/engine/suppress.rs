// Content suppression: mark the container, label it, record the decision.
//
// The marker is one-way: nothing in the engine ever removes it. A second
// suppression of the same element leaves the tree untouched but still
// appends an audit entry.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::dom::{self, Document, NodeId, SharedDocument};
use crate::output::truncate_chars;
use crate::storage::{AuditEntry, Storage};

/// Class added to a suppressed element (blurred by the page stylesheet).
pub const SUPPRESSED_CLASS: &str = "hateblock-blurred";
/// Class of the label inserted after a suppressed element.
pub const LABEL_CLASS: &str = "hateblock-label";
pub const LABEL_TEXT: &str = " [Blocked by HateBlock]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressOutcome {
    /// Marker and label applied now.
    Suppressed,
    /// Element already carried the marker; tree left as is.
    AlreadySuppressed,
    /// Nothing to attach the marker to.
    NoContainer,
    /// The element was removed from the tree before the verdict arrived.
    Detached,
}

impl SuppressOutcome {
    pub fn is_marked(&self) -> bool {
        matches!(
            self,
            SuppressOutcome::Suppressed | SuppressOutcome::AlreadySuppressed
        )
    }
}

/// Whether `node` is a suppressed element or label, or lies inside one.
pub fn is_within_suppressed(doc: &Document, node: NodeId) -> bool {
    doc.ancestors_inclusive(node)
        .any(|n| doc.has_class(n, SUPPRESSED_CLASS) || doc.has_class(n, LABEL_CLASS))
}

/// Apply the marker and insert the label after `element`.
pub fn apply_marker(doc: &mut Document, element: NodeId) -> Result<SuppressOutcome> {
    if !doc.is_element(element) {
        return Ok(SuppressOutcome::Detached);
    }
    if !doc.add_class(element, SUPPRESSED_CLASS)? {
        return Ok(SuppressOutcome::AlreadySuppressed);
    }

    if doc.parent(element).is_some() {
        let label = doc.create_element("span");
        doc.add_class(label, LABEL_CLASS)?;
        let text = doc.create_text(LABEL_TEXT);
        doc.append_child(label, text)?;
        doc.insert_after(element, label)?;
    }
    doc.flush_mutations();

    Ok(SuppressOutcome::Suppressed)
}

pub struct Suppressor {
    document: SharedDocument,
    storage: Arc<dyn Storage>,
}

impl Suppressor {
    pub fn new(document: SharedDocument, storage: Arc<dyn Storage>) -> Self {
        Self { document, storage }
    }

    /// Suppress `element` because of `text`. A `None` element is a no-op.
    pub async fn suppress(&self, element: Option<NodeId>, text: &str) -> SuppressOutcome {
        let Some(element) = element else {
            return SuppressOutcome::NoContainer;
        };

        let (outcome, url) = {
            let mut doc = dom::lock(&self.document);
            let outcome = match apply_marker(&mut doc, element) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Failed to mark element");
                    SuppressOutcome::Detached
                }
            };
            (outcome, doc.url().to_string())
        };

        if outcome == SuppressOutcome::Detached {
            return outcome;
        }

        let entry = AuditEntry::now(text, url);
        if let Err(e) = self.storage.append_audit_entry(&entry).await {
            warn!(error = %e, "Failed to record audit entry");
        }

        info!(
            url = %entry.url,
            text_preview = %truncate_chars(text, 80),
            "Blocked content"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn doc_with_comment() -> (Document, NodeId) {
        let mut doc = Document::new("https://example.com/post/1");
        let body = doc.body();
        let p = doc.create_element("p");
        let t = doc.create_text("You are an idiot");
        doc.append_child(p, t).unwrap();
        doc.append_child(body, p).unwrap();
        (doc, p)
    }

    #[test]
    fn test_apply_marker_adds_class_and_label() {
        let (mut doc, p) = doc_with_comment();
        assert_eq!(apply_marker(&mut doc, p).unwrap(), SuppressOutcome::Suppressed);
        assert!(doc.has_class(p, SUPPRESSED_CLASS));

        let siblings = doc.children(doc.body()).to_vec();
        assert_eq!(siblings.len(), 2);
        assert_eq!(siblings[0], p);
        assert!(doc.has_class(siblings[1], LABEL_CLASS));
        assert_eq!(doc.text_content(siblings[1]), LABEL_TEXT);
    }

    #[test]
    fn test_apply_marker_twice_keeps_one_label() {
        let (mut doc, p) = doc_with_comment();
        apply_marker(&mut doc, p).unwrap();
        assert_eq!(
            apply_marker(&mut doc, p).unwrap(),
            SuppressOutcome::AlreadySuppressed
        );
        assert_eq!(doc.children(doc.body()).len(), 2);
        assert_eq!(doc.element(p).unwrap().classes.len(), 1);
    }

    #[test]
    fn test_label_and_marked_subtree_are_recognised() {
        let (mut doc, p) = doc_with_comment();
        let text = doc.children(p)[0];
        assert!(!is_within_suppressed(&doc, text));
        apply_marker(&mut doc, p).unwrap();
        assert!(is_within_suppressed(&doc, text));
        let label = doc.children(doc.body())[1];
        assert!(is_within_suppressed(&doc, doc.children(label)[0]));
    }

    #[tokio::test]
    async fn test_suppress_none_is_noop() {
        let (doc, _) = doc_with_comment();
        let storage = Arc::new(MemoryStorage::default());
        let suppressor = Suppressor::new(dom::share(doc), storage.clone());
        assert_eq!(
            suppressor.suppress(None, "You are an idiot").await,
            SuppressOutcome::NoContainer
        );
        assert_eq!(storage.audit_entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_suppress_removed_element_is_dropped() {
        let (mut doc, p) = doc_with_comment();
        doc.remove(p);
        let storage = Arc::new(MemoryStorage::default());
        let suppressor = Suppressor::new(dom::share(doc), storage.clone());
        assert_eq!(
            suppressor.suppress(Some(p), "You are an idiot").await,
            SuppressOutcome::Detached
        );
        assert_eq!(storage.audit_entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_suppress_records_text_and_url() {
        let (doc, p) = doc_with_comment();
        let storage = Arc::new(MemoryStorage::default());
        let suppressor = Suppressor::new(dom::share(doc), storage.clone());
        suppressor.suppress(Some(p), "You are an idiot").await;

        let entries = storage.audit_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "You are an idiot");
        assert_eq!(entries[0].url, "https://example.com/post/1");
    }
}
