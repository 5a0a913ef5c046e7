// Document scanning: turn a subtree into content units.
//
// The walk is synchronous and runs under the document lock; classification
// happens afterwards, outside the lock. Within one pass each container is
// evaluated once, as a whole: a text node whose container was already
// collected is skipped, so a multi-paragraph comment is judged in one piece
// rather than paragraph by paragraph.

use std::collections::HashSet;

use crate::dom::{Document, NodeId};

use super::container::{resolve_container, resolve_container_with, TextLengths};
use super::suppress::is_within_suppressed;

/// Elements whose text is never rendered as content.
const NON_CONTENT_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// One span of text and the element that would be suppressed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    pub text: String,
    pub container: Option<NodeId>,
}

/// Whether a text node is eligible for evaluation at all.
pub fn is_scannable(doc: &Document, text_node: NodeId) -> bool {
    let Some(text) = doc.text(text_node) else {
        return false;
    };
    if text.trim().is_empty() {
        return false;
    }
    let in_non_content = doc
        .ancestors_inclusive(text_node)
        .filter_map(|n| doc.tag(n))
        .any(|tag| NON_CONTENT_TAGS.contains(&tag));
    !in_non_content && !is_within_suppressed(doc, text_node)
}

/// Text of `container` as a reader sees it: non-content subtrees are left
/// out, the way a browser's rendered text leaves out scripts and styles.
pub fn rendered_text(doc: &Document, container: NodeId) -> String {
    let mut out = String::new();
    let mut stack = vec![container];
    while let Some(node) = stack.pop() {
        if let Some(text) = doc.text(node) {
            out.push_str(text);
            continue;
        }
        if doc.tag(node).is_some_and(|tag| NON_CONTENT_TAGS.contains(&tag)) {
            continue;
        }
        stack.extend(doc.children(node).iter().rev().copied());
    }
    out
}

/// Collect the content units under `root` in document order.
///
/// A text node is skipped when its own container was already collected in
/// this pass. Text nested in a collected container that resolves to a
/// smaller container of its own still becomes a separate unit.
pub fn collect_units(doc: &Document, root: NodeId) -> Vec<ContentUnit> {
    let mut lengths = TextLengths::new(doc);
    let mut processed: HashSet<NodeId> = HashSet::new();
    let mut units = Vec::new();

    for node in doc.descendants(root) {
        if !is_scannable(doc, node) {
            continue;
        }

        match resolve_container_with(&mut lengths, node) {
            Some(container) => {
                if !processed.insert(container) {
                    continue;
                }
                units.push(ContentUnit {
                    text: rendered_text(doc, container),
                    container: Some(container),
                });
            }
            None => {
                let text = doc.text(node).unwrap_or_default();
                units.push(ContentUnit {
                    text: text.to_string(),
                    container: None,
                });
            }
        }
    }

    units
}

/// The content unit for a single text node (edited or inserted in place).
/// The node's own text is evaluated, its container is what gets suppressed.
pub fn single_unit(doc: &Document, text_node: NodeId) -> Option<ContentUnit> {
    if !is_scannable(doc, text_node) {
        return None;
    }
    Some(ContentUnit {
        text: doc.text(text_node)?.to_string(),
        container: resolve_container(doc, text_node),
    })
}
