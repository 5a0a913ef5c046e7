// Container resolution: which element stands for "one post/comment".
//
// Pages rarely mark up their comments semantically, so we approximate: climb
// from the text's parent element while the element is still small and the
// parent doesn't add much more text. A parent with substantially more text
// than the current element most likely aggregates several unrelated posts.
// The result is approximate and must stay site-agnostic.

use std::collections::HashMap;

use crate::dom::{Document, NodeId};

/// Elements with this much text (chars) or more are already broad enough.
pub const MAX_CONTAINER_TEXT: usize = 500;

/// Stop climbing when the parent has more than this multiple of the
/// current element's text.
pub const MAX_PARENT_GROWTH: f64 = 1.5;

/// Memoised subtree text lengths for one scan pass.
///
/// Every node's length is computed once from its children's, so resolving
/// all posts under one large list costs a single walk of that list.
pub struct TextLengths<'a> {
    doc: &'a Document,
    cache: HashMap<NodeId, usize>,
}

impl<'a> TextLengths<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            cache: HashMap::new(),
        }
    }

    /// Characters of text under `id` (0 for unknown ids).
    pub fn get(&mut self, id: NodeId) -> usize {
        if let Some(&len) = self.cache.get(&id) {
            return len;
        }

        let doc = self.doc;
        // Post-order walk; children are summed once all of them are cached
        let mut stack = vec![(id, false)];
        while let Some((node, children_done)) = stack.pop() {
            if self.cache.contains_key(&node) {
                continue;
            }
            if let Some(text) = doc.text(node) {
                self.cache.insert(node, text.chars().count());
                continue;
            }
            let children = doc.children(node);
            if children_done {
                let total: usize = children
                    .iter()
                    .map(|c| self.cache.get(c).copied().unwrap_or(0))
                    .sum();
                self.cache.insert(node, total);
            } else {
                stack.push((node, true));
                stack.extend(
                    children
                        .iter()
                        .filter(|c| !self.cache.contains_key(*c))
                        .map(|&c| (c, false)),
                );
            }
        }

        self.cache.get(&id).copied().unwrap_or(0)
    }
}

/// Find the container for a text node, or `None` when the text has no parent
/// element below the document root.
pub fn resolve_container(doc: &Document, text_node: NodeId) -> Option<NodeId> {
    resolve_container_with(&mut TextLengths::new(doc), text_node)
}

/// [`resolve_container`] sharing a length cache across calls in one pass.
pub fn resolve_container_with(lengths: &mut TextLengths<'_>, text_node: NodeId) -> Option<NodeId> {
    let doc = lengths.doc;
    let root = doc.body();
    let mut current = doc.parent(text_node)?;
    if current == root || !doc.is_element(current) {
        return None;
    }

    let mut current_len = lengths.get(current);
    while current_len < MAX_CONTAINER_TEXT {
        let Some(parent) = doc.parent(current) else {
            break;
        };
        if parent == root {
            break;
        }
        let parent_len = lengths.get(parent);
        if parent_len as f64 > current_len as f64 * MAX_PARENT_GROWTH {
            break;
        }
        current = parent;
        current_len = parent_len;
    }

    Some(current)
}
