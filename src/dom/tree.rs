// Arena-backed document tree.
//
// The body element is the document root for every engine operation: the
// container resolver never climbs onto it and scans default to it.

use anyhow::Result;
use slotmap::{new_key_type, SlotMap};
use tokio::sync::mpsc;
use tracing::debug;

use super::mutation::{MutationBatch, MutationRecord};

new_key_type! {
    /// Identity of a node in a [`Document`]. Stale ids stop resolving once the
    /// node is removed.
    pub struct NodeId;
}

/// Elements serialised without a closing tag.
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    /// Attributes other than `class`, in source order.
    pub attrs: Vec<(String, String)>,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    body: NodeId,
    url: String,
    observer: Option<mpsc::UnboundedSender<MutationBatch>>,
    pending: MutationBatch,
}

impl Document {
    /// Create an empty document for the page at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(Node {
            kind: NodeKind::Element(ElementData {
                tag: "body".to_string(),
                attrs: Vec::new(),
                classes: Vec::new(),
            }),
            parent: None,
            children: Vec::new(),
        });
        Self {
            nodes,
            body,
            url: url.into(),
            observer: None,
            pending: Vec::new(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    /// Text of a text node, `None` for elements and stale ids.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    /// The node itself followed by each ancestor up to the body.
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.contains(id).then_some(id), move |&n| self.parent(n))
    }

    /// Nodes under `root` (inclusive) in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let Some(t) = self.text(n) {
                out.push_str(t);
            }
        }
        out
    }

    /// Length of [`text_content`](Self::text_content) in characters.
    pub fn text_len(&self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        let mut total = 0;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match &self.nodes[n].kind {
                NodeKind::Text(t) => total += t.chars().count(),
                NodeKind::Element(_) => stack.extend_from_slice(&self.nodes[n].children),
            }
        }
        total
    }

    // --- Construction ---

    /// Create a detached element. It becomes part of the page once appended.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node {
            kind: NodeKind::Element(ElementData {
                tag: tag.to_ascii_lowercase(),
                attrs: Vec::new(),
                classes: Vec::new(),
            }),
            parent: None,
            children: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node {
            kind: NodeKind::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        if name.eq_ignore_ascii_case("class") {
            element.classes = value.split_whitespace().map(str::to_string).collect();
            return Ok(());
        }
        match element.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => element.attrs.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Add `class` to an element. Returns false if it was already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<bool> {
        let element = self.element_mut(id)?;
        if element.classes.iter().any(|c| c == class) {
            return Ok(false);
        }
        element.classes.push(class.to_string());
        Ok(true)
    }

    // --- Tree edits (recorded while observed) ---

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertion(parent, child)?;
        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
        });
        Ok(())
    }

    /// Insert `node` immediately after `reference` under the same parent.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        let Some(parent) = self.parent(reference) else {
            anyhow::bail!("Cannot insert after a node without a parent");
        };
        self.check_insertion(parent, node)?;
        self.detach(node);
        let siblings = &mut self.nodes[parent].children;
        let index = siblings
            .iter()
            .position(|&c| c == reference)
            .map_or(siblings.len(), |i| i + 1);
        siblings.insert(index, node);
        self.nodes[node].parent = Some(parent);
        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![node],
        });
        Ok(())
    }

    /// Replace the text of a text node in place.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Text(t)) => {
                *t = text.to_string();
            }
            Some(NodeKind::Element(_)) => anyhow::bail!("set_text called on an element"),
            None => anyhow::bail!("Node no longer exists"),
        }
        self.record(MutationRecord::CharacterData { target: id });
        Ok(())
    }

    /// Remove a node and its whole subtree. Its ids stop resolving.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.body || !self.contains(id) {
            return;
        }
        self.detach(id);
        for n in self.descendants(id) {
            self.nodes.remove(n);
        }
    }

    // --- Observation ---

    /// Connect an observer. Any previously connected observer is replaced.
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<MutationBatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observer = Some(tx);
        self.pending.clear();
        rx
    }

    /// Stop recording mutations. Undelivered records are dropped.
    pub fn disconnect(&mut self) {
        self.observer = None;
        self.pending.clear();
    }

    pub fn is_observed(&self) -> bool {
        self.observer.is_some()
    }

    /// Deliver all records accumulated since the last flush as one batch.
    /// Returns the number of records delivered.
    pub fn flush_mutations(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let batch = std::mem::take(&mut self.pending);
        let count = batch.len();
        if let Some(tx) = &self.observer {
            if tx.send(batch).is_err() {
                debug!("Mutation observer went away, disconnecting");
                self.observer = None;
                return 0;
            }
        }
        count
    }

    // --- Serialisation ---

    /// Serialise the body subtree back to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(self.body, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(t)) => out.push_str(&escape(t, false)),
            Some(NodeKind::Element(e)) => {
                out.push('<');
                out.push_str(&e.tag);
                if !e.classes.is_empty() {
                    out.push_str(" class=\"");
                    out.push_str(&escape(&e.classes.join(" "), true));
                    out.push('"');
                }
                for (k, v) in &e.attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape(v, true));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&e.tag.as_str()) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&e.tag);
                out.push('>');
            }
            None => {}
        }
    }

    // --- Internals ---

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(e)) => Ok(e),
            Some(NodeKind::Text(_)) => anyhow::bail!("Expected an element, found a text node"),
            None => anyhow::bail!("Node no longer exists"),
        }
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.is_element(parent) {
            anyhow::bail!("Insertion parent must be a live element");
        }
        if !self.contains(child) {
            anyhow::bail!("Inserted node no longer exists");
        }
        if self.ancestors_inclusive(parent).any(|a| a == child) {
            anyhow::bail!("Cannot insert a node into its own subtree");
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes.get_mut(id).and_then(|n| n.parent.take()) {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }

    /// Whether `id` is connected to the body.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.ancestors_inclusive(id).any(|n| n == self.body)
    }

    /// Queue a record. Edits inside detached subtrees are not observable.
    fn record(&mut self, record: MutationRecord) {
        let target = match &record {
            MutationRecord::ChildList { target, .. } | MutationRecord::CharacterData { target } => {
                *target
            }
        };
        if self.observer.is_some() && self.is_attached(target) {
            self.pending.push(record);
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(doc: &mut Document, parent: NodeId, text: &str) -> (NodeId, NodeId) {
        let p = doc.create_element("p");
        let t = doc.create_text(text);
        doc.append_child(p, t).unwrap();
        doc.append_child(parent, p).unwrap();
        (p, t)
    }

    #[test]
    fn test_text_content_concatenates_in_document_order() {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        paragraph(&mut doc, body, "first ");
        paragraph(&mut doc, body, "second");
        assert_eq!(doc.text_content(body), "first second");
        assert_eq!(doc.text_len(body), 12);
    }

    #[test]
    fn test_text_len_counts_chars_not_bytes() {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        let (p, _) = paragraph(&mut doc, body, "héllo 👋");
        assert_eq!(doc.text_len(p), 7);
    }

    #[test]
    fn test_insert_after_places_sibling() {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        let (a, _) = paragraph(&mut doc, body, "a");
        let (c, _) = paragraph(&mut doc, body, "c");
        let b = doc.create_element("span");
        doc.insert_after(a, b).unwrap();
        assert_eq!(doc.children(body), &[a, b, c]);
    }

    #[test]
    fn test_remove_invalidates_subtree_ids() {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        let (p, t) = paragraph(&mut doc, body, "gone");
        doc.remove(p);
        assert!(!doc.contains(p));
        assert!(!doc.contains(t));
        assert!(doc.children(body).is_empty());
    }

    #[test]
    fn test_cannot_insert_into_own_subtree() {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        let (p, _) = paragraph(&mut doc, body, "x");
        let inner = doc.create_element("span");
        doc.append_child(p, inner).unwrap();
        assert!(doc.append_child(inner, p).is_err());
    }

    #[test]
    fn test_mutations_only_recorded_while_observed() {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        paragraph(&mut doc, body, "before");
        assert_eq!(doc.flush_mutations(), 0);

        let mut rx = doc.observe();
        // Filling the detached <p> is not observed, attaching it is
        let (_, t) = paragraph(&mut doc, body, "after");
        doc.set_text(t, "edited").unwrap();
        assert_eq!(doc.flush_mutations(), 2);

        let batch = rx.try_recv().unwrap();
        assert!(matches!(batch.last(), Some(MutationRecord::CharacterData { target }) if *target == t));

        doc.disconnect();
        doc.set_text(t, "unseen").unwrap();
        assert_eq!(doc.flush_mutations(), 0);
    }

    #[test]
    fn test_to_html_escapes_and_keeps_classes() {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        let (p, _) = paragraph(&mut doc, body, "a < b & c");
        doc.add_class(p, "note").unwrap();
        doc.set_attribute(p, "title", "say \"hi\"").unwrap();
        let br = doc.create_element("br");
        doc.append_child(body, br).unwrap();
        assert_eq!(
            doc.to_html(),
            "<body><p class=\"note\" title=\"say &quot;hi&quot;\">a &lt; b &amp; c</p><br></body>"
        );
    }

    #[test]
    fn test_add_class_is_idempotent() {
        let mut doc = Document::new("https://example.com/");
        let body = doc.body();
        let (p, _) = paragraph(&mut doc, body, "x");
        assert!(doc.add_class(p, "hidden").unwrap());
        assert!(!doc.add_class(p, "hidden").unwrap());
        assert_eq!(doc.element(p).unwrap().classes, vec!["hidden".to_string()]);
    }
}
