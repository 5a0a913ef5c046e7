// HTML import: builds a Document from a page's markup.
//
// Parsing goes through scraper (html5ever underneath), so malformed markup is
// repaired the same way a browser would before we copy the body subtree into
// our arena. Comments, doctypes and processing instructions are dropped.

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Node, Selector};

use super::tree::{Document, NodeId};

/// Parse `markup` into a document for the page at `url`.
pub fn parse_html(markup: &str, url: &str) -> Result<Document> {
    let html = Html::parse_document(markup);
    let body_selector =
        Selector::parse("body").map_err(|e| anyhow::anyhow!("Invalid selector: {e}"))?;
    let body = html
        .select(&body_selector)
        .next()
        .context("Parsed document has no body element")?;

    let mut doc = Document::new(url);
    let root = doc.body();
    for (name, value) in body.value().attrs() {
        doc.set_attribute(root, name, value)?;
    }
    copy_children(&mut doc, root, body)?;
    Ok(doc)
}

fn copy_children(doc: &mut Document, parent: NodeId, element: ElementRef<'_>) -> Result<()> {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let id = doc.create_text(text);
                doc.append_child(parent, id)?;
            }
            Node::Element(data) => {
                let id = doc.create_element(data.name());
                for (name, value) in data.attrs() {
                    doc.set_attribute(id, name, value)?;
                }
                doc.append_child(parent, id)?;
                if let Some(child) = ElementRef::wrap(child) {
                    copy_children(doc, id, child)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
