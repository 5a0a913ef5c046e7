// Document tree: the rendered page the engine inspects and mutates.
//
// The tree is an arena of element and text nodes keyed by generational ids,
// so a node removed by the host while a classifier call is in flight simply
// stops resolving instead of aliasing a new node. Structural and text edits
// are recorded as mutation records and delivered in batches to whoever is
// observing (the mutation tracker).

pub mod html;
pub mod mutation;
pub mod tree;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use mutation::{MutationBatch, MutationRecord};
pub use tree::{Document, ElementData, NodeId, NodeKind};

/// A document shared between the host (which edits it) and the engine.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Wrap a document for sharing.
pub fn share(document: Document) -> SharedDocument {
    Arc::new(Mutex::new(document))
}

/// Lock a shared document.
///
/// Every critical section over the tree is synchronous, so a panic while
/// holding the lock leaves no half-applied async state behind; recover the
/// guard instead of propagating the poison.
pub fn lock(document: &SharedDocument) -> MutexGuard<'_, Document> {
    document.lock().unwrap_or_else(PoisonError::into_inner)
}
