// Mutation records emitted by the document while an observer is connected.

use super::tree::NodeId;

/// One change to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were inserted under `target`.
    ChildList { target: NodeId, added: Vec<NodeId> },
    /// The text of a text node was replaced in place.
    CharacterData { target: NodeId },
}

/// Records delivered together, in the order they happened.
pub type MutationBatch = Vec<MutationRecord>;
