use borsh::{BorshDeserialize, BorshSerialize};
use rg_primitives::{merge_hash, Element};
use serde::{Deserialize, Serialize};

use crate::TREE_DEPTH;

/// A sibling path from a leaf to the root of a [`CommitmentTree`]
///
/// `elements[i]` is the sibling hash at level `i` (deepest first) and
/// `indices[i]` is the position bit at that level: `false` means the leaf's
/// ancestor is the left child.
///
/// [`CommitmentTree`]: crate::CommitmentTree
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MerklePath {
    pub elements: [Element; TREE_DEPTH],
    pub indices: [bool; TREE_DEPTH],
}

impl MerklePath {
    /// Compute the root this path yields for a given leaf value
    ///
    /// ```rust
    /// # use rg_merkle::*;
    /// # use rg_primitives::Element;
    /// let mut tree = CommitmentTree::new();
    /// tree.append(&[Element::new(7)]).unwrap();
    ///
    /// let path = tree.path(0).unwrap();
    /// assert_eq!(path.compute_root(Element::new(7)), tree.root());
    /// assert_ne!(path.compute_root(Element::new(8)), tree.root());
    /// ```
    #[must_use]
    pub fn compute_root(&self, leaf: Element) -> Element {
        self.elements
            .iter()
            .zip(self.indices.iter())
            .fold(leaf, |node, (&sibling, &is_right)| match is_right {
                true => merge_hash(sibling, node),
                false => merge_hash(node, sibling),
            })
    }

    /// The all-zero path used for dummy spend inputs
    ///
    /// Dummy inputs carry amount zero, so the circuit skips their inclusion
    /// check; the protocol fixes their path elements to literal zeroes.
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            elements: [Element::ZERO; TREE_DEPTH],
            indices: [false; TREE_DEPTH],
        }
    }

    /// The leaf position these index bits encode
    #[must_use]
    pub fn position(&self) -> u64 {
        self.indices
            .iter()
            .enumerate()
            .filter(|(_, &bit)| bit)
            .map(|(level, _)| 1u64 << level)
            .sum()
    }
}
