use std::collections::VecDeque;

use rg_primitives::{merge_hash, Element};

use crate::{empty_hash_at, Error, MerklePath, Result};

/// Depth of the on-chain ERC-20 commitment trees (a protocol constant)
pub const TREE_DEPTH: usize = 16;

/// How many historical roots the contract retains
///
/// A proof may be submitted against any root still in the ring, so the
/// mirror keeps the same window.
pub const ROOT_HISTORY: usize = 100;

/// An append-only shadow of one on-chain commitment tree
///
/// Leaves are note commitments at consecutive positions; internal nodes are
/// 2-ary Poseidon, and absent subtrees hash as if filled with the zero leaf
/// (see [`empty_hash_at`]).
///
/// ```rust
/// # use rg_merkle::*;
/// # use rg_primitives::Element;
/// let mut tree = CommitmentTree::new();
/// let empty_root = tree.root();
///
/// tree.append(&[Element::new(1), Element::new(2)]).unwrap();
/// assert_ne!(tree.root(), empty_root);
///
/// let path = tree.path(0).unwrap();
/// assert_eq!(path.compute_root(Element::new(1)), tree.root());
/// ```
#[derive(Debug, Clone)]
pub struct CommitmentTree {
    /// `levels[0]` holds the leaves; `levels[TREE_DEPTH]` holds the root
    levels: Vec<Vec<Element>>,
    roots: VecDeque<Element>,
}

impl Default for CommitmentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitmentTree {
    /// Creates a new, empty tree
    #[must_use]
    pub fn new() -> Self {
        let mut roots = VecDeque::with_capacity(ROOT_HISTORY);
        roots.push_back(empty_hash_at(TREE_DEPTH));

        Self {
            levels: vec![Vec::new(); TREE_DEPTH + 1],
            roots,
        }
    }

    /// The number of leaves appended so far
    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        self.levels[0].len() as u64
    }

    /// The current root hash
    #[must_use]
    pub fn root(&self) -> Element {
        self.levels[TREE_DEPTH]
            .first()
            .copied()
            .unwrap_or_else(|| empty_hash_at(TREE_DEPTH))
    }

    /// Whether `root` is the current root or still inside the retained
    /// history window
    #[must_use]
    pub fn known_root(&self, root: Element) -> bool {
        self.roots.contains(&root)
    }

    /// Append commitments at the next positions and record the new root in
    /// the history ring
    pub fn append(&mut self, leaves: &[Element]) -> Result<()> {
        if self.levels[0].len() + leaves.len() > 1usize << TREE_DEPTH {
            return Err(Error::TreeFull);
        }

        for &leaf in leaves {
            let position = self.levels[0].len();
            self.levels[0].push(leaf);
            self.update_parents(position);
        }

        if !leaves.is_empty() {
            if self.roots.len() == ROOT_HISTORY {
                self.roots.pop_front();
            }
            self.roots.push_back(self.root());
        }

        Ok(())
    }

    /// The sibling path for the leaf at `position`
    pub fn path(&self, position: u64) -> Result<MerklePath> {
        if position >= self.leaf_count() {
            return Err(Error::PositionOutOfRange {
                position,
                len: self.leaf_count(),
            });
        }

        let mut elements = [Element::ZERO; TREE_DEPTH];
        let mut indices = [false; TREE_DEPTH];
        let mut index = position as usize;

        for level in 0..TREE_DEPTH {
            let sibling = index ^ 1;
            elements[level] = self.levels[level]
                .get(sibling)
                .copied()
                .unwrap_or_else(|| empty_hash_at(level));
            indices[level] = index & 1 == 1;
            index /= 2;
        }

        Ok(MerklePath { elements, indices })
    }

    // Recompute the internal nodes on the way from a changed leaf to the root
    fn update_parents(&mut self, leaf_index: usize) {
        let mut index = leaf_index;

        for level in 0..TREE_DEPTH {
            let parent = index / 2;
            let left_index = parent * 2;

            let left = self.levels[level][left_index];
            let right = self.levels[level]
                .get(left_index + 1)
                .copied()
                .unwrap_or_else(|| empty_hash_at(level));

            let hash = merge_hash(left, right);
            let parents = &mut self.levels[level + 1];
            if parent == parents.len() {
                parents.push(hash);
            } else {
                parents[parent] = hash;
            }

            index = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn empty_tree_root_is_the_empty_ladder_top() {
        let tree = CommitmentTree::new();
        assert_eq!(tree.root(), empty_hash_at(TREE_DEPTH));
        assert!(tree.known_root(tree.root()));
    }

    #[test]
    fn appends_change_the_root() {
        let mut tree = CommitmentTree::new();
        let mut seen = vec![tree.root()];

        for i in 1..=8u64 {
            tree.append(&[Element::new(i)]).unwrap();
            assert!(!seen.contains(&tree.root()));
            seen.push(tree.root());
        }

        assert_eq!(tree.leaf_count(), 8);
    }

    #[test]
    fn historical_roots_stay_known() {
        let mut tree = CommitmentTree::new();

        tree.append(&[Element::new(1)]).unwrap();
        let old_root = tree.root();

        tree.append(&[Element::new(2), Element::new(3)]).unwrap();

        assert!(tree.known_root(old_root));
        assert!(tree.known_root(tree.root()));
        assert!(!tree.known_root(Element::new(999)));
    }

    #[test]
    fn root_ring_is_bounded() {
        let mut tree = CommitmentTree::new();
        let initial = tree.root();

        for i in 0..ROOT_HISTORY as u64 {
            tree.append(&[Element::new(i + 1)]).unwrap();
        }

        // the initial root has been pushed out of the window
        assert!(!tree.known_root(initial));
    }

    #[test]
    fn batched_and_single_appends_agree() {
        let leaves: Vec<Element> = (1..=5).map(Element::new).collect();

        let mut batched = CommitmentTree::new();
        batched.append(&leaves).unwrap();

        let mut single = CommitmentTree::new();
        for leaf in &leaves {
            single.append(std::slice::from_ref(leaf)).unwrap();
        }

        assert_eq!(batched.root(), single.root());
    }

    #[test]
    fn path_out_of_range() {
        let tree = CommitmentTree::new();
        assert!(matches!(
            tree.path(0),
            Err(Error::PositionOutOfRange { .. })
        ));
    }

    #[proptest]
    fn every_path_reconstructs_the_root(#[strategy(1usize..40)] count: usize) {
        let leaves: Vec<Element> = (0..count as u64).map(|i| Element::new(i * 7 + 1)).collect();

        let mut tree = CommitmentTree::new();
        tree.append(&leaves).unwrap();

        for (position, leaf) in leaves.iter().enumerate() {
            let path = tree.path(position as u64).unwrap();
            assert_eq!(path.compute_root(*leaf), tree.root());

            // the wrong leaf never reconstructs the root
            assert_ne!(path.compute_root(*leaf + 1u64), tree.root());
        }
    }
}
