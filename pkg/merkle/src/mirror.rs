use std::collections::HashMap;

use parking_lot::RwLock;
use rg_note::Commitment;
use rg_primitives::{Element, TxId};

use crate::{CommitmentTree, Error, MerklePath, Result};

/// The shared, append-only shadow of one chain's commitment trees
///
/// A mirror is fed by the contract adapter (commitment batches and
/// nullifiers, in event order) and read by every wallet on the chain. All
/// methods take `&self`; interior locking keeps readers cheap.
pub struct TreeMirror {
    chain_id: u64,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    trees: Vec<TreeState>,
    nullifiers: HashMap<Element, TxId>,
}

struct TreeState {
    tree: CommitmentTree,
    /// Full commitment data per position, retained so wallets can scan
    /// ciphertexts without refetching chain history
    commitments: Vec<(Commitment, TxId)>,
}

impl TreeMirror {
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            inner: RwLock::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The highest tree number seen so far (0 if no events have arrived)
    #[must_use]
    pub fn latest_tree(&self) -> u64 {
        let inner = self.inner.read();
        inner.trees.len().saturating_sub(1) as u64
    }

    /// The number of leaves in a tree (0 for a tree the mirror has not seen)
    #[must_use]
    pub fn leaf_count(&self, tree_number: u64) -> u64 {
        let inner = self.inner.read();
        inner
            .trees
            .get(tree_number as usize)
            .map_or(0, |state| state.tree.leaf_count())
    }

    /// Apply a commitment batch at `start_position` of `tree_number`
    ///
    /// Batches must arrive in event order: `start_position` has to equal the
    /// tree's current leaf count.
    pub fn insert_commitments(
        &self,
        tree_number: u64,
        start_position: u64,
        entries: &[(Commitment, TxId)],
    ) -> Result<()> {
        let leaves = entries
            .iter()
            .map(|(commitment, _)| commitment.leaf())
            .collect::<Result<Vec<_>, _>>()?;

        let mut inner = self.inner.write();

        while inner.trees.len() <= tree_number as usize {
            inner.trees.push(TreeState {
                tree: CommitmentTree::new(),
                commitments: Vec::new(),
            });
        }

        let state = &mut inner.trees[tree_number as usize];
        let expected = state.tree.leaf_count();
        if start_position != expected {
            return Err(Error::OutOfOrder {
                expected,
                got: start_position,
            });
        }

        state.tree.append(&leaves)?;
        state.commitments.extend_from_slice(entries);

        Ok(())
    }

    /// The current root of a tree
    pub fn root(&self, tree_number: u64) -> Result<Element> {
        let inner = self.inner.read();
        let state = inner
            .trees
            .get(tree_number as usize)
            .ok_or(Error::UnknownTree(tree_number))?;
        Ok(state.tree.root())
    }

    /// Whether `root` is inside the retained history window of a tree
    #[must_use]
    pub fn known_root(&self, tree_number: u64, root: Element) -> bool {
        let inner = self.inner.read();
        inner
            .trees
            .get(tree_number as usize)
            .is_some_and(|state| state.tree.known_root(root))
    }

    /// Extract the sibling path for a leaf
    pub fn proof(&self, tree_number: u64, position: u64) -> Result<MerklePath> {
        let inner = self.inner.read();
        let state = inner
            .trees
            .get(tree_number as usize)
            .ok_or(Error::UnknownTree(tree_number))?;
        state.tree.path(position)
    }

    /// Commitments of a tree from `start` onwards, with their positions
    #[must_use]
    pub fn commitments_from(&self, tree_number: u64, start: u64) -> Vec<(u64, Commitment, TxId)> {
        let inner = self.inner.read();
        let Some(state) = inner.trees.get(tree_number as usize) else {
            return Vec::new();
        };

        state
            .commitments
            .iter()
            .enumerate()
            .skip(start as usize)
            .map(|(position, (commitment, txid))| (position as u64, commitment.clone(), *txid))
            .collect()
    }

    /// Record an observed spend
    pub fn mark_nullified(&self, nullifier: Element, txid: TxId) {
        self.inner.write().nullifiers.insert(nullifier, txid);
    }

    /// The transaction that spent `nullifier`, if one has been observed
    #[must_use]
    pub fn get_nullified(&self, nullifier: Element) -> Option<TxId> {
        self.inner.read().nullifiers.get(&nullifier).copied()
    }
}

#[cfg(test)]
mod tests {
    use rg_note::Note;
    use rg_primitives::jubjub::Keypair;

    use super::*;

    fn entry(seed: u64) -> (Commitment, TxId) {
        let keypair = Keypair::from_seed(&seed.to_be_bytes());
        let note = Note::with_random(
            keypair.public_key,
            Element::new(seed),
            100,
            Element::new(1),
        );
        (Commitment::Generated(note), [seed as u8; 32])
    }

    #[test]
    fn inserts_must_be_in_order() {
        let mirror = TreeMirror::new(1);

        mirror.insert_commitments(0, 0, &[entry(1), entry(2)]).unwrap();
        assert_eq!(mirror.leaf_count(0), 2);

        let err = mirror.insert_commitments(0, 5, &[entry(3)]).unwrap_err();
        assert!(matches!(err, Error::OutOfOrder { expected: 2, got: 5 }));

        mirror.insert_commitments(0, 2, &[entry(3)]).unwrap();
        assert_eq!(mirror.leaf_count(0), 3);
    }

    #[test]
    fn proof_matches_commitment_leaf() {
        let mirror = TreeMirror::new(1);
        let (commitment, txid) = entry(9);

        mirror
            .insert_commitments(0, 0, &[(commitment.clone(), txid)])
            .unwrap();

        let proof = mirror.proof(0, 0).unwrap();
        let root = mirror.root(0).unwrap();
        assert_eq!(proof.compute_root(commitment.leaf().unwrap()), root);
        assert!(mirror.known_root(0, root));
    }

    #[test]
    fn later_trees_are_created_on_demand() {
        let mirror = TreeMirror::new(1);
        mirror.insert_commitments(2, 0, &[entry(4)]).unwrap();

        assert_eq!(mirror.latest_tree(), 2);
        assert_eq!(mirror.leaf_count(0), 0);
        assert_eq!(mirror.leaf_count(2), 1);
    }

    #[test]
    fn nullifier_index() {
        let mirror = TreeMirror::new(1);
        let nullifier = Element::new(77);

        assert_eq!(mirror.get_nullified(nullifier), None);

        mirror.mark_nullified(nullifier, [1; 32]);
        assert_eq!(mirror.get_nullified(nullifier), Some([1; 32]));
    }

    #[test]
    fn commitments_from_skips_scanned_prefix() {
        let mirror = TreeMirror::new(1);
        mirror
            .insert_commitments(0, 0, &[entry(1), entry(2), entry(3)])
            .unwrap();

        let tail = mirror.commitments_from(0, 1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].0, 1);
        assert_eq!(tail[1].0, 2);
    }
}
