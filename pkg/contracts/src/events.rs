use rg_merkle::TreeMirror;
use rg_note::{Commitment, EncryptedCommitment, Note};
use rg_primitives::{Element, TxId};

use crate::Result;

/// A decoded shield-contract event
///
/// Exactly three events drive the core: cleartext deposit batches,
/// encrypted transfer batches, and spent nullifiers.
#[derive(Clone, Debug)]
pub enum ShieldEvent {
    GeneratedCommitmentBatch {
        tree: u64,
        start_position: u64,
        commitments: Vec<Note>,
        txid: TxId,
    },
    CommitmentBatch {
        tree: u64,
        start_position: u64,
        commitments: Vec<EncryptedCommitment>,
        txid: TxId,
    },
    Nullifier {
        nullifier: Element,
        txid: TxId,
    },
}

/// Feed decoded events into a mirror, in event order
pub fn apply_events(mirror: &TreeMirror, events: &[ShieldEvent]) -> Result<()> {
    for event in events {
        match event {
            ShieldEvent::GeneratedCommitmentBatch {
                tree,
                start_position,
                commitments,
                txid,
            } => {
                let entries: Vec<_> = commitments
                    .iter()
                    .map(|note| (Commitment::Generated(note.clone()), *txid))
                    .collect();
                mirror.insert_commitments(*tree, *start_position, &entries)?;
            }
            ShieldEvent::CommitmentBatch {
                tree,
                start_position,
                commitments,
                txid,
            } => {
                let entries: Vec<_> = commitments
                    .iter()
                    .map(|commitment| (Commitment::Encrypted(commitment.clone()), *txid))
                    .collect();
                mirror.insert_commitments(*tree, *start_position, &entries)?;
            }
            ShieldEvent::Nullifier { nullifier, txid } => {
                mirror.mark_nullified(*nullifier, *txid);
            }
        }
    }

    Ok(())
}
