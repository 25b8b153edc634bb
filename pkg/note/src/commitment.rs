use borsh::{BorshDeserialize, BorshSerialize};
use rg_primitives::aes::{BlockCiphertext, Ciphertext};
use rg_primitives::jubjub::PackedPoint;
use rg_primitives::Element;
use serde::{Deserialize, Serialize};

use crate::{Note, Result};

/// A commitment observed on chain
///
/// Deposits are generated in cleartext (the preimage is public calldata);
/// transfer outputs arrive encrypted to the recipient.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum Commitment {
    Generated(Note),
    Encrypted(EncryptedCommitment),
}

/// An encrypted transfer output, as emitted by the contract
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EncryptedCommitment {
    /// The leaf value (the contract computes and emits it)
    pub hash: Element,
    /// The sender's ephemeral public key, for the recipient-side ECDH
    pub sender_pubkey: PackedPoint,
    /// The three-block note ciphertext
    pub ciphertext: BlockCiphertext,
    /// The recipient shared secret wrapped under the sender's view key
    pub reveal_key: Ciphertext,
}

impl Commitment {
    /// The leaf value inserted into the commitment tree
    pub fn leaf(&self) -> Result<Element> {
        match self {
            Commitment::Generated(note) => note.commitment(),
            Commitment::Encrypted(commitment) => Ok(commitment.hash),
        }
    }
}
