use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};
use rg_note::Note;
use rg_primitives::{Element, TxId};

/// A persisted transaction output owned by the wallet
///
/// Created when a scan decrypts a commitment addressed to one of the
/// wallet's derived keys. The only mutation a record ever sees is
/// `spend_txid` being set once, when its nullifier shows up on chain;
/// records are never deleted.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxoRecord {
    pub tree: u64,
    pub position: u64,
    /// Derivation index the note was received at
    pub index: u64,
    /// Whether the note sits under the change sub-tree
    pub change: bool,
    pub txid: TxId,
    pub spend_txid: Option<TxId>,
    pub nullifier: Element,
    pub note: Note,
}

impl TxoRecord {
    #[must_use]
    pub fn is_unspent(&self) -> bool {
        self.spend_txid.is_none()
    }
}

/// Unspent value grouped by token
pub type Balances = HashMap<Element, TokenBalance>;

/// Unspent value grouped by token, then by tree
pub type BalancesByTree = HashMap<Element, HashMap<u64, TokenBalance>>;

/// The unspent TXOs of one token (within one grouping)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenBalance {
    pub balance: u128,
    pub utxos: Vec<TxoRecord>,
}

impl TokenBalance {
    pub fn push(&mut self, record: TxoRecord) {
        self.balance += record.note.amount;
        self.utxos.push(record);
    }
}
