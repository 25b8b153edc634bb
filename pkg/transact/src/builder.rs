use rand::rngs::OsRng;
use rg_merkle::{MerklePath, TreeMirror};
use rg_note::{nullifier, Note};
use rg_primitives::aes::{self, BlockCiphertext, Ciphertext};
use rg_primitives::jubjub::{self, Keypair, PackedPoint};
use rg_primitives::{digest, Element};
use rg_store::KeyValueStore;
use rg_wallet::{TokenBalance, TxoRecord, Wallet};
use tracing::debug;

use crate::{
    AdaptId, CircuitKind, Erc20PrivateInputs, Error, Result, SpendInput, LARGE_INPUTS,
    MAX_REAL_OUTPUTS, OUTPUTS, SMALL_INPUTS,
};

/// An ERC-20 spend request
///
/// `deposit` is plaintext value arriving from the public side of the
/// contract; `withdraw` leaves the shielded pool to `withdraw_address`.
/// `outputs` are the recipient notes (at most two; a change note fills the
/// third slot). Set `tree` to pin UTXO selection to one tree.
#[derive(Clone, Debug)]
pub struct Erc20Transaction {
    pub chain_id: u64,
    pub token: Element,
    pub deposit: u128,
    pub withdraw: u128,
    pub withdraw_address: Option<Element>,
    pub outputs: Vec<Note>,
    pub tree: Option<u64>,
    pub adapt_id: AdaptId,
}

impl Erc20Transaction {
    #[must_use]
    pub fn new(chain_id: u64, token: Element) -> Self {
        Self {
            chain_id,
            token,
            deposit: 0,
            withdraw: 0,
            withdraw_address: None,
            outputs: Vec::new(),
            tree: None,
            adapt_id: AdaptId::default(),
        }
    }

    /// Select UTXOs, pad to a circuit arity, encrypt the outputs and
    /// assemble the witness
    ///
    /// This performs no proving; hand the result to [`Prover::prove`].
    ///
    /// [`Prover::prove`]: crate::Prover::prove
    pub fn generate_inputs<S: KeyValueStore>(
        &self,
        wallet: &Wallet<S>,
        mirror: &TreeMirror,
    ) -> Result<BuiltTransaction> {
        if self.outputs.len() > MAX_REAL_OUTPUTS {
            return Err(Error::TooManyOutputs);
        }
        if self.outputs.iter().any(|output| output.token != self.token) {
            return Err(Error::TokenMismatch);
        }

        let target: u128 = self.outputs.iter().map(|output| output.amount).sum::<u128>()
            + self.withdraw;
        let required = target.saturating_sub(self.deposit);

        let (tree_number, selected, dummies) = self.select_utxos(wallet, mirror, required)?;

        match (self.withdraw > 0, self.withdraw_address.is_some()) {
            (true, false) => {
                return Err(Error::WithdrawConfig("withdraw amount set without an address"))
            }
            (false, true) => {
                return Err(Error::WithdrawConfig("withdraw address set without an amount"))
            }
            _ => {}
        }

        let total_in: u128 =
            selected.iter().map(|record| record.note.amount).sum::<u128>() + self.deposit;
        let change_amount = total_in - target;

        // outputs ∪ {change}, padded with dummies up to the output arity
        let change_keypair = wallet.change_keypair(0);
        let mut out_notes = self.outputs.clone();
        out_notes.push(Note::new(
            change_keypair.public_key,
            change_amount,
            self.token,
        ));
        while out_notes.len() < OUTPUTS {
            let throwaway = Keypair::random(&mut OsRng);
            out_notes.push(Note::new(throwaway.public_key, 0, self.token));
        }

        let ciphertexts = out_notes
            .iter()
            .map(|note| CommitmentCiphertext::seal(note, &wallet.view_key()))
            .collect::<Result<Vec<_>>>()?;
        let ciphertext_hash = hash_ciphertexts(&ciphertexts)?;

        let merkle_root = if selected.is_empty() {
            // a deposit-only spend touches no leaves; any known root binds
            mirror.root(tree_number).unwrap_or(Element::ZERO)
        } else {
            mirror.root(tree_number)?
        };

        let mut inputs = Vec::with_capacity(selected.len() + dummies);
        for record in &selected {
            let keypair = wallet.keypair_for(record);
            inputs.push(SpendInput {
                spending_key: keypair.private_key,
                random: record.note.random,
                value: record.note.amount,
                path: mirror.proof(tree_number, record.position)?,
                position: record.position,
                nullifier: record.nullifier,
            });
        }
        for _ in 0..dummies {
            let throwaway = Keypair::random(&mut OsRng);
            inputs.push(SpendInput {
                spending_key: throwaway.private_key,
                random: Note::new(throwaway.public_key, 0, self.token).random,
                value: 0,
                path: MerklePath::zeroed(),
                position: 0,
                nullifier: nullifier(throwaway.private_key, tree_number, 0),
            });
        }

        let circuit = match inputs.len() {
            SMALL_INPUTS => CircuitKind::Erc20Small,
            _ => CircuitKind::Erc20Large,
        };

        let mut recipient_pubkeys = Vec::with_capacity(OUTPUTS);
        let mut commitments_out = Vec::with_capacity(OUTPUTS);
        for note in &out_notes {
            recipient_pubkeys.push(jubjub::unpack_point_coords(&note.pubkey)?);
            commitments_out.push(note.commitment()?);
        }

        let private = Erc20PrivateInputs {
            adapt_id: self.adapt_id,
            token: self.token,
            deposit_amount: self.deposit,
            withdraw_amount: self.withdraw,
            output_token_field: match self.deposit > 0 || self.withdraw > 0 {
                true => self.token,
                false => Element::ZERO,
            },
            output_eth_address: self.withdraw_address.unwrap_or(Element::ZERO),
            inputs,
            tree_number,
            merkle_root,
            recipient_pubkeys,
            random_out: out_notes.iter().map(|note| note.random).collect(),
            values_out: out_notes.iter().map(|note| note.amount).collect(),
            commitments_out,
            ciphertext_hash,
        };
        private.validate()?;

        debug!(
            tree = tree_number,
            inputs = private.inputs.len(),
            real = selected.len(),
            "assembled spend witness"
        );

        Ok(BuiltTransaction {
            circuit,
            inputs: private,
            outputs: out_notes,
            ciphertexts,
            spent: selected,
        })
    }

    /// Pick a tree and the UTXOs to spend from it
    ///
    /// Greedy descending selection, padded to the next circuit arity with
    /// the tree's smallest remaining UTXOs where available and dummies
    /// otherwise. A tree whose cover needs more than the large arity is
    /// unusable; if every tree is unusable the spend needs consolidation.
    fn select_utxos<S: KeyValueStore>(
        &self,
        wallet: &Wallet<S>,
        mirror: &TreeMirror,
        required: u128,
    ) -> Result<(u64, Vec<TxoRecord>, usize)> {
        let mut by_tree = wallet
            .balances_by_tree(self.chain_id, mirror)?
            .remove(&self.token)
            .unwrap_or_default();

        let have: u128 = by_tree.values().map(|balance| balance.balance).sum();
        if have < required {
            return Err(Error::InsufficientBalance {
                have,
                need: required,
            });
        }

        let mut trees: Vec<u64> = match self.tree {
            Some(pinned) => vec![pinned],
            None => {
                let mut trees: Vec<u64> = by_tree.keys().copied().collect();
                trees.sort_unstable();
                trees
            }
        };

        // nothing to pull in: any tree works, all inputs are dummies
        if required == 0 {
            let tree = trees.first().copied().unwrap_or(0);
            return Ok((tree, Vec::new(), SMALL_INPUTS));
        }

        for tree in trees.drain(..) {
            let Some(TokenBalance { balance, mut utxos }) = by_tree.remove(&tree) else {
                continue;
            };
            if balance < required {
                continue;
            }

            utxos.sort_by(|a, b| b.note.amount.cmp(&a.note.amount));

            let mut selected = Vec::new();
            let mut covered = 0u128;
            while covered < required {
                let record = utxos.remove(0);
                covered += record.note.amount;
                selected.push(record);
            }

            if selected.len() > LARGE_INPUTS {
                continue;
            }

            let arity = match selected.len() <= SMALL_INPUTS {
                true => SMALL_INPUTS,
                false => LARGE_INPUTS,
            };

            // prefer sweeping up real dust over inserting dummies
            while selected.len() < arity {
                match utxos.pop() {
                    Some(smallest) => selected.push(smallest),
                    None => break,
                }
            }

            let dummies = arity - selected.len();
            return Ok((tree, selected, dummies));
        }

        Err(Error::NeedsConsolidation)
    }
}

/// A fully assembled spend, ready for the prover
pub struct BuiltTransaction {
    pub circuit: CircuitKind,
    pub inputs: Erc20PrivateInputs,
    /// The three output notes (real, change, dummies) in slot order
    pub outputs: Vec<Note>,
    /// The per-output ciphertext bundle, in the same slot order
    pub ciphertexts: Vec<CommitmentCiphertext>,
    /// The real TXO records being spent
    pub spent: Vec<TxoRecord>,
}

/// The encrypted payload published alongside one output commitment
#[derive(Clone, Debug)]
pub struct CommitmentCiphertext {
    /// The sender's ephemeral public key
    pub sender_pubkey: PackedPoint,
    /// The note, encrypted to the recipient's ECDH shared key
    pub ciphertext: BlockCiphertext,
    /// The shared key itself, wrapped under the sender's view key for audit
    pub reveal_key: Ciphertext,
}

impl CommitmentCiphertext {
    /// Encrypt a note under a fresh ephemeral sender key
    pub fn seal(note: &Note, view_key: &[u8; 32]) -> Result<Self> {
        let sender = Keypair::random(&mut OsRng);
        let shared = jubjub::ecdh(sender.private_key, &note.pubkey)?;

        Ok(Self {
            sender_pubkey: sender.public_key,
            ciphertext: note.encrypt(&shared),
            reveal_key: aes::encrypt(&shared, view_key),
        })
    }

    /// The 32-byte words that feed the ciphertext hash and the calldata:
    /// `senderPubKey.x, .y, ciphertext words, reveal-key words`
    pub fn to_words(&self) -> Result<Vec<[u8; 32]>> {
        let (x, y) = jubjub::unpack_point_coords(&self.sender_pubkey)?;

        let mut words = vec![x.to_be_bytes(), y.to_be_bytes()];
        words.extend(self.ciphertext.to_words());

        let mut reveal_iv = [0u8; 32];
        reveal_iv[16..].copy_from_slice(&self.reveal_key.iv);
        words.push(reveal_iv);
        for chunk in self.reveal_key.data.chunks(32) {
            let mut word = [0u8; 32];
            word[..chunk.len()].copy_from_slice(chunk);
            words.push(word);
        }

        Ok(words)
    }
}

/// `sha256` over every output's words, reduced mod p
///
/// The hash is part of the public inputs, so the ciphertexts cannot be
/// swapped out after proving.
pub(crate) fn hash_ciphertexts(ciphertexts: &[CommitmentCiphertext]) -> Result<Element> {
    let mut bytes = Vec::new();
    for ciphertext in ciphertexts {
        for word in ciphertext.to_words()? {
            bytes.extend_from_slice(&word);
        }
    }
    Ok(digest::sha256_to_element(&bytes))
}
