//! Calldata serialization for `generateDeposit` and `transact`
//!
//! All field-typed values are hex-left-padded to their declared widths;
//! the multi-asset tags (`tokenType`, `tokenSubID`) are fixed to the ERC-20
//! variant, the only one this library builds.

use ethereum_types::H160;
use rg_note::Note;
use rg_primitives::{jubjub, Element};
use rg_transact::{BuiltTransaction, CommitmentCiphertext, Proof};
use web3::ethabi::Token;

use crate::constants::TOKEN_TYPE_ERC20;
use crate::util::{element_to_h160, element_to_u256};
use crate::Result;

fn uint(element: Element) -> Token {
    Token::Uint(element_to_u256(element))
}

fn word_array(words: &[[u8; 32]]) -> Token {
    Token::Array(
        words
            .iter()
            .map(|word| Token::Uint(web3::types::U256::from_big_endian(word)))
            .collect(),
    )
}

/// The cleartext note preimage submitted with a deposit
#[derive(Clone, Debug)]
pub struct DepositPreimage {
    /// Unpacked recipient pubkey
    pub pubkey: (Element, Element),
    pub random: Element,
    pub amount: u128,
    pub token: Element,
}

impl DepositPreimage {
    pub fn from_note(note: &Note) -> Result<Self> {
        let pubkey = jubjub::unpack_point_coords(&note.pubkey)?;
        Ok(Self {
            pubkey,
            random: note.random,
            amount: note.amount,
            token: note.token,
        })
    }

    /// Reassemble the note (the decode side of deposit events)
    pub fn to_note(&self) -> Result<Note> {
        let pubkey = jubjub::pack_point_coords(self.pubkey.0, self.pubkey.1)?;
        Ok(Note::with_random(pubkey, self.random, self.amount, self.token))
    }

    pub(crate) fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::FixedArray(vec![uint(self.pubkey.0), uint(self.pubkey.1)]),
            uint(self.random),
            Token::Uint(self.amount.into()),
            Token::Uint(TOKEN_TYPE_ERC20.into()),
            Token::Uint(0.into()),
            uint(self.token),
        ])
    }
}

/// One output commitment of a `transact` call
#[derive(Clone, Debug)]
pub struct CommitmentOut {
    pub hash: Element,
    /// `[iv(32) || data blocks]`
    pub ciphertext: Vec<[u8; 32]>,
    pub sender_pubkey: (Element, Element),
    /// `[iv(32) || wrapped shared key]`
    pub reveal_key: Vec<[u8; 32]>,
}

impl CommitmentOut {
    pub fn new(hash: Element, bundle: &CommitmentCiphertext) -> Result<Self> {
        let sender_pubkey = jubjub::unpack_point_coords(&bundle.sender_pubkey)?;

        let mut reveal_iv = [0u8; 32];
        reveal_iv[16..].copy_from_slice(&bundle.reveal_key.iv);
        let mut reveal_key = vec![reveal_iv];
        for chunk in bundle.reveal_key.data.chunks(32) {
            let mut word = [0u8; 32];
            word[..chunk.len()].copy_from_slice(chunk);
            reveal_key.push(word);
        }

        Ok(Self {
            hash,
            ciphertext: bundle.ciphertext.to_words(),
            sender_pubkey,
            reveal_key,
        })
    }

    fn to_token(&self) -> Token {
        Token::Tuple(vec![
            uint(self.hash),
            word_array(&self.ciphertext),
            Token::FixedArray(vec![uint(self.sender_pubkey.0), uint(self.sender_pubkey.1)]),
            word_array(&self.reveal_key),
        ])
    }
}

/// One spend of a `transact` call
#[derive(Clone, Debug)]
pub struct TransactSpend {
    pub proof: Proof,
    pub adapt_id_contract: H160,
    pub adapt_id_parameters: Element,
    pub deposit_amount: u128,
    pub withdraw_amount: u128,
    pub token_field: Element,
    pub output_eth_address: H160,
    pub tree_number: u64,
    pub merkle_root: Element,
    pub nullifiers: Vec<Element>,
    pub commitments: Vec<CommitmentOut>,
}

impl TransactSpend {
    /// Assemble the calldata struct from a built transaction and its proof
    pub fn new(built: &BuiltTransaction, proof: Proof) -> Result<Self> {
        let inputs = &built.inputs;

        let commitments = inputs
            .commitments_out
            .iter()
            .zip(&built.ciphertexts)
            .map(|(hash, bundle)| CommitmentOut::new(*hash, bundle))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            proof,
            adapt_id_contract: element_to_h160(inputs.adapt_id.contract),
            adapt_id_parameters: inputs.adapt_id.parameters,
            deposit_amount: inputs.deposit_amount,
            withdraw_amount: inputs.withdraw_amount,
            token_field: inputs.token,
            output_eth_address: element_to_h160(inputs.output_eth_address),
            tree_number: inputs.tree_number,
            merkle_root: inputs.merkle_root,
            nullifiers: inputs.nullifiers(),
            commitments,
        })
    }

    pub(crate) fn to_token(&self) -> Token {
        let proof = Token::Tuple(vec![
            Token::FixedArray(self.proof.a.iter().map(|e| uint(*e)).collect()),
            Token::FixedArray(
                self.proof
                    .b
                    .iter()
                    .map(|pair| Token::FixedArray(pair.iter().map(|e| uint(*e)).collect()))
                    .collect(),
            ),
            Token::FixedArray(self.proof.c.iter().map(|e| uint(*e)).collect()),
        ]);

        Token::Tuple(vec![
            proof,
            Token::Address(self.adapt_id_contract),
            uint(self.adapt_id_parameters),
            Token::Uint(self.deposit_amount.into()),
            Token::Uint(self.withdraw_amount.into()),
            Token::Uint(TOKEN_TYPE_ERC20.into()),
            Token::Uint(0.into()),
            uint(self.token_field),
            Token::Address(self.output_eth_address),
            Token::Uint(self.tree_number.into()),
            uint(self.merkle_root),
            Token::Array(self.nullifiers.iter().map(|n| uint(*n)).collect()),
            Token::Array(self.commitments.iter().map(CommitmentOut::to_token).collect()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use rg_primitives::jubjub::Keypair;

    use super::*;

    #[test]
    fn deposit_preimage_roundtrips_through_coordinates() {
        let keypair = Keypair::from_seed(b"deposit");
        let note = Note::with_random(
            keypair.public_key,
            Element::new(77),
            1_000,
            Element::new(42),
        );

        let preimage = DepositPreimage::from_note(&note).unwrap();
        assert_eq!(preimage.to_note().unwrap(), note);
    }

    #[test]
    fn deposit_token_shape() {
        let keypair = Keypair::from_seed(b"deposit");
        let note = Note::with_random(keypair.public_key, Element::new(1), 5, Element::new(2));

        let token = DepositPreimage::from_note(&note).unwrap().to_token();
        let Token::Tuple(fields) = token else {
            panic!("expected tuple");
        };

        assert_eq!(fields.len(), 6);
        assert_eq!(fields[2], Token::Uint(5.into()));
        // ERC-20 tag and sub id
        assert_eq!(fields[3], Token::Uint(0.into()));
        assert_eq!(fields[4], Token::Uint(0.into()));
    }
}
