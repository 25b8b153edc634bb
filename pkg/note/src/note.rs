use borsh::{BorshDeserialize, BorshSerialize};
use rand::rngs::OsRng;
use rand::RngCore;
use rg_primitives::aes::{self, BlockCiphertext};
use rg_primitives::jubjub::{self, PackedPoint};
use rg_primitives::{poseidon, Element};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Exclusive upper bound on a note amount (the circuit range-checks values to
/// 120 bits)
pub const MAX_AMOUNT: u128 = 1 << 120;

/// A fungible-token note
///
/// The note's commitment is the leaf inserted into the on-chain tree; the
/// nullifier revealed on spend binds the owner's key to the leaf position
/// (see [`nullifier`]).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Note {
    /// Recipient public key (packed Baby-Jubjub point)
    pub pubkey: PackedPoint,
    /// Per-note nonce; 16 random bytes, carried as a field value
    pub random: Element,
    /// Token amount, `< 2^120`
    pub amount: u128,
    /// Token contract address, left-padded to 32 bytes
    pub token: Element,
}

impl Note {
    /// Create a note with a fresh random nonce
    #[must_use]
    pub fn new(pubkey: PackedPoint, amount: u128, token: Element) -> Self {
        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);

        let random = Element::from_be_slice(&nonce).expect("16 bytes fit in an element");
        Self::with_random(pubkey, random, amount, token)
    }

    /// Create a note with a caller-chosen nonce
    #[must_use]
    pub fn with_random(pubkey: PackedPoint, random: Element, amount: u128, token: Element) -> Self {
        Self {
            pubkey,
            random,
            amount,
            token,
        }
    }

    /// The note commitment: `poseidon(pubkey.x, pubkey.y, amount, random,
    /// token)` over the unpacked public key
    ///
    /// Fails if the stored pubkey does not decode to a curve point.
    pub fn commitment(&self) -> Result<Element> {
        let (x, y) = jubjub::unpack_point_coords(&self.pubkey)?;
        Ok(poseidon(&[
            x,
            y,
            Element::from(self.amount),
            self.random,
            self.token,
        ]))
    }

    /// Encrypt this note for its recipient
    ///
    /// The ciphertext is AES-256-CTR over exactly three 32-byte blocks:
    /// the packed pubkey, `random(16) || amount(16, big-endian)`, and the
    /// token. The layout is fixed by the protocol's decrypt side.
    #[must_use]
    pub fn encrypt(&self, shared_key: &[u8; 32]) -> BlockCiphertext {
        aes::encrypt_blocks(&self.blocks(), shared_key)
    }

    /// Decrypt a note ciphertext produced by [`Note::encrypt`]
    pub fn decrypt(ciphertext: &BlockCiphertext, shared_key: &[u8; 32]) -> Result<Self> {
        let blocks = aes::decrypt_blocks(ciphertext, shared_key);

        let [pubkey, mid, token]: [[u8; 32]; 3] = blocks
            .try_into()
            .map_err(|_| Error::MalformedNote("ciphertext must be exactly three blocks"))?;

        let mut random = [0u8; 32];
        random[16..].copy_from_slice(&mid[..16]);

        let amount = u128::from_be_bytes(mid[16..].try_into().expect("16 bytes"));
        if amount >= MAX_AMOUNT {
            return Err(Error::MalformedNote("amount exceeds 2^120"));
        }

        Ok(Self {
            pubkey,
            random: Element::from_be_bytes(random),
            amount,
            token: Element::from_be_bytes(token),
        })
    }

    /// Canonical persisted form
    ///
    /// When `with_pubkey` is false the pubkey is omitted (the scanner already
    /// knows which derived key matched) and must be supplied again to
    /// [`Note::from_bytes`].
    #[must_use]
    pub fn to_bytes(&self, with_pubkey: bool) -> Vec<u8> {
        let data = NoteData {
            pubkey: with_pubkey.then_some(self.pubkey),
            random: self.random,
            amount: self.amount,
            token: self.token,
        };
        borsh::to_vec(&data).expect("in-memory serialization cannot fail")
    }

    /// Restore a note from its persisted form
    pub fn from_bytes(bytes: &[u8], pubkey: Option<PackedPoint>) -> Result<Self> {
        let data = NoteData::try_from_slice(bytes)
            .map_err(|_| Error::MalformedNote("undecodable note bytes"))?;

        let pubkey = data
            .pubkey
            .or(pubkey)
            .ok_or(Error::MalformedNote("missing pubkey"))?;

        if data.amount >= MAX_AMOUNT {
            return Err(Error::MalformedNote("amount exceeds 2^120"));
        }

        Ok(Self {
            pubkey,
            random: data.random,
            amount: data.amount,
            token: data.token,
        })
    }

    fn blocks(&self) -> [[u8; 32]; 3] {
        let mut mid = [0u8; 32];
        mid[..16].copy_from_slice(&self.random.to_be_bytes()[16..]);
        mid[16..].copy_from_slice(&self.amount.to_be_bytes());

        [self.pubkey, mid, self.token.to_be_bytes()]
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
struct NoteData {
    pubkey: Option<PackedPoint>,
    random: Element,
    amount: u128,
    token: Element,
}

/// The nullifier for the leaf at `position` of tree `tree_number`, spendable
/// by `private_key`
///
/// Revealed on spend and indexed on-chain to prevent double-spending.
#[must_use]
pub fn nullifier(private_key: Element, tree_number: u64, position: u64) -> Element {
    poseidon(&[
        private_key,
        Element::from(tree_number),
        Element::from(position),
    ])
}

#[cfg(test)]
mod tests {
    use rand_chacha::{rand_core::SeedableRng, ChaChaRng};
    use rg_primitives::jubjub::Keypair;

    use super::*;

    fn test_note(rng: &mut ChaChaRng) -> (Keypair, Note) {
        let keypair = Keypair::random(rng);
        let token = Element::from_be_slice(&[0xaa; 20]).unwrap();
        let note = Note::with_random(keypair.public_key, Element::new(1234), 500, token);
        (keypair, note)
    }

    #[test]
    fn commitment_is_deterministic() {
        let mut rng = ChaChaRng::from_seed([3; 32]);
        let (_, note) = test_note(&mut rng);

        assert_eq!(note.commitment().unwrap(), note.commitment().unwrap());

        let other = Note {
            amount: note.amount + 1,
            ..note.clone()
        };
        assert_ne!(note.commitment().unwrap(), other.commitment().unwrap());
    }

    #[test]
    fn nullifier_is_deterministic_and_position_bound() {
        let sk = Element::new(42);

        assert_eq!(nullifier(sk, 0, 7), nullifier(sk, 0, 7));
        assert_ne!(nullifier(sk, 0, 7), nullifier(sk, 0, 8));
        assert_ne!(nullifier(sk, 0, 7), nullifier(sk, 1, 7));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let mut rng = ChaChaRng::from_seed([4; 32]);
        let (_, note) = test_note(&mut rng);
        let shared = [7u8; 32];

        let ciphertext = note.encrypt(&shared);
        assert_eq!(ciphertext.data.len(), 3);

        let decrypted = Note::decrypt(&ciphertext, &shared).unwrap();
        assert_eq!(decrypted, note);
    }

    #[test]
    fn decrypt_rejects_wrong_block_count() {
        let mut rng = ChaChaRng::from_seed([5; 32]);
        let (_, note) = test_note(&mut rng);
        let shared = [7u8; 32];

        let mut ciphertext = note.encrypt(&shared);
        ciphertext.data.pop();

        assert!(matches!(
            Note::decrypt(&ciphertext, &shared),
            Err(Error::MalformedNote(_))
        ));
    }

    #[test]
    fn serialize_roundtrip() {
        let mut rng = ChaChaRng::from_seed([6; 32]);
        let (_, note) = test_note(&mut rng);

        let with_pubkey = note.to_bytes(true);
        assert_eq!(Note::from_bytes(&with_pubkey, None).unwrap(), note);

        let without_pubkey = note.to_bytes(false);
        assert!(Note::from_bytes(&without_pubkey, None).is_err());
        assert_eq!(
            Note::from_bytes(&without_pubkey, Some(note.pubkey)).unwrap(),
            note
        );
    }
}
