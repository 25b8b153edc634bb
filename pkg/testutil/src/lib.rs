//! Shared fixtures for cross-crate tests

use std::sync::Arc;

use rand_chacha::{rand_core::SeedableRng, ChaChaRng};
use rg_merkle::TreeMirror;
use rg_note::{Commitment, Note};
use rg_primitives::jubjub::{Keypair, PackedPoint};
use rg_primitives::Element;
use rg_store::MemoryStore;
use rg_wallet::Wallet;

/// The BIP-39 "all abandon" test phrase
pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// The encryption key every test wallet uses
pub const ENCRYPTION_KEY: [u8; 32] = [9u8; 32];

/// A deterministic rng
pub fn rng(seed: u8) -> ChaChaRng {
    ChaChaRng::from_seed([seed; 32])
}

/// A deterministic keypair
pub fn keypair(seed: &[u8]) -> Keypair {
    Keypair::from_seed(seed)
}

/// The test token address
pub fn token() -> Element {
    Element::from_be_slice(&[0xee; 20]).expect("20 bytes fit")
}

/// An in-memory wallet on the default derivation root
pub fn wallet(id: &str) -> Wallet<MemoryStore> {
    Wallet::create(
        Arc::new(MemoryStore::new()),
        id,
        MNEMONIC,
        rg_wallet::DEFAULT_DERIVATION_PATH,
        ENCRYPTION_KEY,
    )
    .expect("test mnemonic is valid")
}

/// The wallet's primary receiving pubkey at an index, via its own address
pub fn receiving_pubkey(wallet: &Wallet<MemoryStore>, index: u64) -> PackedPoint {
    rg_note::decode(&wallet.address(index, Some(1)))
        .expect("wallet addresses decode")
        .pubkey
        .try_into()
        .expect("packed pubkey is 32 bytes")
}

/// Append a cleartext deposit note for `pubkey` to tree 0 of the mirror
pub fn deposit(mirror: &TreeMirror, pubkey: PackedPoint, amount: u128, txid: u8) -> Note {
    let note = Note::with_random(pubkey, Element::new(u64::from(txid)), amount, token());
    let position = mirror.leaf_count(0);

    mirror
        .insert_commitments(0, position, &[(Commitment::Generated(note.clone()), [txid; 32])])
        .expect("in-order test insert");

    note
}
