//! BIP-39 seed to Baby-Jubjub keypairs
//!
//! A mnemonic yields a 64-byte seed; a BIP-32-style hardened-only ladder of
//! HMAC-SHA512 nodes hangs off it. Two fixed sub-trees sit under the
//! wallet's derivation root: `0'` for receiving addresses and `1'` for
//! change. The Baby-Jubjub scalar at a node is `sha256(node key) mod p`.

use bip39::Mnemonic;
use hmac::{Hmac, Mac};
use rg_primitives::digest;
use rg_primitives::jubjub::Keypair;
use sha2::Sha512;

use crate::{Error, Result};

type HmacSha512 = Hmac<Sha512>;

/// Domain separator for the master node
const MASTER_DOMAIN: &[u8] = b"babyjubjub seed";

/// Hardened-index offset
const HARDENED: u32 = 0x8000_0000;

/// The derivation root used when the caller does not configure one
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/1984'/0'/0'";

/// A chain-code + key node of the hardened derivation ladder
#[derive(Clone)]
pub struct ExtendedKey {
    key: [u8; 32],
    chain_code: [u8; 32],
}

impl ExtendedKey {
    /// The master node of a BIP-39 seed
    #[must_use]
    pub fn master(seed: &[u8]) -> Self {
        let output = hmac_sha512(MASTER_DOMAIN, seed);
        Self::from_output(&output)
    }

    /// Derive the hardened child at `index`
    #[must_use]
    pub fn derive_hardened(&self, index: u32) -> Self {
        let mut data = Vec::with_capacity(1 + 32 + 4);
        data.push(0x00);
        data.extend_from_slice(&self.key);
        data.extend_from_slice(&(index | HARDENED).to_be_bytes());

        let output = hmac_sha512(&self.chain_code, &data);
        Self::from_output(&output)
    }

    /// Derive along a path like `m/44'/1984'/0'/0'`
    ///
    /// Only hardened segments are supported; non-hardened derivation has no
    /// use in this protocol.
    pub fn derive_path(&self, path: &str) -> Result<Self> {
        let mut node = self.clone();
        for index in parse_path(path)? {
            node = node.derive_hardened(index);
        }
        Ok(node)
    }

    /// The Baby-Jubjub keypair at this node
    #[must_use]
    pub fn keypair(&self) -> Keypair {
        Keypair::from_seed(&self.key)
    }

    fn from_output(output: &[u8; 64]) -> Self {
        let mut key = [0u8; 32];
        let mut chain_code = [0u8; 32];
        key.copy_from_slice(&output[..32]);
        chain_code.copy_from_slice(&output[32..]);
        Self { key, chain_code }
    }
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

fn parse_path(path: &str) -> Result<Vec<u32>> {
    let bad = || Error::InvalidPath(path.to_string());

    let mut segments = path.split('/');
    if segments.next() != Some("m") {
        return Err(bad());
    }

    segments
        .map(|segment| {
            let index = segment.strip_suffix('\'').ok_or_else(bad)?;
            index.parse::<u32>().map_err(|_| bad())
        })
        .collect()
}

/// The wallet's key hierarchy, rooted at its configured derivation path
pub struct KeyChain {
    root: ExtendedKey,
}

impl KeyChain {
    /// Build the chain from a mnemonic phrase
    pub fn from_mnemonic(phrase: &str, derivation_path: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_normalized(phrase)?;
        let seed = mnemonic.to_seed("");

        let root = ExtendedKey::master(&seed).derive_path(derivation_path)?;
        Ok(Self { root })
    }

    /// The keypair at derivation index `index` of the primary (`change =
    /// false`) or change (`change = true`) sub-tree
    #[must_use]
    pub fn keypair(&self, change: bool, index: u64) -> Keypair {
        self.root
            .derive_hardened(u32::from(change))
            .derive_hardened(index as u32)
            .keypair()
    }

    /// The symmetric key used to wrap outgoing shared secrets for audit:
    /// `sha256` of the primary index-0 private key
    #[must_use]
    pub fn view_key(&self) -> [u8; 32] {
        let keypair = self.keypair(false, 0);
        digest::sha256(&keypair.private_key.to_be_bytes())
    }

    /// The bech32 address of a receiving index
    #[must_use]
    pub fn address(&self, index: u64, chain_id: Option<u64>) -> String {
        rg_note::encode(&self.keypair(false, index).public_key, chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a fixed valid 12-word mnemonic (the BIP-39 "all abandon" test phrase)
    pub(crate) const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn derivation_is_deterministic() {
        let a = KeyChain::from_mnemonic(PHRASE, DEFAULT_DERIVATION_PATH).unwrap();
        let b = KeyChain::from_mnemonic(PHRASE, DEFAULT_DERIVATION_PATH).unwrap();

        assert_eq!(a.keypair(false, 0), b.keypair(false, 0));
        assert_eq!(a.keypair(true, 3), b.keypair(true, 3));
        assert_eq!(a.view_key(), b.view_key());
    }

    #[test]
    fn indices_and_subtrees_are_distinct() {
        let chain = KeyChain::from_mnemonic(PHRASE, DEFAULT_DERIVATION_PATH).unwrap();

        let primary_0 = chain.keypair(false, 0);
        let primary_1 = chain.keypair(false, 1);
        let change_0 = chain.keypair(true, 0);

        assert_ne!(primary_0.public_key, primary_1.public_key);
        assert_ne!(primary_0.public_key, change_0.public_key);
    }

    #[test]
    fn different_roots_give_different_keys() {
        let a = KeyChain::from_mnemonic(PHRASE, "m/44'/1984'/0'/0'").unwrap();
        let b = KeyChain::from_mnemonic(PHRASE, "m/44'/1984'/0'/1'").unwrap();

        assert_ne!(a.keypair(false, 0).public_key, b.keypair(false, 0).public_key);
    }

    #[test]
    fn bad_paths_rejected() {
        let root = ExtendedKey::master(&[0u8; 64]);

        assert!(root.derive_path("m/44'/1984'").is_ok());
        assert!(root.derive_path("44'/1984'").is_err());
        assert!(root.derive_path("m/44").is_err());
        assert!(root.derive_path("m/x'").is_err());
    }

    #[test]
    fn bad_mnemonic_rejected() {
        assert!(matches!(
            KeyChain::from_mnemonic("not a real mnemonic", DEFAULT_DERIVATION_PATH),
            Err(Error::Mnemonic(_))
        ));
    }

    #[test]
    fn address_is_stable_per_chain() {
        let chain = KeyChain::from_mnemonic(PHRASE, DEFAULT_DERIVATION_PATH).unwrap();

        let addr = chain.address(0, Some(1));
        assert!(addr.starts_with("rgeth1"));
        assert_eq!(addr, chain.address(0, Some(1)));

        let decoded = rg_note::decode(&addr).unwrap();
        assert_eq!(decoded.pubkey, chain.keypair(false, 0).public_key);
    }
}
