//! AES-256-CTR encryption
//!
//! Note ciphertexts and persisted wallet blobs are both AES-256-CTR. The key
//! is truncated or zero-padded to 32 bytes and the IV to 16, matching the
//! protocol's permissive key handling at the boundary.

use aes::Aes256;
use borsh::{BorshDeserialize, BorshSerialize};
use cipher::{KeyIvInit, StreamCipher};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// An AES-256-CTR ciphertext over arbitrary bytes
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Ciphertext {
    pub iv: [u8; 16],
    pub data: Vec<u8>,
}

/// An AES-256-CTR ciphertext over a sequence of 32-byte blocks
///
/// This is the shape of an encrypted note: the block layout is fixed by the
/// protocol, so the block boundaries are kept explicit.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BlockCiphertext {
    pub iv: [u8; 16],
    pub data: Vec<[u8; 32]>,
}

/// Encrypt bytes under a fresh random IV
#[must_use]
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Ciphertext {
    encrypt_with_iv(plaintext, key, &random_iv())
}

/// Encrypt bytes under a caller-chosen IV
#[must_use]
pub fn encrypt_with_iv(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Ciphertext {
    let iv = normalize_iv(iv);
    let mut data = plaintext.to_vec();
    apply_keystream(&mut data, key, &iv);
    Ciphertext { iv, data }
}

/// Decrypt a [`Ciphertext`]
#[must_use]
pub fn decrypt(ciphertext: &Ciphertext, key: &[u8]) -> Vec<u8> {
    let mut data = ciphertext.data.clone();
    apply_keystream(&mut data, key, &ciphertext.iv);
    data
}

/// Encrypt a sequence of 32-byte blocks under a fresh random IV
#[must_use]
pub fn encrypt_blocks(blocks: &[[u8; 32]], key: &[u8]) -> BlockCiphertext {
    encrypt_blocks_with_iv(blocks, key, &random_iv())
}

/// Encrypt a sequence of 32-byte blocks under a caller-chosen IV
#[must_use]
pub fn encrypt_blocks_with_iv(blocks: &[[u8; 32]], key: &[u8], iv: &[u8]) -> BlockCiphertext {
    let flat = blocks.concat();
    let ciphertext = encrypt_with_iv(&flat, key, iv);
    BlockCiphertext {
        iv: ciphertext.iv,
        data: to_blocks(&ciphertext.data).expect("encrypt preserves length"),
    }
}

/// Decrypt a [`BlockCiphertext`]
#[must_use]
pub fn decrypt_blocks(ciphertext: &BlockCiphertext, key: &[u8]) -> Vec<[u8; 32]> {
    let flat = Ciphertext {
        iv: ciphertext.iv,
        data: ciphertext.data.concat(),
    };
    to_blocks(&decrypt(&flat, key)).expect("decrypt preserves length")
}

impl BlockCiphertext {
    /// The on-chain form: the IV left-padded to a 32-byte word, followed by
    /// the data blocks
    #[must_use]
    pub fn to_words(&self) -> Vec<[u8; 32]> {
        let mut iv_word = [0u8; 32];
        iv_word[16..].copy_from_slice(&self.iv);

        std::iter::once(iv_word)
            .chain(self.data.iter().copied())
            .collect()
    }

    /// Parse the on-chain form produced by [`BlockCiphertext::to_words`]
    pub fn from_words(words: &[[u8; 32]]) -> Result<Self> {
        let (iv_word, data) = words
            .split_first()
            .ok_or(Error::MalformedCiphertext("missing iv word"))?;

        let mut iv = [0u8; 16];
        iv.copy_from_slice(&iv_word[16..]);

        Ok(Self {
            iv,
            data: data.to_vec(),
        })
    }
}

fn apply_keystream(data: &mut [u8], key: &[u8], iv: &[u8; 16]) {
    let key = normalize_key(key);
    let mut cipher = Aes256Ctr::new(&key.into(), iv.into());
    cipher.apply_keystream(data);
}

fn to_blocks(bytes: &[u8]) -> Option<Vec<[u8; 32]>> {
    if bytes.len() % 32 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(32)
            .map(|chunk| chunk.try_into().expect("chunk is 32 bytes"))
            .collect(),
    )
}

fn random_iv() -> [u8; 16] {
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut iv);
    iv
}

fn normalize_key(key: &[u8]) -> [u8; 32] {
    let mut normalized = [0u8; 32];
    let len = key.len().min(32);
    normalized[..len].copy_from_slice(&key[..len]);
    normalized
}

fn normalize_iv(iv: &[u8]) -> [u8; 16] {
    let mut normalized = [0u8; 16];
    let len = iv.len().min(16);
    normalized[..len].copy_from_slice(&iv[..len]);
    normalized
}
