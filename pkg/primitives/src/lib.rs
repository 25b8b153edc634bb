#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

//! Cryptographic primitives for the shielded-transfer wallet.
//!
//! Everything circuit-facing is expressed as an [`Element`]: a 256-bit
//! unsigned integer that is reduced modulo the BN254 scalar-field prime
//! whenever it crosses into the proving system. On top of that sit:
//!
//!  - [`poseidon`]: the circuit's hash, with circom parameterization
//!  - [`digest`]: sha256 for off-circuit digests, reduced into the field
//!  - [`jubjub`]: Baby-Jubjub keypairs, point packing and ECDH
//!  - [`aes`]: AES-256-CTR for note and wallet-blob encryption

mod element;
mod error;

pub mod aes;
pub mod digest;
pub mod jubjub;
pub mod poseidon;

pub use element::Element;
pub use error::{Error, Result};
pub use poseidon::{merge_hash, poseidon};

/// A 32-byte transaction hash, as reported by the chain.
pub type TxId = [u8; 32];
