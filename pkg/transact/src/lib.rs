#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

//! Transaction building and proving.
//!
//! A spend request selects UTXOs from the wallet, pads them to one of the
//! two circuit arities, encrypts the output notes for their recipients, and
//! assembles the zk-SNARK witness plus the single public input (the sha256
//! hash binding every public value). The prover adapter drives the external
//! witness generator and Groth16 over the compiled circuit artifacts and
//! normalizes the proof's G2 element order to what the on-chain verifier
//! expects.

pub mod artifacts;
mod builder;
mod constants;
mod error;
mod inputs;
mod prover;

pub use builder::{BuiltTransaction, CommitmentCiphertext, Erc20Transaction};
pub use constants::{LARGE_INPUTS, MAX_REAL_OUTPUTS, OUTPUTS, SMALL_INPUTS};
pub use error::{Error, Result};
pub use inputs::{AdaptId, Erc20PrivateInputs, PublicInputs, SpendInput};
pub use prover::{CircuitKind, Proof, Prover};
