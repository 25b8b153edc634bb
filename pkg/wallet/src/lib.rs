#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

//! The wallet: hierarchical key derivation, the commitment scanner, and
//! balance tracking.
//!
//! A wallet owns its TXO records and its encrypted details blob in the
//! key-value store; the [`TreeMirror`] it scans from is shared read-only
//! with every other wallet on the chain.
//!
//! [`TreeMirror`]: rg_merkle::TreeMirror

mod details;
mod error;
pub mod keys;
mod txo;
mod wallet;

pub use details::WalletDetails;
pub use error::{Error, Result};
pub use keys::{ExtendedKey, KeyChain, DEFAULT_DERIVATION_PATH};
pub use txo::{Balances, BalancesByTree, TokenBalance, TxoRecord};
pub use wallet::{scan_index, Wallet, DEFAULT_GAP_LIMIT};
