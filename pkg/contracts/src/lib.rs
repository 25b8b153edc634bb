#![deny(clippy::disallowed_methods)]

//! The contract I/O boundary: reads commitment and nullifier events from the
//! shield contract, serializes `generateDeposit`/`transact` calldata, and
//! replays chain history into a [`TreeMirror`] in bounded chunks.
//!
//! [`TreeMirror`]: rg_merkle::TreeMirror

mod calldata;
mod client;
mod constants;
mod error;
mod events;
mod shield;
pub mod util;

pub use calldata::{CommitmentOut, DepositPreimage, TransactSpend};
pub use client::Client;
pub use constants::{MAX_RETRIES, SCAN_CHUNK};
pub use error::{Error, Result};
pub use events::{apply_events, ShieldEvent};
pub use shield::{parse_log, ShieldContract};

pub use web3::{
    signing::SecretKey,
    types::{Address, H256, U256},
};
