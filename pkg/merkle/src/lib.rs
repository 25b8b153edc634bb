#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

//! An append-only mirror of the on-chain commitment trees.
//!
//! The contract appends note commitments to fixed-depth Poseidon trees and
//! retains a bounded ring of historical roots; wallets prove membership
//! against any retained root. [`CommitmentTree`] shadows a single on-chain
//! tree, and [`TreeMirror`] holds every tree of one chain plus the
//! nullifier index, shared read-only between wallets.

mod empty;
mod error;
mod mirror;
mod path;
mod tree;

pub use empty::empty_hash_at;
pub use error::{Error, Result};
pub use mirror::TreeMirror;
pub use path::MerklePath;
pub use tree::{CommitmentTree, ROOT_HISTORY, TREE_DEPTH};
