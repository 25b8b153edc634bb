/// An error produced by the tree mirror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tree already holds `2^TREE_DEPTH` leaves
    #[error("commitment tree is full")]
    TreeFull,

    /// Leaves must be applied in event order
    #[error("out-of-order insert: expected position {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },

    /// The mirror has never seen this tree number
    #[error("unknown tree {0}")]
    UnknownTree(u64),

    /// No leaf exists at the requested position
    #[error("position {position} out of range (tree has {len} leaves)")]
    PositionOutOfRange { position: u64, len: u64 },

    #[error(transparent)]
    Note(#[from] rg_note::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
