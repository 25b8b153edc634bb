/// An error produced while building or proving a transaction
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The wallet's unspent balance of the token cannot cover the spend
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },

    /// An output note's token differs from the transaction's token
    #[error("output token does not match transaction token")]
    TokenMismatch,

    /// More real outputs than the circuit has slots for
    #[error("at most {max} outputs per transaction", max = crate::MAX_REAL_OUTPUTS)]
    TooManyOutputs,

    /// `withdraw` and `withdraw_address` must be set together
    #[error("withdraw misconfiguration: {0}")]
    WithdrawConfig(&'static str),

    /// No single tree can cover the spend within the large circuit's arity
    #[error("spend needs more than {max} inputs from one tree; consolidate first", max = crate::LARGE_INPUTS)]
    NeedsConsolidation,

    /// An input's inclusion proof does not reach the spend's Merkle root
    #[error("merkle root not known for input {input}")]
    RootNotKnown { input: usize },

    /// The assembled witness violates a circuit precondition
    #[error("invalid witness: {0}")]
    InvalidWitness(&'static str),

    /// The locally re-verified proof did not validate
    #[error("proof generation failed: {0}")]
    ProofGenFailed(&'static str),

    /// A proof could not be decoded for verification
    #[error("proof verification failed: {0}")]
    ProofVerifyFailed(&'static str),

    /// A circuit artifact is missing from the artifact directory
    #[error("circuit artifact not found: {0}")]
    CircuitNotFound(String),

    /// The external witness generator rejected the assignment
    #[error("witness generation failed: {0}")]
    WitnessGeneration(String),

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wallet(#[from] rg_wallet::Error),

    #[error(transparent)]
    Merkle(#[from] rg_merkle::Error),

    #[error(transparent)]
    Note(#[from] rg_note::Error),

    #[error(transparent)]
    Primitives(#[from] rg_primitives::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
