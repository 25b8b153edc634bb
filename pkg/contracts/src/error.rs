use ethereum_types::H256;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A chunked replay query kept failing past the retry cap
    #[error("rpc retries exhausted after {attempts} attempts")]
    RpcRetryExhausted { attempts: u32 },

    /// A log's data did not decode against the event ABI
    #[error("undecodable event log: {0}")]
    EventDecode(&'static str),

    #[error("unknown transaction: {0}")]
    UnknownTransaction(H256),

    #[error("web3 error")]
    Web3(#[from] web3::Error),

    #[error("web3 contract error")]
    Web3Contract(#[from] web3::contract::Error),

    #[error("abi error")]
    Abi(#[from] web3::ethabi::Error),

    #[error("serde_json error")]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] rg_store::Error),

    #[error(transparent)]
    Merkle(#[from] rg_merkle::Error),

    #[error(transparent)]
    Note(#[from] rg_note::Error),

    #[error(transparent)]
    Primitives(#[from] rg_primitives::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
