/// An error produced by the wallet
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller-supplied encryption key does not match the wallet's key
    #[error("wrong encryption key")]
    WrongEncryptionKey,

    /// A persisted blob failed to decode
    #[error("database corruption: {0}")]
    Corrupt(&'static str),

    /// A derivation path is not of the form `m/44'/1984'/0'/0'`
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("invalid mnemonic")]
    Mnemonic(#[from] bip39::Error),

    #[error(transparent)]
    Store(#[from] rg_store::Error),

    #[error(transparent)]
    Note(#[from] rg_note::Error),

    #[error(transparent)]
    Merkle(#[from] rg_merkle::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
