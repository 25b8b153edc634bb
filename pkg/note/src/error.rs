/// An error produced by note or address handling
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A decrypted or deserialized note violates the field ranges of the
    /// note format
    #[error("malformed note: {0}")]
    MalformedNote(&'static str),

    /// The address carries a version byte this library does not speak
    #[error("unsupported address version: {0}")]
    WrongVersion(u8),

    /// The address prefix is neither a known chain prefix nor the wildcard
    #[error("unknown address prefix: {0}")]
    UnknownPrefix(String),

    #[error("bech32 error")]
    Bech32(#[from] bech32::Error),

    #[error(transparent)]
    Primitives(#[from] rg_primitives::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
