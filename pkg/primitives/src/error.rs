/// An error produced by a primitive operation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The 32 bytes do not decode to a point on Baby-Jubjub
    #[error("invalid baby-jubjub point encoding")]
    InvalidPoint,

    /// A ciphertext had a length that cannot have been produced by the
    /// matching encrypt function
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
