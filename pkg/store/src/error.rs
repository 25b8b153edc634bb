/// An error produced by the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Stored bytes do not decode to the expected shape
    #[error("database corruption: {0}")]
    DbCorruption(&'static str),

    #[cfg(feature = "rocksdb")]
    #[error("rocksdb error")]
    Rocks(#[from] rocksdb::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
