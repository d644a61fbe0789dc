use std::io;

/// Errors produced by the journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// I/O error while reading or writing the journal file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A frame in the middle of the journal failed its CRC check.
    ///
    /// Only the final frame may be torn; damage anywhere else means the
    /// file was corrupted after it was written.
    #[error("CRC integrity check failed at offset {offset}: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        offset: u64,
        expected: u32,
        actual: u32,
    },

    /// A frame passed its CRC check but did not decode as a record.
    #[error("undecodable journal record at offset {offset}: {reason}")]
    Undecodable { offset: u64, reason: String },

    /// A failed append could not be cut back off the file. The journal
    /// accepts no more records until it is reopened.
    #[error("journal unusable after a failed rollback at offset {offset}")]
    Broken { offset: u64 },

    /// The writer mutex was poisoned by a panic in another thread.
    #[error("journal writer lock poisoned")]
    Poisoned,
}

/// Convenience alias used throughout the journal crate.
pub type Result<T> = std::result::Result<T, JournalError>;
