//! Error taxonomy for the threshold and Ed25519 signing core.

use thiserror::Error;

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core. Variant names follow the taxonomy in the
/// governing specification so the Service Facade can map them to HTTP
/// status codes mechanically. No variant ever carries secret material.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing/malformed fields, threshold > nodes, unknown wallet id, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Wallet or share absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Wallet id already exists (DKG `put` returned already-exists).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Share/signature verification failed, point decode failed, a zero
    /// nonce or share was produced, aggregated R has x = 0, s = 0, etc.
    #[error("cryptographic failure: {0}")]
    CryptoFailure(String),

    /// The share store is unreachable or timed out.
    #[error("share store I/O error: {0}")]
    IoError(String),

    /// An invariant was breached that well-formed code should never hit.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<share_store::StoreError> for Error {
    fn from(e: share_store::StoreError) -> Self {
        match e {
            share_store::StoreError::Conflict(key) => {
                Error::Conflict(format!("share already exists for {key}"))
            }
            share_store::StoreError::NotFound(key) => {
                Error::NotFound(format!("no share stored for {key}"))
            }
            share_store::StoreError::Io(msg) => Error::IoError(msg),
        }
    }
}
