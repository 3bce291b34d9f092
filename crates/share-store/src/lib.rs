//! Opaque key-value store for signing secrets.
//!
//! This crate stands in for the externally-delegated, encrypted-at-rest key
//! store described in the governing specification: production deployments
//! point this at a managed secrets service and get encryption, auth, and
//! durability from it. What this crate guarantees on its own is the
//! create-if-absent / exact-key contract that the signing core depends on:
//! `put` never overwrites, and `get` only ever returns an exact match.

mod file;
mod memory;

pub use file::FileShareStore;
pub use memory::MemoryShareStore;

use thiserror::Error;

/// Errors from a [`ShareStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `put` was called for a key that already has a value.
    #[error("key already exists: {0}")]
    Conflict(String),
    /// `get` was called for a key with no stored value.
    #[error("key not found: {0}")]
    NotFound(String),
    /// The backing store could not be reached, or timed out.
    #[error("store I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Create-if-absent / exact-key key-value store.
///
/// Values are opaque strings; callers (the signing core) are responsible
/// for encoding secrets into a stable string form before calling `put`, and
/// decoding after `get`. The store itself never inspects or logs values.
pub trait ShareStore: Send + Sync {
    /// Store `value` under `key`. Returns `Err(StoreError::Conflict)` if a
    /// value is already stored under `key` — callers must never overwrite
    /// an existing share, so DKG retries can't silently clobber shares.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Fetch the value stored under `key`, or `Err(StoreError::NotFound)`.
    fn get(&self, key: &str) -> Result<String>;
}

/// Key under which a single-mode (Ed25519) wallet's secret is stored.
pub fn single_mode_key(wallet_id: &str) -> String {
    format!("hyperliquid/mpc-wallets/{wallet_id}")
}

/// Key under which one threshold-mode party's share is stored.
pub fn threshold_share_key(wallet_id: &str, party_id: u32) -> String {
    format!("hyperliquid/tss-shares/{wallet_id}/share-{party_id}")
}

/// Key under which a threshold wallet's public Feldman commitment vector is
/// stored, alongside (not mixed into) its parties' secret shares. Public
/// material, but scoped under the same wallet prefix since it's only ever
/// read back together with those shares.
pub fn commitment_vector_key(wallet_id: &str) -> String {
    format!("hyperliquid/tss-shares/{wallet_id}/commitments")
}
