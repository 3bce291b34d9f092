//! Threshold ECDSA signing core for a trading venue's key-management
//! service.
//!
//! Two operational modes share one crate:
//!
//! - **Threshold mode** (`field`, `poly`, `party`, `coordinator`): Feldman
//!   verifiable secret sharing DKG, followed by a synchronous 4-round
//!   signing protocol run by in-process [`party::Party`] handles and
//!   orchestrated by [`coordinator::TssCoordinator`]. See `coordinator`'s
//!   docs for the documented gap between this protocol's aggregate
//!   signature and standard ECDSA verification.
//! - **Single mode** (`ed25519`): a plain per-wallet Ed25519 keypair, for
//!   deployments that don't need distributed trust.
//!
//! Both modes persist their secrets through the same [`share_store::ShareStore`]
//! abstraction and share one [`Error`] taxonomy.

pub mod coordinator;
pub mod ed25519;
pub mod error;
pub mod field;
pub mod party;
pub mod poly;
pub mod types;

pub use error::{Error, Result};
