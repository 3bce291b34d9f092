//! Wallet and session types shared between the polynomial engine, parties,
//! and the coordinator.

use crate::field::Point;
use crate::poly::CommitmentVector;
use serde::{Deserialize, Serialize};

/// A threshold-mode wallet: the public record produced by a successful DKG.
/// Holds no secret material — only the master public key, the commitment
/// vector (needed to re-verify shares), and which party ids hold a share.
#[derive(Clone)]
pub struct ThresholdWallet {
    pub wallet_id: String,
    pub commitments: CommitmentVector,
    pub share_ids: Vec<u32>,
}

impl ThresholdWallet {
    pub fn master_public_key(&self) -> Point {
        self.commitments.master_public_key()
    }

    pub fn threshold(&self) -> usize {
        self.commitments.threshold()
    }
}

/// A completed threshold ECDSA-shaped signature: `(rX, s)`, each a 32-byte
/// big-endian scalar.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThresholdSignature {
    pub r_x: [u8; 32],
    pub s: [u8; 32],
}

impl ThresholdSignature {
    /// `0x`-prefixed hex of `rX || s`, as specified for the wire format.
    pub fn to_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&self.r_x);
        bytes.extend_from_slice(&self.s);
        format!("0x{}", hex::encode(bytes))
    }
}

/// The forward-only state machine each signing session moves through.
/// Any error transitions to `Aborted` and the session is discarded; there
/// is no recovery path back to an earlier round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Round1,
    Round2,
    Round3,
    Round4,
    Done,
    Aborted,
}
