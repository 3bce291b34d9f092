//! A single party's share-holding state machine for one signing session.

use crate::field::{sha256, Point, Scalar, SecretScalar};
use crate::{Error, Result};
use tracing::{debug, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One party's ephemeral per-session secrets, created in Round 1, used in
/// Round 3, and wiped on every session end (success or abort). `commitment_h`
/// isn't secret on its own (it's a public hash broadcast in Round 1), but it
/// is session state tied to `k` and the spec requires both cleared together.
#[derive(Zeroize, ZeroizeOnDrop)]
struct EphemeralState {
    k: SecretScalar,
    commitment_h: [u8; 32],
}

/// Holds exactly one share and, for the lifetime of at most one signing
/// session at a time, the ephemeral nonce that session derived. No public
/// method ever returns the share or the nonce.
pub struct Party {
    party_id: u32,
    share: SecretScalar,
    ephemeral: Option<EphemeralState>,
}

impl Party {
    pub fn new(party_id: u32, share: SecretScalar) -> Result<Self> {
        if party_id == 0 {
            return Err(Error::InvalidInput(
                "party id must be non-zero".into(),
            ));
        }
        if share.is_zero() {
            return Err(Error::CryptoFailure("share must be non-zero".into()));
        }
        Ok(Self {
            party_id,
            share,
            ephemeral: None,
        })
    }

    pub fn party_id(&self) -> u32 {
        self.party_id
    }

    /// Round 1: derive a deterministic ephemeral nonce `k` for `message`,
    /// commit to its public point, and retain both for Round 3.
    ///
    /// `k = sha256(share || message) mod n`, substituting 1 if the result is
    /// zero. This is RFC-6979-flavored (same message always rederives the
    /// same k, so a retried round can't silently pick a fresh one) but is
    /// not full RFC 6979 — see the crate-level docs.
    #[instrument(skip(self, message), fields(party_id = self.party_id))]
    pub fn round1_commit(&mut self, message: &[u8]) -> Result<([u8; 32], Vec<u8>)> {
        let mut preimage = Vec::with_capacity(32 + message.len());
        preimage.extend_from_slice(&self.share.expose().to_bytes());
        preimage.extend_from_slice(message);
        let mut k = Scalar::reduce(&sha256(&preimage));
        if k.is_zero() {
            k = Scalar::ONE;
        }

        let public_ephemeral = Point::mul_g(&k);
        let public_bytes = public_ephemeral.encode(true);
        let commitment_h = sha256(&public_bytes);

        self.ephemeral = Some(EphemeralState {
            k: SecretScalar::from_scalar(k),
            commitment_h,
        });

        debug!(party_id = self.party_id, "round1_commit produced ephemeral");
        Ok((commitment_h, public_bytes))
    }

    /// Round 2: check that `public_ephemeral` hashes to the commitment made
    /// in Round 1. In this single-process deployment this is a
    /// self-consistency check; a distributed deployment would have each
    /// party verify every other party's decommitment.
    pub fn verify_commitment(&self, public_ephemeral: &[u8]) -> bool {
        match &self.ephemeral {
            Some(state) => sha256(public_ephemeral) == state.commitment_h,
            None => false,
        }
    }

    /// Round 3: produce this party's partial signature contribution.
    ///
    /// `e = sha256(message) mod n`, `s_i = k + e * share mod n`. `rX` is the
    /// x-coordinate of the already-aggregated `R`, reduced into the scalar
    /// domain; every party in a session uses the same `aggregated_r`.
    #[instrument(skip(self, message, aggregated_r), fields(party_id = self.party_id))]
    pub fn round3_partial_sign(
        &self,
        message: &[u8],
        aggregated_r: &Point,
    ) -> Result<(Scalar, Scalar)> {
        let k = match &self.ephemeral {
            Some(state) => state.k.expose(),
            None => {
                return Err(Error::Internal(
                    "round3_partial_sign called before round1_commit".into(),
                ))
            }
        };

        let e = Scalar::reduce(&sha256(message));
        let partial_s = k.add(&e.mul(&self.share.expose()));
        let r_x = aggregated_r.x_scalar()?;

        Ok((partial_s, r_x))
    }

    /// Wipe ephemeral session state. Called by the coordinator at the end
    /// of every session, success or abort.
    pub fn end_session(&mut self) {
        self.ephemeral = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party_with_share(party_id: u32, share: u64) -> Party {
        Party::new(party_id, SecretScalar::from_scalar(Scalar::from_u64(share))).unwrap()
    }

    #[test]
    fn zero_party_id_is_rejected() {
        let err = Party::new(0, SecretScalar::from_scalar(Scalar::from_u64(5))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn zero_share_is_rejected() {
        let err = Party::new(1, SecretScalar::from_scalar(Scalar::ZERO)).unwrap_err();
        assert!(matches!(err, Error::CryptoFailure(_)));
    }

    #[test]
    fn round1_is_deterministic_per_message() {
        let mut p1 = party_with_share(1, 42);
        let (h1, pub1) = p1.round1_commit(b"msg").unwrap();
        let mut p2 = party_with_share(1, 42);
        let (h2, pub2) = p2.round1_commit(b"msg").unwrap();
        assert_eq!(h1, h2);
        assert_eq!(pub1, pub2);
    }

    #[test]
    fn round1_differs_across_messages() {
        let mut p1 = party_with_share(1, 42);
        let (_, pub1) = p1.round1_commit(b"msg-a").unwrap();
        let mut p2 = party_with_share(1, 42);
        let (_, pub2) = p2.round1_commit(b"msg-b").unwrap();
        assert_ne!(pub1, pub2);
    }

    #[test]
    fn verify_commitment_requires_matching_bytes() {
        let mut party = party_with_share(1, 42);
        let (_, public_ephemeral) = party.round1_commit(b"msg").unwrap();
        assert!(party.verify_commitment(&public_ephemeral));
        assert!(!party.verify_commitment(b"not the ephemeral"));
    }

    #[test]
    fn round3_before_round1_is_internal_error() {
        let party = party_with_share(1, 42);
        let r = Point::mul_g(&Scalar::from_u64(7));
        let err = party.round3_partial_sign(b"msg", &r).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn end_session_clears_ephemeral_state() {
        let mut party = party_with_share(1, 42);
        party.round1_commit(b"msg").unwrap();
        party.end_session();
        let r = Point::mul_g(&Scalar::from_u64(7));
        let err = party.round3_partial_sign(b"msg", &r).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn ephemeral_state_zeroizes_both_k_and_commitment_h() {
        let mut state = EphemeralState {
            k: SecretScalar::from_scalar(Scalar::from_u64(0xdead_beef)),
            commitment_h: [0xAA; 32],
        };
        state.zeroize();
        assert!(state.k.is_zero());
        assert_eq!(state.commitment_h, [0u8; 32]);
    }
}
