//! Orchestrates DKG and the 4-round signing protocol across a quorum of
//! parties, backed by a [`ShareStore`].

use crate::field::{Point, Scalar};
use crate::party::Party;
use crate::poly::{generate_shares, verify_share};
use crate::types::{SessionState, ThresholdSignature, ThresholdWallet};
use crate::{Error, Result};
use dashmap::DashMap;
use share_store::{commitment_vector_key, threshold_share_key, ShareStore};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Orchestrates DKG and signing for a set of threshold wallets backed by
/// `S`. Holds `Party` handles for each initialized wallet but never reads
/// their share bytes directly — all share-touching arithmetic happens
/// inside `Party`'s own methods.
///
/// Per-wallet signing sessions are serialized by locking that wallet's
/// party set for the session's duration: the deterministic nonce derivation
/// means two concurrent signs of the same wallet would otherwise race on
/// shared `Party` state (see the governing specification's concurrency
/// model). Sessions for distinct wallets proceed independently.
pub struct TssCoordinator<S> {
    store: S,
    parties: DashMap<String, Mutex<Vec<Party>>>,
}

impl<S: ShareStore> TssCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            parties: DashMap::new(),
        }
    }

    /// Run Feldman VSS DKG for `wallet_id`, persist each resulting share,
    /// and return the public wallet record.
    ///
    /// If any share fails Feldman verification, nothing is persisted. If a
    /// `put` reports the wallet id already exists, the whole operation
    /// fails as `Conflict` and callers must pick a new wallet id. A `put`
    /// that fails with an I/O error after earlier `put`s in the same call
    /// have already succeeded leaves those shares in place — see
    /// `DESIGN.md` for why this partial-failure case is not rolled back.
    #[instrument(skip(self), fields(wallet_id))]
    pub fn perform_dkg(
        &self,
        wallet_id: &str,
        threshold: usize,
        n_parties: usize,
    ) -> Result<ThresholdWallet> {
        if n_parties == 0 || threshold == 0 || threshold > n_parties {
            return Err(Error::InvalidInput(format!(
                "threshold {threshold} must be in 1..={n_parties}"
            )));
        }

        let (commitments, shares) = generate_shares(threshold, n_parties)?;

        for (party_id, share) in &shares {
            if !verify_share(*party_id, &share.expose(), &commitments) {
                return Err(Error::CryptoFailure(format!(
                    "share for party {party_id} failed Feldman verification during DKG"
                )));
            }
        }

        for (party_id, share) in &shares {
            let key = threshold_share_key(wallet_id, *party_id);
            let hex_value = hex::encode(share.expose().to_bytes());
            self.store.put(&key, &hex_value)?;
        }

        let commitments_json = serde_json::to_string(&commitments.encode_hex())
            .map_err(|e| Error::Internal(format!("failed to serialize commitments: {e}")))?;
        self.store
            .put(&commitment_vector_key(wallet_id), &commitments_json)?;

        let share_ids: Vec<u32> = shares.iter().map(|(id, _)| *id).collect();

        info!(
            wallet_id,
            threshold,
            n_parties,
            master_public_key = hex::encode(commitments.master_public_key().encode(true)),
            "DKG completed"
        );

        Ok(ThresholdWallet {
            wallet_id: wallet_id.to_string(),
            commitments,
            share_ids,
        })
    }

    /// Reconstruct a wallet's public record (commitments + share ids) from
    /// what `perform_dkg` persisted, for processes that didn't run the DKG
    /// themselves — e.g. a CLI invocation that signs in a separate process
    /// from the one that generated the wallet. `n_parties` must match the
    /// value `perform_dkg` was called with.
    #[instrument(skip(self), fields(wallet_id))]
    pub fn load_wallet(&self, wallet_id: &str, n_parties: u32) -> Result<ThresholdWallet> {
        let commitments_json = self.store.get(&commitment_vector_key(wallet_id))?;
        let hex_points: Vec<String> = serde_json::from_str(&commitments_json)
            .map_err(|e| Error::Internal(format!("stored commitments are not valid JSON: {e}")))?;
        let commitments = crate::poly::CommitmentVector::decode_hex(&hex_points)?;

        Ok(ThresholdWallet {
            wallet_id: wallet_id.to_string(),
            commitments,
            share_ids: (1..=n_parties).collect(),
        })
    }

    /// Fetch every party's share from the store, re-verify it against the
    /// wallet's commitment vector, and construct its `Party` handle. Must
    /// be called with a `wallet` returned by `perform_dkg` for this
    /// `wallet_id` — there is no path to a `ThresholdWallet` otherwise.
    #[instrument(skip(self, wallet), fields(wallet_id = %wallet.wallet_id))]
    pub fn initialize_parties(&self, wallet: &ThresholdWallet) -> Result<()> {
        let mut parties = Vec::with_capacity(wallet.share_ids.len());

        for &party_id in &wallet.share_ids {
            let key = threshold_share_key(&wallet.wallet_id, party_id);
            let hex_value = self.store.get(&key)?;
            let bytes = hex::decode(&hex_value)
                .map_err(|e| Error::Internal(format!("stored share is not valid hex: {e}")))?;
            let bytes: [u8; 32] = bytes
                .try_into()
                .map_err(|_| Error::Internal("stored share is not 32 bytes".into()))?;
            let share = Scalar::reduce(&bytes);

            if !verify_share(party_id, &share, &wallet.commitments) {
                return Err(Error::CryptoFailure(format!(
                    "share for party {party_id} failed Feldman verification on load \
                     (stored share may have been tampered with)"
                )));
            }

            parties.push(Party::new(
                party_id,
                crate::field::SecretScalar::from_scalar(share),
            )?);
        }

        self.parties
            .insert(wallet.wallet_id.clone(), Mutex::new(parties));
        Ok(())
    }

    /// Run the 4-round signing protocol for `message` using exactly the
    /// parties in `signing_party_ids`.
    #[instrument(skip(self, message), fields(wallet_id = %wallet.wallet_id, n_signers = signing_party_ids.len()))]
    pub fn sign(
        &self,
        wallet: &ThresholdWallet,
        message: &[u8],
        signing_party_ids: &[u32],
    ) -> Result<ThresholdSignature> {
        let mut state = SessionState::Init;

        if signing_party_ids.len() < wallet.threshold() {
            return Err(Error::InvalidInput(format!(
                "need at least {} signers, got {}",
                wallet.threshold(),
                signing_party_ids.len()
            )));
        }

        let mut unique_ids = signing_party_ids.to_vec();
        unique_ids.sort_unstable();
        unique_ids.dedup();
        if unique_ids.len() != signing_party_ids.len() || unique_ids.contains(&0) {
            return Err(Error::InvalidInput(
                "signing party ids must be distinct and non-zero".into(),
            ));
        }
        for id in signing_party_ids {
            if !wallet.share_ids.contains(id) {
                return Err(Error::InvalidInput(format!(
                    "party {id} does not hold a share of this wallet"
                )));
            }
        }

        let entry = self
            .parties
            .get(&wallet.wallet_id)
            .ok_or_else(|| Error::NotFound(format!("parties not initialized for {}", wallet.wallet_id)))?;
        let mut guard = entry
            .lock()
            .map_err(|_| Error::Internal("party lock poisoned".into()))?;

        let result = self.run_rounds(&mut guard, &mut state, message, signing_party_ids, wallet);

        for party in guard.iter_mut() {
            if signing_party_ids.contains(&party.party_id()) {
                party.end_session();
            }
        }

        if result.is_err() {
            state = SessionState::Aborted;
            warn!(wallet_id = %wallet.wallet_id, ?state, "signing session aborted");
        }

        result
    }

    fn run_rounds(
        &self,
        parties: &mut [Party],
        state: &mut SessionState,
        message: &[u8],
        signing_party_ids: &[u32],
        wallet: &ThresholdWallet,
    ) -> Result<ThresholdSignature> {
        // Round 1: commitment
        *state = SessionState::Round1;
        let mut commitments_h = Vec::with_capacity(signing_party_ids.len());
        let mut public_ephemerals = Vec::with_capacity(signing_party_ids.len());
        for &id in signing_party_ids {
            let party = party_mut(parties, id)?;
            let (h, public_ephemeral) = party.round1_commit(message)?;
            commitments_h.push(h);
            public_ephemerals.push(Point::decode(&public_ephemeral)?);
        }
        debug!(round = 1, n = signing_party_ids.len(), "commitments collected");

        // Round 2: decommit and aggregate R
        *state = SessionState::Round2;
        for (idx, &id) in signing_party_ids.iter().enumerate() {
            let party = party_mut(parties, id)?;
            let public_bytes = public_ephemerals[idx].encode(true);
            if !party.verify_commitment(&public_bytes) {
                return Err(Error::CryptoFailure(format!(
                    "party {id}'s public ephemeral does not match its own commitment"
                )));
            }
        }
        let mut aggregated_r = Point::identity();
        for p in &public_ephemerals {
            aggregated_r = aggregated_r.add(p);
        }
        if aggregated_r.is_identity() {
            return Err(Error::CryptoFailure(
                "aggregated R is the identity point".into(),
            ));
        }
        let r_x = aggregated_r.x_scalar()?;
        if r_x.is_zero() {
            return Err(Error::CryptoFailure("aggregated R has x = 0".into()));
        }
        debug!(round = 2, "R aggregated");

        // Round 3: partial signatures
        *state = SessionState::Round3;
        let mut partial_sigs = Vec::with_capacity(signing_party_ids.len());
        for &id in signing_party_ids {
            let party = party_ref(parties, id)?;
            let (partial_s, party_r_x) = party.round3_partial_sign(message, &aggregated_r)?;
            if party_r_x.to_bytes() != r_x.to_bytes() {
                return Err(Error::Internal(
                    "party disagreed on aggregated R's x-coordinate".into(),
                ));
            }
            partial_sigs.push(partial_s);
        }
        debug!(round = 3, "partial signatures collected");

        // Round 4: aggregate
        *state = SessionState::Round4;
        let mut s = Scalar::ZERO;
        for partial in &partial_sigs {
            s = s.add(partial);
        }
        if s.is_zero() {
            return Err(Error::CryptoFailure("aggregated s = 0".into()));
        }

        let signature = ThresholdSignature {
            r_x: r_x.to_bytes(),
            s: s.to_bytes(),
        };

        verify_ecdsa(&wallet.master_public_key(), message, &signature)?;

        *state = SessionState::Done;
        Ok(signature)
    }
}

fn party_mut(parties: &mut [Party], id: u32) -> Result<&mut Party> {
    parties
        .iter_mut()
        .find(|p| p.party_id() == id)
        .ok_or_else(|| Error::Internal(format!("party {id} not initialized")))
}

fn party_ref(parties: &[Party], id: u32) -> Result<&Party> {
    parties
        .iter()
        .find(|p| p.party_id() == id)
        .ok_or_else(|| Error::Internal(format!("party {id} not initialized")))
}

/// Attempt standard ECDSA verification of `signature` against `pubkey` for
/// `message`. Per the governing specification this is an aspirational
/// check: the protocol above computes an additive Schnorr-style combine
/// (`s = sum(k_i + e*share_i)`), not `s = k^-1(e + r*x)`, so for a
/// threshold below the full party count this will generally — not just
/// occasionally — fail to verify. The coordinator is required to attempt
/// it anyway and surface the failure rather than returning a signature
/// nothing can check. See DESIGN.md for the resolution of this open
/// question.
fn verify_ecdsa(pubkey: &Point, message: &[u8], signature: &ThresholdSignature) -> Result<()> {
    use k256::ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey};

    let encoded = pubkey.encode(true);
    let verifying_key = VerifyingKey::from_sec1_bytes(&encoded)
        .map_err(|e| Error::CryptoFailure(format!("invalid master public key: {e}")))?;
    let ecdsa_sig = Signature::from_scalars(signature.r_x, signature.s)
        .map_err(|e| Error::CryptoFailure(format!("signature scalars out of range: {e}")))?;
    let digest = crate::field::sha256(message);

    verifying_key
        .verify_prehash(&digest, &ecdsa_sig)
        .map_err(|_| {
            Error::CryptoFailure(
                "aggregated signature does not verify as standard ECDSA".into(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use share_store::MemoryShareStore;

    fn coordinator() -> TssCoordinator<MemoryShareStore> {
        TssCoordinator::new(MemoryShareStore::new())
    }

    #[test]
    fn dkg_produces_a_share_per_party_that_verifies() {
        let tc = coordinator();
        let wallet = tc.perform_dkg("w1", 2, 3).unwrap();
        assert_eq!(wallet.share_ids, vec![1, 2, 3]);
        let pubkey = wallet.master_public_key().encode(true);
        assert!(pubkey[0] == 0x02 || pubkey[0] == 0x03);
        assert_eq!(pubkey.len(), 33);
    }

    #[test]
    fn repeated_dkg_for_same_wallet_is_conflict() {
        let tc = coordinator();
        tc.perform_dkg("w2", 2, 3).unwrap();
        let err = tc.perform_dkg("w2", 2, 3).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn threshold_above_n_parties_is_invalid_input() {
        let tc = coordinator();
        assert!(matches!(
            tc.perform_dkg("w3", 5, 3).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[test]
    fn signing_below_threshold_is_invalid_input() {
        let tc = coordinator();
        let wallet = tc.perform_dkg("w4", 2, 3).unwrap();
        tc.initialize_parties(&wallet).unwrap();
        let err = tc.sign(&wallet, b"order", &[1]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn sign_rounds_reach_a_nonzero_aggregate_then_surface_the_documented_ecdsa_gap() {
        // This protocol's partial-signature formula is a Schnorr-style
        // additive combine, not real threshold ECDSA (see DESIGN.md). The
        // coordinator still runs every round to completion: both the
        // aggregated R's x-coordinate and the summed s are confirmed
        // non-zero internally before the mandated ECDSA check runs and
        // (structurally, not flakily) reports CryptoFailure.
        let tc = coordinator();
        let wallet = tc.perform_dkg("w5", 2, 3).unwrap();
        tc.initialize_parties(&wallet).unwrap();
        let err = tc.sign(&wallet, b"order-1", &[1, 2]).unwrap_err();
        assert!(matches!(err, Error::CryptoFailure(_)));
    }

    #[test]
    fn load_wallet_reconstructs_what_perform_dkg_persisted() {
        let tc = coordinator();
        let wallet = tc.perform_dkg("w7", 2, 3).unwrap();
        let loaded = tc.load_wallet("w7", 3).unwrap();
        assert_eq!(loaded.share_ids, wallet.share_ids);
        assert!(loaded.master_public_key() == wallet.master_public_key());
    }

    #[test]
    fn tampered_stored_share_is_caught_at_initialize() {
        let store = MemoryShareStore::new();
        let tc = TssCoordinator::new(store);
        let wallet = tc.perform_dkg("w6", 2, 3).unwrap();

        // Overwriting requires going around the store's create-if-absent
        // contract; simulate the "mutate one stored share byte" scenario
        // by initializing against a wallet whose commitments don't match
        // what's stored (here: an all-zero commitment vector swap-in is
        // not representable through the public API, so we instead assert
        // that the honest path - in the previous tests - does verify, and
        // that initialize_parties would reject a corrupted wallet record).
        let mut corrupted = wallet.clone();
        corrupted.commitments.0[0] = Point::identity().add(&Point::generator());
        assert!(matches!(
            tc.initialize_parties(&corrupted),
            Err(Error::CryptoFailure(_))
        ));
    }
}
