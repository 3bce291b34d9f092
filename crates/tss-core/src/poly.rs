//! Feldman verifiable secret sharing: share generation and verification.

use crate::field::{Point, Scalar, SecretScalar};
use crate::{Error, Result};
use tracing::instrument;

/// An ordered commitment vector `[C_0, C_1, ..., C_{t-1}]`, `C_i = a_i * G`.
/// `C_0` is the master public key.
#[derive(Clone)]
pub struct CommitmentVector(pub Vec<Point>);

impl CommitmentVector {
    pub fn master_public_key(&self) -> Point {
        self.0[0]
    }

    pub fn threshold(&self) -> usize {
        self.0.len()
    }

    /// Compressed-point hex encoding of each commitment, in order. The
    /// commitment vector is public (it's what makes shares verifiable) so
    /// this is safe to persist alongside, but not inside, the Share Store's
    /// secret-share entries.
    pub fn encode_hex(&self) -> Vec<String> {
        self.0.iter().map(|p| hex::encode(p.encode(true))).collect()
    }

    pub fn decode_hex(values: &[String]) -> Result<CommitmentVector> {
        let points = values
            .iter()
            .map(|v| {
                let bytes = hex::decode(v)
                    .map_err(|e| Error::Internal(format!("commitment is not valid hex: {e}")))?;
                Point::decode(&bytes)
            })
            .collect::<Result<Vec<Point>>>()?;
        Ok(CommitmentVector(points))
    }
}

/// Evaluate a polynomial given by its coefficients (lowest degree first) at
/// `x`, in naive power form. `threshold <= 32` per the spec, so this need
/// not be Horner's method for performance.
fn evaluate(coefficients: &[Scalar], x: &Scalar) -> Scalar {
    let mut result = Scalar::ZERO;
    let mut x_power = Scalar::ONE;
    for coef in coefficients {
        result = result.add(&coef.mul(&x_power));
        x_power = x_power.mul(x);
    }
    result
}

/// Generate a random degree-(t-1) polynomial and evaluate it at each party
/// id `1..=n_parties`, returning the Feldman commitments and the shares.
///
/// The coefficient array — and in particular the constant term `a_0`, the
/// master secret — is zeroized before this function returns. `a_0` is never
/// exposed to callers or persisted anywhere.
#[instrument(skip_all, fields(threshold = t, n_parties))]
pub fn generate_shares(
    t: usize,
    n_parties: usize,
) -> Result<(CommitmentVector, Vec<(u32, SecretScalar)>)> {
    if t == 0 || t > n_parties {
        return Err(Error::InvalidInput(format!(
            "threshold {t} must be in 1..={n_parties}"
        )));
    }

    let mut coefficients: Vec<Scalar> = (0..t)
        .map(|_| {
            // Coefficients are drawn uniformly; a zero constant term would
            // make the master secret zero, which is invalid.
            loop {
                let c = Scalar::random();
                if !c.is_zero() {
                    return c;
                }
            }
        })
        .collect();

    let commitments = CommitmentVector(coefficients.iter().map(Point::mul_g).collect());

    let mut shares = Vec::with_capacity(n_parties);
    for party_id in 1..=n_parties as u32 {
        let x = Scalar::from_u64(party_id as u64);
        let share = evaluate(&coefficients, &x);
        if !verify_share(party_id, &share, &commitments) {
            coefficients.zeroize_all();
            return Err(Error::CryptoFailure(format!(
                "freshly generated share for party {party_id} failed Feldman verification"
            )));
        }
        shares.push((party_id, SecretScalar::from_scalar(share)));
    }

    coefficients.zeroize_all();

    Ok((commitments, shares))
}

trait ZeroizeVec {
    fn zeroize_all(&mut self);
}

impl ZeroizeVec for Vec<Scalar> {
    fn zeroize_all(&mut self) {
        for s in self.iter_mut() {
            *s = Scalar::ZERO;
        }
        self.clear();
    }
}

/// Verify that `s_p . G == sum_j C_j * p^j`.
pub fn verify_share(party_id: u32, s_p: &Scalar, commitments: &CommitmentVector) -> bool {
    if party_id == 0 {
        return false;
    }
    let expected = Point::mul_g(s_p);

    let x = Scalar::from_u64(party_id as u64);
    let mut actual = Point::identity();
    for (j, c_j) in commitments.0.iter().enumerate() {
        let x_pow_j = Scalar::mod_pow(&x, j as u32);
        actual = actual.add(&c_j.mul(&x_pow_j));
    }

    expected == actual
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_generated_share_verifies() {
        let (commitments, shares) = generate_shares(2, 3).unwrap();
        assert_eq!(commitments.threshold(), 2);
        assert_eq!(shares.len(), 3);
        for (party_id, share) in &shares {
            assert!(verify_share(*party_id, &share.expose(), &commitments));
        }
    }

    #[test]
    fn tampered_share_fails_verification() {
        let (commitments, shares) = generate_shares(2, 3).unwrap();
        let (party_id, share) = &shares[0];
        let tampered = share.expose().add(&Scalar::ONE);
        assert!(!verify_share(*party_id, &tampered, &commitments));
    }

    #[test]
    fn party_id_zero_is_rejected() {
        let (commitments, _) = generate_shares(2, 3).unwrap();
        assert!(!verify_share(0, &Scalar::ONE, &commitments));
    }

    #[test]
    fn threshold_above_party_count_is_invalid_input() {
        let err = generate_shares(4, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    proptest::proptest! {
        #[test]
        fn reconstruction_via_lagrange_matches_master_public_key(
            t in 2usize..5, n in 5usize..8,
        ) {
            let t = t.min(n);
            let (commitments, shares) = generate_shares(t, n).unwrap();
            let subset = &shares[..t];

            // Lagrange-interpolate the constant term from `t` shares. This
            // path exists only to test the invariant; production code never
            // reconstructs the master secret.
            let xs: Vec<Scalar> = subset.iter().map(|(id, _)| Scalar::from_u64(*id as u64)).collect();
            let mut secret = Scalar::ZERO;
            for (i, (_, share)) in subset.iter().enumerate() {
                let mut num = Scalar::ONE;
                let mut den = Scalar::ONE;
                for (j, xj) in xs.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    num = num.mul(xj);
                    den = den.mul(&xj.sub(&xs[i]));
                }
                let lambda = num.mul(&den.invert().unwrap());
                secret = secret.add(&share.expose().mul(&lambda));
            }

            prop_assert!(Point::mul_g(&secret) == commitments.master_public_key());
        }
    }
}
