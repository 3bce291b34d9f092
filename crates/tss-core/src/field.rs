//! Scalar arithmetic mod the secp256k1 group order and curve-point operations.
//!
//! `Scalar` and `Point` are nominal wrappers over `k256` types rather than
//! raw `k256::Scalar`/`k256::ProjectivePoint` so that call sites can't
//! accidentally mix curve and field values with some other representation.
//! `SecretScalar` is the dedicated secret-carrying variant: it stores its
//! value as a byte array and zeroizes on drop, rather than relying on
//! `k256::Scalar` to wipe itself.

use crate::{Error, Result};
use k256::{
    elliptic_curve::{
        bigint::U256,
        group::GroupEncoding,
        ops::Reduce,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Field,
    },
    AffinePoint, EncodedPoint, ProjectivePoint,
};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An element of the scalar field mod n (the secp256k1 group order).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Scalar(k256::Scalar);

impl Scalar {
    pub const ZERO: Scalar = Scalar(k256::Scalar::ZERO);
    pub const ONE: Scalar = Scalar(k256::Scalar::ONE);

    pub fn from_u64(x: u64) -> Scalar {
        Scalar(k256::Scalar::from(x))
    }

    /// Reduce a 32-byte big-endian value mod n.
    pub fn reduce(bytes: &[u8; 32]) -> Scalar {
        Scalar(<k256::Scalar as Reduce<U256>>::reduce_bytes(
            &(*bytes).into(),
        ))
    }

    pub fn random() -> Scalar {
        Scalar(k256::Scalar::random(&mut OsRng))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == k256::Scalar::ZERO
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    pub fn add(&self, other: &Scalar) -> Scalar {
        Scalar(self.0 + other.0)
    }

    pub fn mul(&self, other: &Scalar) -> Scalar {
        Scalar(self.0 * other.0)
    }

    pub fn sub(&self, other: &Scalar) -> Scalar {
        Scalar(self.0 - other.0)
    }

    pub fn negate(&self) -> Scalar {
        Scalar(-self.0)
    }

    pub fn invert(&self) -> Result<Scalar> {
        Option::<k256::Scalar>::from(self.0.invert())
            .map(Scalar)
            .ok_or_else(|| Error::CryptoFailure("scalar has no inverse".into()))
    }

    /// `base^exp mod n` by repeated squaring. Exponents in this crate are
    /// always small party ids (x-coordinates) raised to `0..threshold`, so
    /// this need not run in constant time.
    pub fn mod_pow(base: &Scalar, exp: u32) -> Scalar {
        let mut result = Scalar::ONE;
        let mut b = *base;
        let mut e = exp;
        while e > 0 {
            if e & 1 == 1 {
                result = result.mul(&b);
            }
            b = b.mul(&b);
            e >>= 1;
        }
        result
    }

    pub(crate) fn inner(&self) -> k256::Scalar {
        self.0
    }
}

/// A scalar known to carry secret material. Stored as a byte array so that
/// `zeroize` actually overwrites the memory on drop; converted to a
/// [`Scalar`] only for the duration of an arithmetic operation.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretScalar {
    bytes: [u8; 32],
}

impl SecretScalar {
    pub fn from_scalar(s: Scalar) -> Self {
        Self { bytes: s.to_bytes() }
    }

    pub fn expose(&self) -> Scalar {
        Scalar::reduce(&self.bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.expose().is_zero()
    }
}

/// A secp256k1 curve point, including the identity.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Point(ProjectivePoint);

impl Point {
    pub fn identity() -> Point {
        Point(ProjectivePoint::IDENTITY)
    }

    pub fn is_identity(&self) -> bool {
        self.0 == ProjectivePoint::IDENTITY
    }

    pub fn generator() -> Point {
        Point(ProjectivePoint::GENERATOR)
    }

    pub fn mul_g(s: &Scalar) -> Point {
        Point(ProjectivePoint::GENERATOR * s.inner())
    }

    pub fn mul(&self, s: &Scalar) -> Point {
        Point(self.0 * s.inner())
    }

    pub fn add(&self, other: &Point) -> Point {
        Point(self.0 + other.0)
    }

    /// x-coordinate of this point reduced into the scalar domain, as used
    /// by ECDSA's `r` component. Errors if this point is the identity.
    pub fn x_scalar(&self) -> Result<Scalar> {
        if self.is_identity() {
            return Err(Error::CryptoFailure(
                "x-coordinate of the identity point is undefined".into(),
            ));
        }
        let encoded = self.0.to_affine().to_encoded_point(false);
        let x_bytes: [u8; 32] = encoded.x().expect("non-identity point has an x").as_slice()
            [..32]
            .try_into()
            .expect("32-byte field element");
        Ok(Scalar::reduce(&x_bytes))
    }

    pub fn encode(&self, compressed: bool) -> Vec<u8> {
        self.0.to_affine().to_encoded_point(compressed).as_bytes().to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Point> {
        let encoded = EncodedPoint::from_bytes(bytes)
            .map_err(|e| Error::CryptoFailure(format!("invalid point encoding: {e}")))?;
        let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
        let affine = affine.ok_or_else(|| Error::CryptoFailure("point not on curve".into()))?;
        let point = Point(ProjectivePoint::from(affine));
        if point.is_identity() {
            return Err(Error::CryptoFailure(
                "decoded point is the identity, which is invalid here".into(),
            ));
        }
        Ok(point)
    }

    pub(crate) fn as_bytes_for_hash(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

/// sha256(bytes)
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_round_trip_compressed() {
        let s = Scalar::random();
        let p = Point::mul_g(&s);
        let encoded = p.encode(true);
        assert_eq!(encoded.len(), 33);
        let decoded = Point::decode(&encoded).unwrap();
        assert!(decoded == p);
    }

    #[test]
    fn point_round_trip_uncompressed() {
        let s = Scalar::random();
        let p = Point::mul_g(&s);
        let encoded = p.encode(false);
        let decoded = Point::decode(&encoded).unwrap();
        assert!(decoded == p);
    }

    #[test]
    fn decode_rejects_identity() {
        let identity_compressed = Point::identity().0.to_affine().to_encoded_point(true);
        assert!(Point::decode(identity_compressed.as_bytes()).is_err());
    }

    #[test]
    fn scalar_reduce_is_idempotent() {
        let bytes = sha256(b"some arbitrary input");
        let once = Scalar::reduce(&bytes);
        let twice = Scalar::reduce(&once.to_bytes());
        assert!(once == twice);
    }

    #[test]
    fn mod_pow_matches_repeated_mul() {
        let base = Scalar::from_u64(7);
        let mut expected = Scalar::ONE;
        for _ in 0..5 {
            expected = expected.mul(&base);
        }
        assert!(Scalar::mod_pow(&base, 5) == expected);
    }

    #[test]
    fn secret_scalar_zeroizes_bytes() {
        let s = Scalar::from_u64(0xdead_beef);
        let mut secret = SecretScalar::from_scalar(s);
        assert!(!secret.is_zero());
        secret.zeroize();
        assert_eq!(secret.bytes, [0u8; 32]);
    }
}
