//! Baby-Jubjub keypairs, point packing and ECDH
//!
//! Public keys are points on the Baby-Jubjub twisted Edwards curve (whose
//! base field is the BN254 scalar field, so coordinates are circuit-friendly).
//! The packed form is the 32-byte little-endian `y` coordinate with the sign
//! of `x` stored in the top bit of the last byte.

use ark_ec::{twisted_edwards::TECurveConfig, AffineRepr, CurveGroup};
use ark_ed_on_bn254::{EdwardsAffine, EdwardsConfig, Fq, Fr as JubjubScalar};
use ark_ff::{BigInteger, Field, PrimeField};
use rand::{CryptoRng, RngCore};

use crate::{digest, Element, Error, Result};

/// A packed Baby-Jubjub public key
pub type PackedPoint = [u8; 32];

/// A Baby-Jubjub keypair
///
/// The private key is a field scalar; the public key is the packed point
/// `sk · G` for the prime-order subgroup generator `G`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keypair {
    pub private_key: Element,
    pub public_key: PackedPoint,
}

impl Keypair {
    /// Derive a keypair from arbitrary seed bytes
    ///
    /// The private key is `sha256(seed) mod p`.
    #[must_use]
    pub fn from_seed(seed: &[u8]) -> Self {
        Self::from_private_key(digest::sha256_to_element(seed))
    }

    /// Build the keypair for a known private key
    #[must_use]
    pub fn from_private_key(private_key: Element) -> Self {
        Self {
            private_key,
            public_key: private_to_public(private_key),
        }
    }

    /// Generate a throwaway keypair (used for dummy notes and ephemeral
    /// sender keys)
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }
}

/// Compute the packed public key for a private key
#[must_use]
pub fn private_to_public(private_key: Element) -> PackedPoint {
    let point = (EdwardsAffine::generator() * to_scalar(private_key)).into_affine();
    pack_point(&point)
}

/// ECDH shared secret: `sha256(pack(sk · unpack(pk)))`
///
/// The result is a 32-byte value used directly as an AES-256 key.
pub fn ecdh(private_key: Element, public_key: &PackedPoint) -> Result<[u8; 32]> {
    let point = unpack_point(public_key)?;
    let shared = (point * to_scalar(private_key)).into_affine();
    Ok(digest::sha256(&pack_point(&shared)))
}

/// Pack a point into 32 bytes
#[must_use]
pub fn pack_point(point: &EdwardsAffine) -> PackedPoint {
    let mut bytes = fq_to_le_bytes(point.y);
    if is_negative(point.x) {
        bytes[31] |= 0x80;
    }
    bytes
}

/// Unpack 32 bytes into a curve point
///
/// Fails with [`Error::InvalidPoint`] if the encoded `y` is non-canonical or
/// has no matching `x` on the curve.
pub fn unpack_point(packed: &PackedPoint) -> Result<EdwardsAffine> {
    let sign = packed[31] & 0x80 != 0;

    let mut y_bytes = *packed;
    y_bytes[31] &= 0x7f;

    // reject y >= p rather than silently reducing
    if Element::from_le_bytes(y_bytes) >= Element::MODULUS {
        return Err(Error::InvalidPoint);
    }
    let y = Fq::from_le_bytes_mod_order(&y_bytes);

    // a·x² + y² = 1 + d·x²·y²  =>  x² = (1 - y²) / (a - d·y²)
    let y2 = y.square();
    let denominator = EdwardsConfig::COEFF_A - EdwardsConfig::COEFF_D * y2;
    let x2 = (Fq::ONE - y2) * denominator.inverse().ok_or(Error::InvalidPoint)?;

    let mut x = x2.sqrt().ok_or(Error::InvalidPoint)?;
    if is_negative(x) != sign {
        x = -x;
    }

    let point = EdwardsAffine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(Error::InvalidPoint);
    }

    Ok(point)
}

/// Unpack a point and return its coordinates as field elements
///
/// This is the form the note commitment hashes over.
pub fn unpack_point_coords(packed: &PackedPoint) -> Result<(Element, Element)> {
    let point = unpack_point(packed)?;
    Ok((Element::from_fr(point.x), Element::from_fr(point.y)))
}

/// Pack a point given as field coordinates
///
/// The inverse of [`unpack_point_coords`]; fails with
/// [`Error::InvalidPoint`] if `(x, y)` does not sit on the curve.
pub fn pack_point_coords(x: Element, y: Element) -> Result<PackedPoint> {
    let point = EdwardsAffine::new_unchecked(x.to_fr(), y.to_fr());
    if !point.is_on_curve() {
        return Err(Error::InvalidPoint);
    }
    Ok(pack_point(&point))
}

fn to_scalar(private_key: Element) -> JubjubScalar {
    JubjubScalar::from_be_bytes_mod_order(&private_key.to_be_bytes())
}

fn fq_to_le_bytes(value: Fq) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_le();
    let mut padded = [0u8; 32];
    padded[..bytes.len()].copy_from_slice(&bytes);
    padded
}

// "negative" means the larger of {x, -x}, i.e. x > (p - 1) / 2
fn is_negative(x: Fq) -> bool {
    x.into_bigint() > Fq::MODULUS_MINUS_ONE_DIV_TWO
}
