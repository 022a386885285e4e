//! Pinned cryptographic primitives for the APSI engine.
//!
//! Hash-to-group and the fingerprint reduction are versioned so that
//! signatures and fingerprints stay comparable across implementations.
//! Changing either one is a protocol version bump.

use crate::error::{ApsiError, Result};
use ark_bls12_381::{g1, Bls12_381, Fr, G1Affine, G1Projective};
use ark_ec::hashing::curve_maps::wb::WBMap;
use ark_ec::hashing::map_to_curve_hasher::MapToCurveBasedHasher;
use ark_ec::hashing::HashToCurve;
use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ff::field_hashers::DefaultFieldHasher;
use ark_serialize::CanonicalSerialize;
use ark_std::UniformRand;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

/// Domain separation tag for hash-to-group, version 1.
pub const HASH_TO_GROUP_DST: &[u8] = b"APSI-V01-CS01-with-BLS12381G1_XMD:SHA-256_SSWU_RO_";

/// Prefix mixed into every fingerprint, version 1.
pub const FINGERPRINT_DOMAIN: &[u8] = b"apsi/fingerprint/v1";

/// Size of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// Target group of the pairing.
pub type Gt = PairingOutput<Bls12_381>;

/// A G2 point prepared for repeated pairing.
pub type G2Prepared = <Bls12_381 as Pairing>::G2Prepared;

type G1Hasher =
    MapToCurveBasedHasher<G1Projective, DefaultFieldHasher<Sha256, 128>, WBMap<g1::Config>>;

/// An element's authorization: `secret · H(element)` in G1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(pub(crate) G1Affine);

impl Signature {
    /// The underlying curve point.
    pub fn point(&self) -> &G1Affine {
        &self.0
    }

    /// Canonical compressed encoding of the point.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialize(&self.0)
    }
}

/// Fixed-size surrogate for a GT element, cheap to hash and compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(pub [u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// The digest bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

/// Map arbitrary bytes onto G1 (hash-to-group v1).
///
/// # Errors
/// Returns `ApsiError::HashToGroup` if the underlying hasher rejects the
/// input or the domain tag.
pub fn hash_to_group(input: &[u8]) -> Result<G1Affine> {
    let hasher =
        G1Hasher::new(HASH_TO_GROUP_DST).map_err(|e| ApsiError::HashToGroup(e.to_string()))?;
    hasher
        .hash(input)
        .map_err(|e| ApsiError::HashToGroup(e.to_string()))
}

/// Reduce a GT element to its fingerprint (fingerprint v1).
///
/// The same reduction has to be applied on both passes of a run; any
/// difference in encoding silently breaks matching.
pub fn fingerprint(value: &Gt) -> Result<Fingerprint> {
    let bytes = serialize(value)?;
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_DOMAIN);
    hasher.update(&bytes);
    let result = hasher.finalize();
    let mut digest = [0u8; FINGERPRINT_LEN];
    digest.copy_from_slice(&result[..FINGERPRINT_LEN]);
    Ok(Fingerprint(digest))
}

/// Evaluate `e(signature, point)` and reduce it to a fingerprint.
pub fn pair_and_fingerprint(signature: &Signature, point: &G2Prepared) -> Result<Fingerprint> {
    fingerprint(&pair(signature, point))
}

/// Evaluate `e(signature, point)`.
pub fn pair(signature: &Signature, point: &G2Prepared) -> Gt {
    Bls12_381::pairing(signature.0, point.clone())
}

/// Canonical compressed encoding of any arkworks value.
pub fn serialize<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    value
        .serialize_compressed(&mut bytes)
        .map_err(|e| ApsiError::Serialization(e.to_string()))?;
    Ok(bytes)
}

/// Sample a uniform scalar from the OS generator.
pub fn random_scalar() -> Fr {
    let mut rng = OsRng;
    random_scalar_with(&mut rng)
}

/// Generate a random scalar from the given generator.
pub fn random_scalar_with<R: RngCore + CryptoRng>(rng: &mut R) -> Fr {
    Fr::rand(rng)
}
