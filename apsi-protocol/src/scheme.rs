//! Scheme setup and per-element authorization.

use crate::crypto::{hash_to_group, random_scalar_with, Signature};
use crate::element::Element;
use crate::error::{ApsiError, Result};
use ark_bls12_381::{Fr, G2Affine, G2Projective};
use ark_ec::CurveGroup;
use ark_std::UniformRand;
use log::debug;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fmt;
use std::time::Instant;

/// The two protocol roles. Each one signs with its own secret key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Holds `x`; its set is the one the result is drawn from.
    Client,
    /// Holds `y`; contributes the fingerprint set.
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Server => write!(f, "server"),
        }
    }
}

/// Requested security level, in the terms of a type-A pairing group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecurityLevel {
    /// Bit length of the prime subgroup order `r`.
    pub order_bits: u32,
    /// Bit length of the base field prime `q`.
    pub field_bits: u32,
}

impl SecurityLevel {
    /// Bits of the field the pairing lands in for a type-A group, `F_{q^2}`.
    pub fn target_field_bits(&self) -> u32 {
        self.field_bits.saturating_mul(2)
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        Self {
            order_bits: 160,
            field_bits: 512,
        }
    }
}

/// Configuration handed to [`Scheme::setup`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchemeConfig {
    pub security: SecurityLevel,
    /// Log primitive operations and phase timings at debug level.
    pub verbose: bool,
}

impl SchemeConfig {
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Description of the pairing group backing a scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairingGroup {
    pub name: &'static str,
    pub order_bits: u32,
    pub base_field_bits: u32,
    pub embedding_degree: u32,
}

/// BLS12-381, the only group the engine is built on.
pub const BLS12_381: PairingGroup = PairingGroup {
    name: "BLS12-381",
    order_bits: 255,
    base_field_bits: 381,
    embedding_degree: 12,
};

impl PairingGroup {
    /// Bits of the target field `F_{q^k}`.
    pub fn target_field_bits(&self) -> u32 {
        self.base_field_bits * self.embedding_degree
    }

    /// Check that this group is at least as strong as `level` asks for.
    ///
    /// # Errors
    /// Returns `ApsiError::UnsupportedParameters` describing the first
    /// requirement the group cannot meet.
    pub fn check(&self, level: &SecurityLevel) -> Result<()> {
        if level.order_bits == 0 || level.field_bits == 0 {
            return Err(ApsiError::UnsupportedParameters(format!(
                "bit lengths must be non-zero (order {}, field {})",
                level.order_bits, level.field_bits
            )));
        }
        if level.order_bits > self.order_bits {
            return Err(ApsiError::UnsupportedParameters(format!(
                "{} has a {}-bit subgroup order, {} bits requested",
                self.name, self.order_bits, level.order_bits
            )));
        }
        if level.target_field_bits() > self.target_field_bits() {
            return Err(ApsiError::UnsupportedParameters(format!(
                "{} has a {}-bit target field, {} bits requested",
                self.name,
                self.target_field_bits(),
                level.target_field_bits()
            )));
        }
        Ok(())
    }
}

/// Public parameters shared read-only by both parties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchemeParameters {
    pub group: PairingGroup,
    /// The generator `P`, in G2.
    pub generator: G2Affine,
}

/// One party's key pair: secret scalar and `secret · P`.
#[derive(Clone, Copy)]
pub struct KeyMaterial {
    secret: Fr,
    public: G2Affine,
}

impl KeyMaterial {
    fn generate<R: RngCore + CryptoRng>(generator: &G2Affine, rng: &mut R) -> Self {
        let secret = random_scalar_with(rng);
        let public = (*generator * secret).into_affine();
        Self { secret, public }
    }

    pub(crate) fn secret(&self) -> &Fr {
        &self.secret
    }

    /// The public point `secret · P`.
    pub fn public(&self) -> &G2Affine {
        &self.public
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("secret", &"<redacted>")
            .field("public", &self.public)
            .finish()
    }
}

/// A single APSI session: parameters plus both parties' keys.
///
/// Everything in here is immutable after setup, so a `Scheme` can be
/// shared between threads and between concurrent runs.
#[derive(Clone, Debug)]
pub struct Scheme {
    pub(crate) config: SchemeConfig,
    pub(crate) params: SchemeParameters,
    pub(crate) client: KeyMaterial,
    pub(crate) server: KeyMaterial,
}

impl Scheme {
    /// Generate parameters and keys for both roles.
    ///
    /// # Errors
    /// Returns `ApsiError::UnsupportedParameters` if the backing group
    /// cannot provide the requested security level.
    pub fn setup(config: SchemeConfig) -> Result<Self> {
        let mut rng = OsRng;
        Self::setup_with_rng(config, &mut rng)
    }

    /// Same as [`Scheme::setup`] with an explicit randomness source.
    pub fn setup_with_rng<R: RngCore + CryptoRng>(
        config: SchemeConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let started = Instant::now();
        BLS12_381.check(&config.security)?;

        let generator = G2Projective::rand(rng).into_affine();
        let client = KeyMaterial::generate(&generator, rng);
        let server = KeyMaterial::generate(&generator, rng);

        if config.verbose {
            debug!(
                "setup on {} for {:?} took {:?}",
                BLS12_381.name,
                config.security,
                started.elapsed()
            );
        }

        Ok(Self {
            config,
            params: SchemeParameters {
                group: BLS12_381,
                generator,
            },
            client,
            server,
        })
    }

    pub fn config(&self) -> &SchemeConfig {
        &self.config
    }

    pub fn parameters(&self) -> &SchemeParameters {
        &self.params
    }

    /// The public point of `role` (`xP` or `yP`).
    pub fn public_key(&self, role: Role) -> &G2Affine {
        self.key(role).public()
    }

    pub(crate) fn key(&self, role: Role) -> &KeyMaterial {
        match role {
            Role::Client => &self.client,
            Role::Server => &self.server,
        }
    }

    /// Sign `element` under the secret key of `role`: `secret · H(element)`.
    ///
    /// Deterministic for a given scheme, element and role.
    pub fn authorize<const W: usize>(&self, element: &Element<W>, role: Role) -> Result<Signature> {
        let hashed = hash_to_group(element.as_bytes())?;
        Ok(Signature((hashed * self.key(role).secret()).into_affine()))
    }

    /// Sign every element of a set, index-aligned with the input.
    pub fn sign_set<const W: usize>(
        &self,
        elements: &[Element<W>],
        role: Role,
    ) -> Result<Vec<Signature>> {
        let started = Instant::now();
        let signatures = elements
            .iter()
            .map(|element| self.authorize(element, role))
            .collect::<Result<Vec<_>>>()?;

        if self.config.verbose {
            debug!(
                "signed {} {} elements in {:?}",
                signatures.len(),
                role,
                started.elapsed()
            );
        }
        Ok(signatures)
    }
}
