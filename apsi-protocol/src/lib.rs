//! # Authorized Private Set Intersection (APSI)
//!
//! This library computes the intersection of a client set and a server set
//! where every element has first been authorized (signed) by a trusted
//! party. Matching happens on pairing fingerprints, so neither pass sees the
//! other party's raw elements.
//!
//! Pairings run over BLS12-381 (arkworks). Element hashes and signatures live
//! in G1, the generator and both public keys in G2.
//!
//! ## Features
//!
//! - **Single session object**: [`Scheme`] holds parameters and both parties'
//!   keys, is immutable after setup and can be shared across threads.
//! - **Pluggable work distribution**: every run takes a [`Strategy`] deciding
//!   how the per-element pairings reach threads (sequential, one thread per
//!   element, bounded queue, atomic counter, static partition).
//! - **Precomputation**: the server can pair its signatures with `xP` once and
//!   reuse them across online runs ([`PrecomputedServer`]).
//! - **Correctness oracle**: plaintext intersections in [`oracle`] to check
//!   results against.
//!
//! ## Protocol Overview
//!
//! 1. **Setup**: pick a generator `P` and secrets `x` (client) and `y`
//!    (server); publish `xP` and `yP`.
//!
//! 2. **Authorize**: sign each element `e` as `x·H(e)` for the client or
//!    `y·H(e)` for the server.
//!
//! 3. **Interaction**: sample a fresh `r`. The server fingerprints
//!    `e(σ_i, r·xP)`, the client fingerprints `e(τ_j, r·yP)` and keeps `c_j`
//!    whenever its fingerprint was seen on the server side.
//!
//! ## Example Usage
//!
//! ```ignore
//! use apsi_protocol::{Element2, Role, Scheme, SchemeConfig, ApsiError};
//!
//! let scheme = Scheme::setup(SchemeConfig::default())?;
//!
//! let client: Vec<Element2> = [1, 2, 3].into_iter().map(Element2::from_u64).collect();
//! let server: Vec<Element2> = [2, 3, 4].into_iter().map(Element2::from_u64).collect();
//! let client_sigs = scheme.sign_set(&client, Role::Client)?;
//! let server_sigs = scheme.sign_set(&server, Role::Server)?;
//!
//! let result = scheme.atomic_interaction(&client, &client_sigs, &server, &server_sigs, 4)?;
//! assert_eq!(result.sorted(), vec![Element2::from_u64(2), Element2::from_u64(3)]);
//! # Ok::<(), ApsiError>(())
//! ```
//!
//! ## Security Considerations
//!
//! - Only elements present in both sets can produce matching fingerprints.
//! - Fingerprints from different runs are unrelated because each run draws
//!   its own blinding factor.
//! - The oracle functions see raw elements and are for testing and
//!   benchmarking only.
//!
//! ## Modules
//!
//! - [`crypto`] - Hash-to-group, pairing and fingerprint primitives
//! - [`element`] - Fixed-width set elements and set generators
//! - [`oracle`] - Plaintext reference intersections

pub use crypto::{Fingerprint, Signature};
pub use dispatch::{partition, Strategy};
pub use element::{Element, Element2, Element4};
pub use error::{ApsiError, Result};
pub use interaction::FingerprintSet;
pub use precompute::PrecomputedServer;
pub use result::IntersectionResult;
pub use scheme::{
    KeyMaterial, PairingGroup, Role, Scheme, SchemeConfig, SchemeParameters, SecurityLevel,
    BLS12_381,
};

pub mod crypto;
pub mod element;
pub mod oracle;

mod dispatch;
mod error;
mod interaction;
mod precompute;
mod result;
mod scheme;
