//! Precomputed variant of the protocol.
//!
//! `e(σ_i, r·xP) = e(σ_i, xP)^r`, and `e(σ_i, xP)` does not depend on the
//! blinding factor. The server can pair every signature with `xP` ahead of
//! time, leaving one exponentiation in GT per element for the online server
//! pass instead of a full pairing. The client pass is unchanged.

use crate::crypto::{fingerprint, pair, random_scalar, G2Prepared, Gt, Signature};
use crate::dispatch::Strategy;
use crate::element::Element;
use crate::error::Result;
use crate::interaction::{check_lengths, collect_fingerprints, match_client};
use crate::result::IntersectionResult;
use crate::scheme::{Role, Scheme};
use ark_ec::CurveGroup;
use log::{debug, warn};
use parking_lot::Mutex;
use std::time::Instant;

/// The server's offline pairings `e(σ_i, xP)`.
///
/// Independent of any blinding factor, so one precomputation serves any
/// number of online runs against the same scheme and signatures. Order is
/// not meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecomputedServer {
    paired: Vec<Gt>,
}

impl PrecomputedServer {
    pub fn len(&self) -> usize {
        self.paired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paired.is_empty()
    }
}

impl Scheme {
    /// Offline phase: pair every server signature with `xP`, one thread per
    /// signature.
    pub fn precompute_server<const W: usize>(
        &self,
        server_set: &[Element<W>],
        server_sigs: &[Signature],
    ) -> Result<PrecomputedServer> {
        check_lengths(Role::Server, server_set.len(), server_sigs.len())?;
        let started = Instant::now();

        let x_p: G2Prepared = (*self.client.public()).into();
        let paired = Mutex::new(Vec::with_capacity(server_sigs.len()));
        Strategy::Unbounded.run(server_sigs.len(), |index| {
            let value = pair(&server_sigs[index], &x_p);
            paired.lock().push(value);
            Ok(())
        })?;

        if self.config.verbose {
            debug!(
                "precomputed {} server pairings in {:?}",
                server_sigs.len(),
                started.elapsed()
            );
        }
        Ok(PrecomputedServer {
            paired: paired.into_inner(),
        })
    }

    /// Online phase against precomputed server pairings.
    ///
    /// Samples its own blinding factor, so repeated calls with the same
    /// `precomputed` are independent runs.
    pub fn online_interaction<const W: usize>(
        &self,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        precomputed: &PrecomputedServer,
    ) -> Result<IntersectionResult<W>> {
        check_lengths(Role::Client, client_set.len(), client_sigs.len())?;

        let outcome = self.run_online(client_set, client_sigs, precomputed);
        if let Err(e) = &outcome {
            warn!("precomputed interaction aborted: {}", e);
        }
        outcome
    }

    /// Both phases back to back.
    pub fn precomputed_interaction<const W: usize>(
        &self,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        server_set: &[Element<W>],
        server_sigs: &[Signature],
    ) -> Result<IntersectionResult<W>> {
        check_lengths(Role::Client, client_set.len(), client_sigs.len())?;
        let precomputed = self.precompute_server(server_set, server_sigs)?;
        self.online_interaction(client_set, client_sigs, &precomputed)
    }

    fn run_online<const W: usize>(
        &self,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        precomputed: &PrecomputedServer,
    ) -> Result<IntersectionResult<W>> {
        let started = Instant::now();

        let r = random_scalar();
        let ry_p: G2Prepared = (*self.server.public() * r).into_affine().into();

        let fingerprints = collect_fingerprints(Strategy::Unbounded, precomputed.len(), |index| {
            fingerprint(&(precomputed.paired[index] * r))
        })?;
        let result = match_client(
            Strategy::Unbounded,
            client_set,
            client_sigs,
            &fingerprints,
            &ry_p,
        )?;

        if self.config.verbose {
            debug!(
                "online run: {} fingerprints, {} of {} matched in {:?}",
                fingerprints.len(),
                result.len(),
                client_sigs.len(),
                started.elapsed()
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element2;
    use crate::error::ApsiError;
    use crate::scheme::SchemeConfig;
    use ark_bls12_381::Bls12_381;
    use ark_ec::pairing::Pairing;
    use std::collections::HashSet;

    fn sets() -> (Vec<Element2>, Vec<Element2>) {
        let client = [1u64, 2, 3].into_iter().map(Element2::from_u64).collect();
        let server = [2u64, 3, 4].into_iter().map(Element2::from_u64).collect();
        (client, server)
    }

    #[test]
    fn test_precomputed_interaction_concrete_scenario() {
        let scheme = Scheme::setup(SchemeConfig::default()).unwrap();
        let (client, server) = sets();
        let client_sigs = scheme.sign_set(&client, Role::Client).unwrap();
        let server_sigs = scheme.sign_set(&server, Role::Server).unwrap();

        let result = scheme
            .precomputed_interaction(&client, &client_sigs, &server, &server_sigs)
            .unwrap();
        assert_eq!(result.sorted(), vec![Element2::from_u64(2), Element2::from_u64(3)]);
    }

    #[test]
    fn test_precomputation_is_reusable() {
        let scheme = Scheme::setup(SchemeConfig::default().with_verbose(true)).unwrap();
        let (client, server) = sets();
        let client_sigs = scheme.sign_set(&client, Role::Client).unwrap();
        let server_sigs = scheme.sign_set(&server, Role::Server).unwrap();

        let precomputed = scheme.precompute_server(&server, &server_sigs).unwrap();
        assert_eq!(precomputed.len(), 3);

        let first = scheme.online_interaction(&client, &client_sigs, &precomputed).unwrap();
        let second = scheme.online_interaction(&client, &client_sigs, &precomputed).unwrap();
        assert!(first.matches(&second.elements));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_precomputed_matches_direct_pairing() {
        // e(σ, xP)^r has to agree with e(σ, r·xP), or the passes would never
        // line up.
        let scheme = Scheme::setup(SchemeConfig::default()).unwrap();
        let (_, server) = sets();
        let server_sigs = scheme.sign_set(&server, Role::Server).unwrap();
        let precomputed = scheme.precompute_server(&server, &server_sigs).unwrap();

        let r = random_scalar();
        let rx_p = (*scheme.public_key(Role::Client) * r).into_affine();
        let direct: HashSet<_> = server_sigs
            .iter()
            .map(|sig| fingerprint(&Bls12_381::pairing(*sig.point(), rx_p)).unwrap())
            .collect();
        let online: HashSet<_> = precomputed
            .paired
            .iter()
            .map(|value| fingerprint(&(*value * r)).unwrap())
            .collect();
        assert_eq!(direct, online);
    }

    #[test]
    fn test_precompute_empty_and_mismatched() {
        let scheme = Scheme::setup(SchemeConfig::default()).unwrap();
        let (client, server) = sets();
        let client_sigs = scheme.sign_set(&client, Role::Client).unwrap();

        let empty = scheme.precompute_server::<2>(&[], &[]).unwrap();
        assert!(empty.is_empty());
        assert!(scheme
            .online_interaction(&client, &client_sigs, &empty)
            .unwrap()
            .is_empty());

        assert!(matches!(
            scheme.precompute_server(&server, &client_sigs[..1]),
            Err(ApsiError::LengthMismatch {
                role: Role::Server,
                ..
            })
        ));
        assert!(matches!(
            scheme.online_interaction(&client[..2], &client_sigs, &empty),
            Err(ApsiError::LengthMismatch {
                role: Role::Client,
                ..
            })
        ));
    }
}
