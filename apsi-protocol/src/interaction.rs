//! The matching protocol.
//!
//! One run, under any [`Strategy`]:
//!
//! 1. Sample a fresh blinding factor `r` and derive `r·xP` and `r·yP`.
//! 2. Server pass: fingerprint `e(σ_i, r·xP)` for every server signature.
//! 3. Client pass: fingerprint `e(τ_j, r·yP)` for every client signature and
//!    keep `c_j` when the fingerprint was contributed by the server.
//!
//! Both pairings equal `e(H(e), P)^{xyr}` exactly when the underlying
//! elements are equal, so matching fingerprints mean matching elements.

use crate::crypto::{pair_and_fingerprint, random_scalar, Fingerprint, G2Prepared, Signature};
use crate::dispatch::Strategy;
use crate::element::Element;
use crate::error::{ApsiError, Result};
use crate::result::IntersectionResult;
use crate::scheme::{Role, Scheme};
use ark_ec::CurveGroup;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Instant;

/// Fingerprints contributed by the server during one run.
///
/// Filled under a lock during the server pass, then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintSet(HashSet<Fingerprint>);

impl FingerprintSet {
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.0.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reject a set whose signature array does not line up with it.
pub(crate) fn check_lengths(role: Role, elements: usize, signatures: usize) -> Result<()> {
    if elements != signatures {
        return Err(ApsiError::LengthMismatch {
            role,
            elements,
            signatures,
        });
    }
    Ok(())
}

/// Run `fingerprint_of` over `0..len` and gather the results.
///
/// Returns only once every worker has finished.
pub(crate) fn collect_fingerprints<F>(
    strategy: Strategy,
    len: usize,
    fingerprint_of: F,
) -> Result<FingerprintSet>
where
    F: Fn(usize) -> Result<Fingerprint> + Sync,
{
    let fingerprints = Mutex::new(HashSet::with_capacity(len));
    strategy.run(len, |index| {
        let fingerprint = fingerprint_of(index)?;
        fingerprints.lock().insert(fingerprint);
        Ok(())
    })?;
    Ok(FingerprintSet(fingerprints.into_inner()))
}

/// The per-run points `r·xP` and `r·yP`, prepared for pairing.
///
/// `r` itself is dropped as soon as both points are derived.
pub(crate) struct Blinding {
    pub(crate) rx_p: G2Prepared,
    pub(crate) ry_p: G2Prepared,
}

impl Blinding {
    /// Sample a fresh blinding factor for one run of `scheme`.
    pub(crate) fn fresh(scheme: &Scheme) -> Self {
        let r = random_scalar();
        Self {
            rx_p: (*scheme.client.public() * r).into_affine().into(),
            ry_p: (*scheme.server.public() * r).into_affine().into(),
        }
    }
}

/// Server pass: fingerprint `e(σ_i, r·xP)` for every server signature.
pub(crate) fn server_pass(
    strategy: Strategy,
    server_sigs: &[Signature],
    blinding: &Blinding,
) -> Result<FingerprintSet> {
    collect_fingerprints(strategy, server_sigs.len(), |index| {
        pair_and_fingerprint(&server_sigs[index], &blinding.rx_p)
    })
}

/// Client pass: keep every client element whose fingerprint the server
/// contributed.
pub(crate) fn match_client<const W: usize>(
    strategy: Strategy,
    client_set: &[Element<W>],
    client_sigs: &[Signature],
    fingerprints: &FingerprintSet,
    ry_p: &G2Prepared,
) -> Result<IntersectionResult<W>> {
    let matched = Mutex::new(Vec::new());
    strategy.run(client_sigs.len(), |index| {
        let fingerprint = pair_and_fingerprint(&client_sigs[index], ry_p)?;
        if fingerprints.contains(&fingerprint) {
            matched.lock().push(client_set[index]);
        }
        Ok(())
    })?;
    Ok(IntersectionResult::new(matched.into_inner()))
}

impl Scheme {
    /// Run the protocol one element at a time on the calling thread.
    pub fn interaction<const W: usize>(
        &self,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        server_set: &[Element<W>],
        server_sigs: &[Signature],
    ) -> Result<IntersectionResult<W>> {
        self.interaction_with(
            Strategy::Sequential,
            client_set,
            client_sigs,
            server_set,
            server_sigs,
        )
    }

    /// Run the protocol with one thread per element in each pass.
    pub fn threaded_interaction<const W: usize>(
        &self,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        server_set: &[Element<W>],
        server_sigs: &[Signature],
    ) -> Result<IntersectionResult<W>> {
        self.interaction_with(
            Strategy::Unbounded,
            client_set,
            client_sigs,
            server_set,
            server_sigs,
        )
    }

    /// Run the protocol on `workers` threads draining a shared work queue.
    pub fn queued_interaction<const W: usize>(
        &self,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        server_set: &[Element<W>],
        server_sigs: &[Signature],
        workers: usize,
    ) -> Result<IntersectionResult<W>> {
        self.interaction_with(
            Strategy::BoundedQueue { workers },
            client_set,
            client_sigs,
            server_set,
            server_sigs,
        )
    }

    /// Run the protocol on `workers` threads claiming indices from an
    /// atomic counter.
    pub fn atomic_interaction<const W: usize>(
        &self,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        server_set: &[Element<W>],
        server_sigs: &[Signature],
        workers: usize,
    ) -> Result<IntersectionResult<W>> {
        self.interaction_with(
            Strategy::AtomicDispatch { workers },
            client_set,
            client_sigs,
            server_set,
            server_sigs,
        )
    }

    /// Run the protocol on `workers` threads, each owning a contiguous slice
    /// of the indices.
    pub fn partitioned_interaction<const W: usize>(
        &self,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        server_set: &[Element<W>],
        server_sigs: &[Signature],
        workers: usize,
    ) -> Result<IntersectionResult<W>> {
        self.interaction_with(
            Strategy::StaticPartition { workers },
            client_set,
            client_sigs,
            server_set,
            server_sigs,
        )
    }

    /// Run the protocol under `strategy`.
    ///
    /// # Errors
    /// - `ApsiError::LengthMismatch` if a set and its signatures differ in
    ///   length, before any cryptographic work.
    /// - `ApsiError::InvalidWorkerCount` for a bounded strategy with no
    ///   workers.
    /// - Any primitive failure or worker panic, which aborts the whole run.
    pub fn interaction_with<const W: usize>(
        &self,
        strategy: Strategy,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        server_set: &[Element<W>],
        server_sigs: &[Signature],
    ) -> Result<IntersectionResult<W>> {
        check_lengths(Role::Client, client_set.len(), client_sigs.len())?;
        check_lengths(Role::Server, server_set.len(), server_sigs.len())?;
        strategy.validate()?;

        let outcome = self.run_protocol(strategy, client_set, client_sigs, server_sigs);
        if let Err(e) = &outcome {
            warn!("{} interaction aborted: {}", strategy, e);
        }
        outcome
    }

    fn run_protocol<const W: usize>(
        &self,
        strategy: Strategy,
        client_set: &[Element<W>],
        client_sigs: &[Signature],
        server_sigs: &[Signature],
    ) -> Result<IntersectionResult<W>> {
        let started = Instant::now();

        let blinding = Blinding::fresh(self);

        let fingerprints = server_pass(strategy, server_sigs, &blinding)?;
        if self.config.verbose {
            debug!(
                "{} server pass: {} fingerprints after {:?}",
                strategy,
                fingerprints.len(),
                started.elapsed()
            );
        }

        let result = match_client(
            strategy,
            client_set,
            client_sigs,
            &fingerprints,
            &blinding.ry_p,
        )?;
        if self.config.verbose {
            debug!(
                "{} client pass: {} of {} matched, run took {:?}",
                strategy,
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
    use crate::scheme::SchemeConfig;

    struct Signed {
        scheme: Scheme,
        client: Vec<Element2>,
        client_sigs: Vec<Signature>,
        server: Vec<Element2>,
        server_sigs: Vec<Signature>,
    }

    fn signed(client: &[u64], server: &[u64]) -> Signed {
        let scheme = Scheme::setup(SchemeConfig::default()).unwrap();
        let client: Vec<Element2> = client.iter().copied().map(Element2::from_u64).collect();
        let server: Vec<Element2> = server.iter().copied().map(Element2::from_u64).collect();
        let client_sigs = scheme.sign_set(&client, Role::Client).unwrap();
        let server_sigs = scheme.sign_set(&server, Role::Server).unwrap();
        Signed {
            scheme,
            client,
            client_sigs,
            server,
            server_sigs,
        }
    }

    fn strategies() -> Vec<Strategy> {
        let mut strategies = vec![Strategy::Sequential, Strategy::Unbounded];
        strategies.extend(Strategy::bounded(2));
        strategies
    }

    impl Signed {
        fn run(&self, strategy: Strategy) -> Result<IntersectionResult<2>> {
            self.scheme.interaction_with(
                strategy,
                &self.client,
                &self.client_sigs,
                &self.server,
                &self.server_sigs,
            )
        }
    }

    #[test]
    fn test_concrete_scenario_every_strategy() {
        let s = signed(&[0x0001, 0x0002, 0x0003], &[0x0002, 0x0003, 0x0004]);
        let expected = vec![Element2::from_u64(0x0002), Element2::from_u64(0x0003)];
        for strategy in strategies() {
            let result = s.run(strategy).unwrap();
            assert_eq!(result.sorted(), expected, "{}", strategy);
        }
    }

    #[test]
    fn test_sequential_preserves_client_order() {
        let s = signed(&[9, 4, 7, 1], &[1, 7, 9]);
        let result = s
            .scheme
            .interaction(&s.client, &s.client_sigs, &s.server, &s.server_sigs)
            .unwrap();
        assert_eq!(
            result.elements,
            vec![Element2::from_u64(9), Element2::from_u64(7), Element2::from_u64(1)]
        );
    }

    #[test]
    fn test_named_entry_points() {
        let s = signed(&[1, 2, 3, 4], &[3, 4, 5]);
        let expected = vec![Element2::from_u64(3), Element2::from_u64(4)];
        let scheme = &s.scheme;

        let threaded = scheme
            .threaded_interaction(&s.client, &s.client_sigs, &s.server, &s.server_sigs)
            .unwrap();
        let queued = scheme
            .queued_interaction(&s.client, &s.client_sigs, &s.server, &s.server_sigs, 3)
            .unwrap();
        let atomic = scheme
            .atomic_interaction(&s.client, &s.client_sigs, &s.server, &s.server_sigs, 3)
            .unwrap();
        let partitioned = scheme
            .partitioned_interaction(&s.client, &s.client_sigs, &s.server, &s.server_sigs, 3)
            .unwrap();

        for result in [threaded, queued, atomic, partitioned] {
            assert_eq!(result.sorted(), expected);
        }
    }

    #[test]
    fn test_queue_and_atomic_record_the_matching_element() {
        // The matching element is last, so a stale index would show up as
        // the first client element instead.
        let s = signed(&[10, 11, 12, 13], &[13]);
        for strategy in [
            Strategy::BoundedQueue { workers: 2 },
            Strategy::AtomicDispatch { workers: 2 },
        ] {
            let result = s.run(strategy).unwrap();
            assert_eq!(result.elements, vec![Element2::from_u64(13)], "{}", strategy);
        }
    }

    #[test]
    fn test_empty_sets() {
        let cases = [
            (&[][..], &[1u64, 2][..]),
            (&[1, 2][..], &[][..]),
            (&[][..], &[][..]),
        ];
        for (client, server) in cases {
            let s = signed(client, server);
            for strategy in strategies() {
                assert!(s.run(strategy).unwrap().is_empty(), "{}", strategy);
            }
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let s = signed(&[1, 2, 3], &[2, 3]);

        let result = s
            .scheme
            .interaction(&s.client, &s.client_sigs[..2], &s.server, &s.server_sigs);
        assert_eq!(
            result,
            Err(ApsiError::LengthMismatch {
                role: Role::Client,
                elements: 3,
                signatures: 2,
            })
        );

        let result = s
            .scheme
            .threaded_interaction(&s.client, &s.client_sigs, &s.server[..1], &s.server_sigs);
        assert_eq!(
            result,
            Err(ApsiError::LengthMismatch {
                role: Role::Server,
                elements: 1,
                signatures: 2,
            })
        );
    }

    #[test]
    fn test_zero_workers_rejected() {
        let s = signed(&[1], &[1]);
        for strategy in Strategy::bounded(0) {
            assert_eq!(s.run(strategy), Err(ApsiError::InvalidWorkerCount));
        }
    }

    #[test]
    fn test_signatures_from_another_scheme_do_not_match() {
        let s = signed(&[1, 2, 3], &[1, 2, 3]);
        let other = Scheme::setup(SchemeConfig::default()).unwrap();
        let foreign_sigs = other.sign_set(&s.server, Role::Server).unwrap();

        let result = s
            .scheme
            .interaction(&s.client, &s.client_sigs, &s.server, &foreign_sigs)
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_server_pass() {
        let s = signed(&[1, 2], &[]);
        let blinding = Blinding::fresh(&s.scheme);
        let fingerprints = server_pass(Strategy::Unbounded, &s.server_sigs, &blinding).unwrap();
        assert!(fingerprints.is_empty());
    }

    #[test]
    fn test_server_signed_as_client_does_not_match() {
        // Authorization is per role: a server set signed with x never matches.
        let s = signed(&[1, 2], &[1, 2]);
        let wrong_role = s.scheme.sign_set(&s.server, Role::Client).unwrap();
        let result = s
            .scheme
            .interaction(&s.client, &s.client_sigs, &s.server, &wrong_role)
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_concrete_scenario_for_any_worker_count() {
        let s = signed(&[1, 2, 3], &[2, 3, 4]);
        let expected = vec![Element2::from_u64(2), Element2::from_u64(3)];
        for workers in [1, 2, 3, 16, 100] {
            for strategy in Strategy::bounded(workers) {
                assert_eq!(s.run(strategy).unwrap().sorted(), expected, "{}", strategy);
            }
        }
        let precomputed = s
            .scheme
            .precomputed_interaction(&s.client, &s.client_sigs, &s.server, &s.server_sigs)
            .unwrap();
        assert_eq!(precomputed.sorted(), expected);
    }

    #[test]
    fn test_small_overlap_in_larger_sets() {
        // 37 client elements, 5 of them also held by the server
        let client: Vec<u64> = (0..37).collect();
        let server: Vec<u64> = (32..45).collect();
        let s = signed(&client, &server);
        let expected: Vec<Element2> = (32..37).map(Element2::from_u64).collect();
        for strategy in Strategy::bounded(4) {
            assert_eq!(s.run(strategy).unwrap().sorted(), expected, "{}", strategy);
        }
    }

    #[test]
    fn test_fresh_blinding_changes_server_fingerprints() {
        let s = signed(&[1, 2, 3], &[2, 3, 4]);
        let strategy = Strategy::AtomicDispatch { workers: 2 };
        let first = Blinding::fresh(&s.scheme);
        let second = Blinding::fresh(&s.scheme);

        let fingerprints = server_pass(strategy, &s.server_sigs, &first).unwrap();
        assert_eq!(fingerprints.len(), 3);

        let client_pass = |blinding: &Blinding| {
            match_client(strategy, &s.client, &s.client_sigs, &fingerprints, &blinding.ry_p)
        };
        assert_eq!(client_pass(&first).unwrap().len(), 2);

        // Client points from another run never line up with this run's server pass.
        assert!(client_pass(&second).unwrap().is_empty());
    }

    #[test]
    fn test_collect_fingerprints_deduplicates() {
        let strategy = Strategy::AtomicDispatch { workers: 4 };
        let fingerprints =
            collect_fingerprints(strategy, 10, |index| Ok(Fingerprint([(index % 3) as u8; 32])))
                .unwrap();
        assert!(!fingerprints.is_empty());
        assert_eq!(fingerprints.len(), 3);
        assert!(fingerprints.contains(&Fingerprint([2; 32])));
        assert!(!fingerprints.contains(&Fingerprint([3; 32])));
    }
}
