//! Plaintext intersections used to check the engine's output.
//!
//! Nothing here is private: both routines see the raw elements. They exist
//! as a correctness reference and as the insecure baselines in benchmarks.

use crate::element::Element;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Intersection by direct lookup of raw elements.
///
/// Output follows the server set's order.
pub fn insecure_intersection<const W: usize>(
    client: &[Element<W>],
    server: &[Element<W>],
) -> Vec<Element<W>> {
    let lookup: HashSet<&Element<W>> = client.iter().collect();
    server
        .iter()
        .filter(|element| lookup.contains(element))
        .copied()
        .collect()
}

/// Intersection where the server publishes SHA-256 digests of its elements
/// and the client matches its own digests against them.
///
/// Output follows the client set's order.
pub fn naive_hashing_intersection<const W: usize>(
    client: &[Element<W>],
    server: &[Element<W>],
) -> Vec<Element<W>> {
    let lookup: HashSet<[u8; 32]> = server.iter().map(digest).collect();
    client
        .iter()
        .filter(|element| lookup.contains(&digest(element)))
        .copied()
        .collect()
}

fn digest<const W: usize>(element: &Element<W>) -> [u8; 32] {
    let result = Sha256::digest(element.as_bytes());
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Multiset equality of two element lists.
pub fn same_elements<const W: usize>(x: &[Element<W>], y: &[Element<W>]) -> bool {
    if x.len() != y.len() {
        return false;
    }
    let mut diff: HashMap<&Element<W>, isize> = HashMap::with_capacity(x.len());
    for element in x {
        *diff.entry(element).or_insert(0) += 1;
    }
    for element in y {
        match diff.get_mut(element) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    diff.remove(element);
                }
            }
            None => return false,
        }
    }
    diff.is_empty()
}
