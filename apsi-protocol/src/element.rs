//! Fixed-width set elements and set construction helpers.

use rand::distributions::{Distribution, Standard};
use rand::Rng;
use std::collections::HashSet;
use std::fmt;

/// A set member: `W` raw bytes.
///
/// Ordering is lexicographic over the bytes, which is also numeric
/// big-endian order. Results are sorted with it when a deterministic
/// output is needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Element<const W: usize>(pub [u8; W]);

/// Two-byte elements.
pub type Element2 = Element<2>;

/// Four-byte elements.
pub type Element4 = Element<4>;

impl<const W: usize> Element<W> {
    /// Build an element from the low `W` bytes of `value`, big-endian.
    ///
    /// Widths above eight bytes are zero-padded on the left.
    pub fn from_u64(value: u64) -> Self {
        let be = value.to_be_bytes();
        let n = W.min(be.len());
        let mut bytes = [0u8; W];
        bytes[W - n..].copy_from_slice(&be[be.len() - n..]);
        Self(bytes)
    }

    /// The raw bytes that get hashed onto the curve.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<const W: usize> From<[u8; W]> for Element<W> {
    fn from(bytes: [u8; W]) -> Self {
        Self(bytes)
    }
}

impl<const W: usize> AsRef<[u8]> for Element<W> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const W: usize> fmt::Display for Element<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl<const W: usize> Distribution<Element<W>> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Element<W> {
        let mut bytes = [0u8; W];
        rng.fill_bytes(&mut bytes);
        Element(bytes)
    }
}

/// Drop repeated elements, keeping the first occurrence of each.
pub fn dedup_elements<const W: usize>(elements: Vec<Element<W>>) -> Vec<Element<W>> {
    let mut seen = HashSet::with_capacity(elements.len());
    elements
        .into_iter()
        .filter(|element| seen.insert(*element))
        .collect()
}

/// Draw `size` uniformly random elements and deduplicate them.
///
/// With small widths collisions are likely, so the returned set can be
/// shorter than `size`.
pub fn generate_random_set<const W: usize, R: Rng + ?Sized>(
    size: usize,
    rng: &mut R,
) -> Vec<Element<W>> {
    let drawn = (0..size).map(|_| rng.gen::<Element<W>>()).collect();
    dedup_elements(drawn)
}

/// Consecutive elements `start..start + len`, used to build sets with a
/// known intersection.
pub fn element_range<const W: usize>(start: u64, len: usize) -> Vec<Element<W>> {
    (start..start + len as u64).map(Element::from_u64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_from_u64() {
        assert_eq!(Element2::from_u64(0x0102).0, [0x01, 0x02]);
        assert_eq!(Element4::from_u64(0x0102).0, [0x00, 0x00, 0x01, 0x02]);
        // Truncated to the low bytes
        assert_eq!(Element2::from_u64(0x0a0b_0c0d).0, [0x0c, 0x0d]);
        assert_eq!(
            Element::<10>::from_u64(1).0,
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 1]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Element2::from_u64(2).to_string(), "0x0002");
        assert_eq!(Element4::from([0xde, 0xad, 0xbe, 0xef]).to_string(), "0xdeadbeef");
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut elements = vec![
            Element2::from_u64(0x0300),
            Element2::from_u64(0x0002),
            Element2::from_u64(0x0100),
        ];
        elements.sort();
        assert_eq!(
            elements,
            vec![
                Element2::from_u64(0x0002),
                Element2::from_u64(0x0100),
                Element2::from_u64(0x0300),
            ]
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let elements = vec![
            Element2::from_u64(3),
            Element2::from_u64(1),
            Element2::from_u64(3),
            Element2::from_u64(2),
            Element2::from_u64(1),
        ];
        assert_eq!(
            dedup_elements(elements),
            vec![
                Element2::from_u64(3),
                Element2::from_u64(1),
                Element2::from_u64(2),
            ]
        );
    }

    #[test]
    fn test_generate_random_set_is_unique() {
        let mut rng = OsRng;
        // 2-byte elements collide often at this size
        let set = generate_random_set::<2, _>(5000, &mut rng);
        assert!(set.len() <= 5000);
        assert!(!set.is_empty());
        let unique: HashSet<_> = set.iter().collect();
        assert_eq!(unique.len(), set.len());
    }

    #[test]
    fn test_generate_random_set_empty() {
        let mut rng = OsRng;
        assert!(generate_random_set::<4, _>(0, &mut rng).is_empty());
    }

    #[test]
    fn test_element_range() {
        let range = element_range::<2>(0x10, 3);
        assert_eq!(
            range,
            vec![
                Element2::from_u64(0x10),
                Element2::from_u64(0x11),
                Element2::from_u64(0x12),
            ]
        );
        assert!(element_range::<2>(5, 0).is_empty());
    }
}
