//! Output of an interaction run.

use crate::element::Element;
use crate::oracle::same_elements;

/// The client elements whose fingerprint was contributed by the server.
///
/// Concurrent strategies fill this in whatever order their workers finish,
/// so only set equality is meaningful. Use [`IntersectionResult::sorted`]
/// for a deterministic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntersectionResult<const W: usize> {
    /// Matching client elements
    pub elements: Vec<Element<W>>,
}

impl<const W: usize> IntersectionResult<W> {
    /// Create a new result from the matched elements.
    pub fn new(elements: Vec<Element<W>>) -> Self {
        Self { elements }
    }

    /// Returns the number of elements in the intersection.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the intersection is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, element: &Element<W>) -> bool {
        self.elements.contains(element)
    }

    /// The elements in ascending byte order.
    pub fn sorted(&self) -> Vec<Element<W>> {
        let mut elements = self.elements.clone();
        elements.sort_unstable();
        elements
    }

    /// Multiset equality with another list of elements, ignoring order.
    pub fn matches(&self, other: &[Element<W>]) -> bool {
        same_elements(&self.elements, other)
    }
}

impl<const W: usize> Default for IntersectionResult<W> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
