use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Maximum extent of one dataset dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaxExtent {
    /// The dimension may grow up to and including this extent.
    Fixed(u64),
    /// The dimension may grow without bound.
    Unlimited,
}

impl MaxExtent {
    /// Returns `true` if `extent` does not exceed this cap.
    pub fn admits(&self, extent: u64) -> bool {
        match self {
            Self::Fixed(cap) => extent <= *cap,
            Self::Unlimited => true,
        }
    }
}

impl fmt::Display for MaxExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(cap) => write!(f, "{cap}"),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Largest number of elements a dense dataset may hold.
pub const MAX_ELEMENTS: u64 = 1 << 24;

/// Number of elements held by an array of the given shape, or `None` if the
/// product overflows.
///
/// A rank-0 shape holds exactly one element.
pub fn element_count(shape: &[u64]) -> Option<u64> {
    shape.iter().try_fold(1u64, |n, &e| n.checked_mul(e))
}

/// Length of the dense storage for `shape`, capped at [`MAX_ELEMENTS`].
pub fn dense_len(shape: &[u64]) -> Result<usize, TypeError> {
    element_count(shape)
        .filter(|&n| n <= MAX_ELEMENTS)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| TypeError::ShapeTooLarge {
            shape: shape.to_vec(),
            limit: MAX_ELEMENTS,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_admits_up_to_cap() {
        assert!(MaxExtent::Fixed(4).admits(4));
        assert!(!MaxExtent::Fixed(4).admits(5));
        assert!(MaxExtent::Unlimited.admits(u64::MAX));
    }

    #[test]
    fn element_count_of_scalar_is_one() {
        assert_eq!(element_count(&[]), Some(1));
        assert_eq!(element_count(&[3, 4]), Some(12));
        assert_eq!(element_count(&[3, 0]), Some(0));
    }

    #[test]
    fn element_count_overflow_is_none() {
        assert_eq!(element_count(&[1 << 33, 1 << 33]), None);
        assert_eq!(element_count(&[1 << 33, 1 << 33, 0]), None);
        assert_eq!(element_count(&[u64::MAX, 1]), Some(u64::MAX));
    }

    #[test]
    fn dense_len_enforces_cap() {
        assert_eq!(dense_len(&[4, 4]).unwrap(), 16);
        assert_eq!(dense_len(&[MAX_ELEMENTS]).unwrap() as u64, MAX_ELEMENTS);
        assert!(matches!(
            dense_len(&[MAX_ELEMENTS + 1]),
            Err(TypeError::ShapeTooLarge { .. })
        ));
        assert!(dense_len(&[1 << 33, 1 << 33]).is_err());
    }
}
