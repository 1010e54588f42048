use tessera_types::{dense_len, MaxExtent};

use crate::error::{SelectError, SelectResult};
use crate::region::{linear_offset, strides, RegionSelection};

/// Whether a resize may shrink dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResizeMode {
    /// Every dimension must keep or increase its extent.
    #[default]
    GrowOnly,
    /// Dimensions may shrink; elements outside the new shape are discarded.
    AllowTruncate,
}

/// A validated shape change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResizePlan {
    pub old_shape: Vec<u64>,
    pub new_shape: Vec<u64>,
    /// Element count of `new_shape`.
    pub len: usize,
}

/// Validate growing (or, with [`ResizeMode::AllowTruncate`], shrinking) a
/// dataset from `shape` to `new_shape` under `max_shape`.
pub fn plan_resize(
    shape: &[u64],
    max_shape: &[MaxExtent],
    new_shape: &[u64],
    mode: ResizeMode,
) -> SelectResult<ResizePlan> {
    if new_shape.len() != shape.len() {
        return Err(SelectError::InvalidResize(format!(
            "rank cannot change from {} to {}",
            shape.len(),
            new_shape.len()
        )));
    }
    if max_shape.len() != shape.len() {
        return Err(SelectError::InvalidResize(format!(
            "maximum shape has rank {}, shape has rank {}",
            max_shape.len(),
            shape.len()
        )));
    }

    for (dim, ((&old, &new), cap)) in shape.iter().zip(new_shape).zip(max_shape).enumerate() {
        if !cap.admits(new) {
            return Err(SelectError::InvalidResize(format!(
                "dimension {dim}: extent {new} exceeds maximum {cap}"
            )));
        }
        if new < old && mode == ResizeMode::GrowOnly {
            return Err(SelectError::InvalidResize(format!(
                "dimension {dim}: shrinking {old} to {new} requires truncation"
            )));
        }
    }

    let len = dense_len(new_shape).map_err(|e| SelectError::InvalidResize(e.to_string()))?;

    Ok(ResizePlan {
        old_shape: shape.to_vec(),
        new_shape: new_shape.to_vec(),
        len,
    })
}

impl ResizePlan {
    pub fn is_noop(&self) -> bool {
        self.old_shape == self.new_shape
    }

    /// Re-lay row-major `data` of the old shape into the new shape.
    ///
    /// Elements keep their coordinates; new positions hold `fill`.
    pub fn apply<T: Clone>(&self, data: &[T], fill: &T) -> Vec<T> {
        let old_strides = strides(&self.old_shape);
        let mut out = Vec::with_capacity(self.len);
        for coord in RegionSelection::all(&self.new_shape).coordinates() {
            let inside = coord.iter().zip(&self.old_shape).all(|(c, e)| c < e);
            let value = if inside {
                data.get(linear_offset(&coord, &old_strides) as usize)
                    .unwrap_or(fill)
            } else {
                fill
            };
            out.push(value.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::ErrorKind;

    #[test]
    fn grow_unlimited_dimension() {
        let plan = plan_resize(
            &[1, 8],
            &[MaxExtent::Unlimited, MaxExtent::Fixed(8)],
            &[5, 8],
            ResizeMode::GrowOnly,
        )
        .unwrap();
        let data: Vec<u32> = (1..=8).collect();
        let grown = plan.apply(&data, &0);
        assert_eq!(grown.len(), 40);
        assert_eq!(&grown[..8], &data[..]);
        assert!(grown[8..].iter().all(|v| *v == 0));
    }

    #[test]
    fn grow_inner_dimension_keeps_coordinates() {
        let plan = plan_resize(
            &[2, 2],
            &[MaxExtent::Fixed(2), MaxExtent::Fixed(3)],
            &[2, 3],
            ResizeMode::GrowOnly,
        )
        .unwrap();
        assert_eq!(plan.apply(&[1, 2, 3, 4], &0), vec![1, 2, 0, 3, 4, 0]);
    }

    #[test]
    fn beyond_cap_is_invalid() {
        let err = plan_resize(
            &[1, 8],
            &[MaxExtent::Unlimited, MaxExtent::Fixed(8)],
            &[1, 9],
            ResizeMode::GrowOnly,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResize);
    }

    #[test]
    fn shrinking_requires_truncation() {
        let max = [MaxExtent::Unlimited];
        let err = plan_resize(&[4], &max, &[2], ResizeMode::GrowOnly).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResize);

        let plan = plan_resize(&[4], &max, &[2], ResizeMode::AllowTruncate).unwrap();
        assert_eq!(plan.apply(&[1, 2, 3, 4], &0), vec![1, 2]);
    }

    #[test]
    fn rank_change_is_invalid() {
        let err = plan_resize(&[4], &[MaxExtent::Unlimited], &[4, 1], ResizeMode::GrowOnly)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResize);
    }

    #[test]
    fn overflowing_shape_is_invalid() {
        let max = [MaxExtent::Unlimited, MaxExtent::Unlimited];
        let err = plan_resize(&[1, 1], &max, &[1 << 33, 1 << 33], ResizeMode::GrowOnly)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResize);
    }

    #[test]
    fn shape_over_element_cap_is_invalid() {
        let max = [MaxExtent::Unlimited];
        let err = plan_resize(
            &[1],
            &max,
            &[tessera_types::MAX_ELEMENTS + 1],
            ResizeMode::GrowOnly,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResize);
        let plan = plan_resize(&[1], &max, &[1024], ResizeMode::GrowOnly).unwrap();
        assert_eq!(plan.len, 1024);
    }

    #[test]
    fn same_shape_is_noop() {
        let plan =
            plan_resize(&[3], &[MaxExtent::Fixed(3)], &[3], ResizeMode::GrowOnly).unwrap();
        assert!(plan.is_noop());
    }
}
