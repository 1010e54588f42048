use tessera_types::{element_count, MaxExtent};
use tracing::debug;

use crate::error::{SelectError, SelectResult};
use crate::spec::{DimSpec, SelectionSpec};

/// One dimension of a bound selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DimSelection {
    pub start: u64,
    /// Exclusive.
    pub stop: u64,
    pub step: u64,
    /// Selected by a single index; absent from the result shape.
    pub reduced: bool,
}

impl DimSelection {
    /// The whole of a dimension with the given extent.
    pub fn full(extent: u64) -> Self {
        Self {
            start: 0,
            stop: extent,
            step: 1,
            reduced: false,
        }
    }

    /// Number of indices selected.
    pub fn count(&self) -> u64 {
        if self.stop <= self.start {
            0
        } else {
            (self.stop - self.start - 1) / self.step + 1
        }
    }

    /// The `i`-th selected index.
    pub fn index(&self, i: u64) -> u64 {
        self.start + i * self.step
    }
}

/// A selection bound to one dataset's shape at resolution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionSelection {
    dims: Vec<DimSelection>,
    dataset_shape: Vec<u64>,
}

impl RegionSelection {
    /// Select every element of a dataset with `shape`.
    pub fn all(shape: &[u64]) -> Self {
        Self {
            dims: shape.iter().map(|&e| DimSelection::full(e)).collect(),
            dataset_shape: shape.to_vec(),
        }
    }

    /// Bind a parsed selection to the current `shape`.
    pub fn bind(spec: &SelectionSpec, shape: &[u64]) -> SelectResult<Self> {
        check_addressable(shape)?;
        let rank = shape.len();
        let given = spec.dims.len();
        if given > rank || (given < rank && !spec.fill_rest) {
            return Err(SelectError::InvalidSelection(format!(
                "selection has {given} dimensions, dataset has rank {rank}"
            )));
        }

        let mut dims = Vec::with_capacity(rank);
        for (dim, &extent) in shape.iter().enumerate() {
            let selected = match spec.dims.get(dim) {
                None => DimSelection::full(extent),
                Some(DimSpec::Point(index)) => {
                    if *index >= extent {
                        return Err(SelectError::OutOfBounds {
                            dim,
                            reason: format!("index {index} is not below extent {extent}"),
                        });
                    }
                    DimSelection {
                        start: *index,
                        stop: index + 1,
                        step: 1,
                        reduced: true,
                    }
                }
                Some(DimSpec::Slice { start, stop, step }) => {
                    let start = start.unwrap_or(0);
                    let stop = stop.unwrap_or(extent);
                    check_bounds(dim, start, stop, extent)?;
                    DimSelection {
                        start,
                        stop,
                        step: *step,
                        reduced: false,
                    }
                }
            };
            dims.push(selected);
        }

        Ok(Self {
            dims,
            dataset_shape: shape.to_vec(),
        })
    }

    /// Parse `text` and bind it to `shape`.
    pub fn parse(text: &str, shape: &[u64]) -> SelectResult<Self> {
        Self::bind(&SelectionSpec::parse(text)?, shape)
    }

    /// Build a selection from explicit per-dimension arrays.
    ///
    /// Omitted arrays default to `0`, the current extent, and `1`. Every
    /// supplied array must have the dataset's rank.
    pub fn hyperslab(
        shape: &[u64],
        start: Option<&[u64]>,
        stop: Option<&[u64]>,
        step: Option<&[u64]>,
    ) -> SelectResult<Self> {
        check_addressable(shape)?;
        let rank = shape.len();
        for (name, array) in [("start", start), ("stop", stop), ("step", step)] {
            if let Some(array) = array {
                if array.len() != rank {
                    return Err(SelectError::InvalidSelection(format!(
                        "{name} array has {} entries, dataset has rank {rank}",
                        array.len()
                    )));
                }
            }
        }

        let mut dims = Vec::with_capacity(rank);
        for (dim, &extent) in shape.iter().enumerate() {
            let lo = start.map_or(0, |s| s[dim]);
            let hi = stop.map_or(extent, |s| s[dim]);
            let stride = step.map_or(1, |s| s[dim]);
            if stride == 0 {
                return Err(SelectError::InvalidStep { dim, step: 0 });
            }
            check_bounds(dim, lo, hi, extent)?;
            dims.push(DimSelection {
                start: lo,
                stop: hi,
                step: stride,
                reduced: false,
            });
        }

        Ok(Self {
            dims,
            dataset_shape: shape.to_vec(),
        })
    }

    pub fn dims(&self) -> &[DimSelection] {
        &self.dims
    }

    /// Shape of the dataset this selection was bound to.
    pub fn dataset_shape(&self) -> &[u64] {
        &self.dataset_shape
    }

    /// Shape of the selected values, point-selected dimensions dropped.
    pub fn shape(&self) -> Vec<u64> {
        self.dims
            .iter()
            .filter(|d| !d.reduced)
            .map(DimSelection::count)
            .collect()
    }

    /// Number of selected elements.
    pub fn count(&self) -> u64 {
        self.dims
            .iter()
            .map(DimSelection::count)
            .fold(1, u64::saturating_mul)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Fail with `ShapeMismatch` unless `actual` is exactly [`shape`](Self::shape).
    pub fn check_shape(&self, actual: &[u64]) -> SelectResult<()> {
        let expected = self.shape();
        if expected != actual {
            return Err(SelectError::ShapeMismatch {
                expected,
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }

    /// Selected coordinates in row-major order (last dimension fastest).
    pub fn coordinates(&self) -> Coordinates<'_> {
        Coordinates {
            dims: &self.dims,
            cursor: vec![0; self.dims.len()],
            remaining: self.count(),
        }
    }

    /// Row-major linear offsets into the dataset, in selection order.
    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        let strides = strides(&self.dataset_shape);
        self.coordinates()
            .map(move |coord| linear_offset(&coord, &strides))
    }
}

/// Parse `text` against a dataset's current and maximum shape.
///
/// Bounds are checked against `shape` only; a selection never grows a dataset.
pub fn parse(text: &str, shape: &[u64], max_shape: &[MaxExtent]) -> SelectResult<RegionSelection> {
    if max_shape.len() != shape.len() {
        return Err(SelectError::InvalidSelection(format!(
            "maximum shape has rank {}, shape has rank {}",
            max_shape.len(),
            shape.len()
        )));
    }
    let spec = SelectionSpec::parse(text)?;
    let selection = RegionSelection::bind(&spec, shape)?;
    debug!(selection = %spec, count = selection.count(), "bound selection");
    Ok(selection)
}

/// Row-major odometer over a [`RegionSelection`].
#[derive(Clone, Debug)]
pub struct Coordinates<'a> {
    dims: &'a [DimSelection],
    cursor: Vec<u64>,
    remaining: u64,
}

impl Iterator for Coordinates<'_> {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Vec<u64>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let coord = self
            .dims
            .iter()
            .zip(&self.cursor)
            .map(|(d, &i)| d.index(i))
            .collect();

        for k in (0..self.dims.len()).rev() {
            self.cursor[k] += 1;
            if self.cursor[k] < self.dims[k].count() {
                break;
            }
            self.cursor[k] = 0;
        }

        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

/// Fail with `InvalidSelection` if `shape` has more elements than a `u64`
/// offset can address.
pub(crate) fn check_addressable(shape: &[u64]) -> SelectResult<()> {
    if element_count(shape).is_none() {
        return Err(SelectError::InvalidSelection(format!(
            "dataset shape {shape:?} overflows the element index"
        )));
    }
    Ok(())
}

fn check_bounds(dim: usize, start: u64, stop: u64, extent: u64) -> SelectResult<()> {
    if stop > extent {
        return Err(SelectError::OutOfBounds {
            dim,
            reason: format!("stop {stop} exceeds extent {extent}"),
        });
    }
    if start > stop {
        return Err(SelectError::OutOfBounds {
            dim,
            reason: format!("start {start} exceeds stop {stop}"),
        });
    }
    Ok(())
}

/// Row-major strides of `shape`, in elements.
pub(crate) fn strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1u64; shape.len()];
    for k in (0..shape.len().saturating_sub(1)).rev() {
        strides[k] = strides[k + 1].saturating_mul(shape[k + 1]);
    }
    strides
}

pub(crate) fn linear_offset(coord: &[u64], strides: &[u64]) -> u64 {
    coord
        .iter()
        .zip(strides)
        .fold(0, |acc: u64, (c, s)| acc.saturating_add(c.saturating_mul(*s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::ErrorKind;

    #[test]
    fn overflowing_dataset_shape_is_invalid_selection() {
        let shape = [1 << 33, 1 << 33];
        let err = RegionSelection::parse("0, 0", &shape).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSelection);
        let err = RegionSelection::hyperslab(&shape, None, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSelection);
    }

    #[test]
    fn count_saturates_instead_of_overflowing() {
        let sel = RegionSelection::all(&[1 << 33, 1 << 33]);
        assert_eq!(sel.count(), u64::MAX);
        assert_eq!(strides(&[4, 1 << 40, 1 << 40]), vec![u64::MAX, 1 << 40, 1]);
    }

    #[test]
    fn full_selection_of_matrix() {
        let sel = RegionSelection::parse("", &[2, 3]).unwrap();
        assert_eq!(sel.shape(), vec![2, 3]);
        assert_eq!(sel.count(), 6);
        assert_eq!(sel.offsets().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn row_major_order() {
        let sel = RegionSelection::parse("[0:2, 1:3]", &[3, 4]).unwrap();
        let coords: Vec<Vec<u64>> = sel.coordinates().collect();
        assert_eq!(
            coords,
            vec![vec![0, 1], vec![0, 2], vec![1, 1], vec![1, 2]]
        );
        assert_eq!(sel.offsets().collect::<Vec<_>>(), vec![1, 2, 5, 6]);
    }

    #[test]
    fn strided_slice() {
        let sel = RegionSelection::parse("1:8:3", &[10]).unwrap();
        assert_eq!(sel.offsets().collect::<Vec<_>>(), vec![1, 4, 7]);
        assert_eq!(sel.shape(), vec![3]);
    }

    #[test]
    fn point_drops_dimension() {
        let sel = RegionSelection::parse("[1, :]", &[3, 4]).unwrap();
        assert_eq!(sel.shape(), vec![4]);
        assert_eq!(sel.offsets().collect::<Vec<_>>(), vec![4, 5, 6, 7]);

        let sel = RegionSelection::parse("[1, 2]", &[3, 4]).unwrap();
        assert!(sel.shape().is_empty());
        assert_eq!(sel.count(), 1);
        assert_eq!(sel.offsets().collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn ellipsis_fills_remaining_dimensions() {
        let sel = RegionSelection::parse("[1, ...]", &[2, 2, 2]).unwrap();
        assert_eq!(sel.shape(), vec![2, 2]);
        assert_eq!(sel.offsets().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn rank_mismatch_is_invalid() {
        let err = RegionSelection::parse("[1]", &[2, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSelection);
        let err = RegionSelection::parse("[1, 1, 1]", &[2, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSelection);
    }

    #[test]
    fn stop_beyond_extent_is_out_of_bounds() {
        let err = RegionSelection::parse("0:11", &[10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        let err = RegionSelection::parse("10", &[10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        let err = RegionSelection::parse("5:3", &[10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn zero_step_is_invalid() {
        let err = RegionSelection::parse("0:4:0", &[4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStep);
    }

    #[test]
    fn bounds_use_current_not_max_shape() {
        let max = [MaxExtent::Unlimited];
        assert!(parse("0:5", &[5], &max).is_ok());
        assert_eq!(
            parse("0:6", &[5], &max).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
    }

    #[test]
    fn empty_slice_selects_nothing() {
        let sel = RegionSelection::parse("3:3", &[5]).unwrap();
        assert!(sel.is_empty());
        assert_eq!(sel.shape(), vec![0]);
        assert_eq!(sel.coordinates().count(), 0);
    }

    #[test]
    fn scalar_dataset_has_one_element() {
        let sel = RegionSelection::parse("", &[]).unwrap();
        assert_eq!(sel.count(), 1);
        assert_eq!(sel.offsets().collect::<Vec<_>>(), vec![0]);
        assert!(RegionSelection::parse("[]", &[]).is_ok());
        assert!(RegionSelection::parse("[0]", &[]).is_err());
    }

    #[test]
    fn hyperslab_arrays() {
        let sel =
            RegionSelection::hyperslab(&[4, 6], Some(&[1, 0]), Some(&[3, 6]), Some(&[1, 2]))
                .unwrap();
        assert_eq!(sel.shape(), vec![2, 3]);
        assert_eq!(
            sel.offsets().collect::<Vec<_>>(),
            vec![6, 8, 10, 12, 14, 16]
        );
        let all = RegionSelection::hyperslab(&[4, 6], None, None, None).unwrap();
        assert_eq!(all, RegionSelection::all(&[4, 6]));
    }

    #[test]
    fn hyperslab_rejects_bad_arrays() {
        assert_eq!(
            RegionSelection::hyperslab(&[4], Some(&[0, 0]), None, None)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidSelection
        );
        assert_eq!(
            RegionSelection::hyperslab(&[4], None, None, Some(&[0]))
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidStep
        );
        assert_eq!(
            RegionSelection::hyperslab(&[4], None, Some(&[5]), None)
                .unwrap_err()
                .kind(),
            ErrorKind::OutOfBounds
        );
    }

    #[test]
    fn check_shape_reports_mismatch() {
        let sel = RegionSelection::parse("[0:2, 1]", &[3, 3]).unwrap();
        sel.check_shape(&[2]).unwrap();
        assert_eq!(
            sel.check_shape(&[2, 1]).unwrap_err(),
            SelectError::ShapeMismatch {
                expected: vec![2],
                actual: vec![2, 1]
            }
        );
    }

    #[test]
    fn size_hint_is_exact() {
        let sel = RegionSelection::parse("[0:3, ::2]", &[3, 5]).unwrap();
        let mut it = sel.coordinates();
        assert_eq!(it.size_hint(), (9, Some(9)));
        it.next();
        assert_eq!(it.size_hint(), (8, Some(8)));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn dim_and_slice() -> impl Strategy<Value = (u64, u64, u64, u64)> {
            (1u64..20).prop_flat_map(|extent| {
                (0..=extent).prop_flat_map(move |start| {
                    (start..=extent, 1u64..6)
                        .prop_map(move |(stop, step)| (extent, start, stop, step))
                })
            })
        }

        proptest! {
            #[test]
            fn count_matches_formula((extent, start, stop, step) in dim_and_slice()) {
                let sel = RegionSelection::parse(&format!("{start}:{stop}:{step}"), &[extent]).unwrap();
                let expected = (start..stop).step_by(step as usize).count() as u64;
                prop_assert_eq!(sel.count(), expected);
                prop_assert_eq!(sel.coordinates().count() as u64, expected);
            }

            #[test]
            fn offsets_are_strictly_increasing(
                (e0, s0, t0, p0) in dim_and_slice(),
                (e1, s1, t1, p1) in dim_and_slice(),
            ) {
                let text = format!("[{s0}:{t0}:{p0}, {s1}:{t1}:{p1}]");
                let sel = RegionSelection::parse(&text, &[e0, e1]).unwrap();
                let offsets: Vec<u64> = sel.offsets().collect();
                for w in offsets.windows(2) {
                    prop_assert!(w[0] < w[1]);
                }
                for o in &offsets {
                    prop_assert!(*o < e0 * e1);
                }
            }

            #[test]
            fn stop_past_extent_always_fails(extent in 0u64..50, extra in 1u64..10) {
                let text = format!("0:{}", extent + extra);
                let err = RegionSelection::parse(&text, &[extent]).unwrap_err();
                prop_assert_eq!(err.kind(), ErrorKind::OutOfBounds);
            }
        }
    }
}
