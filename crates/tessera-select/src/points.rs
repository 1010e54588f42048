use crate::error::{SelectError, SelectResult};
use crate::region::{check_addressable, linear_offset, strides};

/// An explicit list of element coordinates, for scattered reads and writes.
///
/// Points keep the order they were given in; duplicates are allowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointSelection {
    points: Vec<Vec<u64>>,
    dataset_shape: Vec<u64>,
}

impl PointSelection {
    /// Bind `points` to the current `shape`.
    ///
    /// Every point must have the dataset's rank and lie inside its extent.
    pub fn new(points: Vec<Vec<u64>>, shape: &[u64]) -> SelectResult<Self> {
        check_addressable(shape)?;
        let rank = shape.len();
        if rank == 0 {
            return Err(SelectError::InvalidSelection(
                "point selection on a scalar dataset".into(),
            ));
        }
        for (n, point) in points.iter().enumerate() {
            if point.len() != rank {
                return Err(SelectError::InvalidSelection(format!(
                    "point {n} has {} coordinates, dataset has rank {rank}",
                    point.len()
                )));
            }
            for (dim, (&c, &extent)) in point.iter().zip(shape).enumerate() {
                if c >= extent {
                    return Err(SelectError::OutOfBounds {
                        dim,
                        reason: format!("point {n} coordinate {c} is not below extent {extent}"),
                    });
                }
            }
        }
        Ok(Self {
            points,
            dataset_shape: shape.to_vec(),
        })
    }

    /// One-dimensional convenience: each index is a point.
    pub fn from_indices(indices: &[u64], shape: &[u64]) -> SelectResult<Self> {
        Self::new(indices.iter().map(|&i| vec![i]).collect(), shape)
    }

    pub fn points(&self) -> &[Vec<u64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shape of the selected values: one dimension, one entry per point.
    pub fn shape(&self) -> Vec<u64> {
        vec![self.points.len() as u64]
    }

    /// Row-major linear offsets into the dataset, in point order.
    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        let strides = strides(&self.dataset_shape);
        self.points
            .iter()
            .map(move |p| linear_offset(p, &strides))
    }
}
