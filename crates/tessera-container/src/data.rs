use tessera_select::{
    parse as parse_selection, plan_resize, PointSelection, RegionSelection, ResizeMode,
    SelectError,
};
use tessera_store::DatasetRecord;
use tessera_types::{dense_len, ObjectId, Scalar};
use tracing::debug;

use crate::container::Container;
use crate::error::{ContainerError, ContainerResult};
use crate::info::{ArrayData, DatasetSpec};

/// Validate `spec` and build a zero-filled dataset body.
pub(crate) fn dataset_record(spec: &DatasetSpec) -> ContainerResult<DatasetRecord> {
    if let Some(max_shape) = &spec.max_shape {
        if max_shape.len() != spec.shape.len() {
            return Err(SelectError::InvalidResize(format!(
                "maximum shape has rank {}, shape has rank {}",
                max_shape.len(),
                spec.shape.len()
            ))
            .into());
        }
        for (dim, (&extent, cap)) in spec.shape.iter().zip(max_shape).enumerate() {
            if !cap.admits(extent) {
                return Err(SelectError::InvalidResize(format!(
                    "dimension {dim}: extent {extent} exceeds maximum {cap}"
                ))
                .into());
            }
        }
    }
    Ok(DatasetRecord::new(
        spec.dtype,
        spec.shape.clone(),
        spec.max_shape.clone(),
    )?)
}

fn gather(
    dataset: &DatasetRecord,
    offsets: impl Iterator<Item = u64>,
    shape: Vec<u64>,
) -> ContainerResult<ArrayData> {
    let values = offsets
        .map(|offset| {
            dataset.data.get(offset as usize).cloned().ok_or_else(|| {
                ContainerError::Internal(format!("element {offset} missing from dataset storage"))
            })
        })
        .collect::<ContainerResult<Vec<Scalar>>>()?;
    Ok(ArrayData::new(shape, values))
}

/// Coerce every value first so a type error leaves the dataset untouched.
fn scatter(
    dataset: &mut DatasetRecord,
    offsets: impl Iterator<Item = u64>,
    values: &[Scalar],
) -> ContainerResult<()> {
    let offsets: Vec<u64> = offsets.collect();
    if offsets.len() != values.len() {
        return Err(SelectError::ShapeMismatch {
            expected: vec![offsets.len() as u64],
            actual: vec![values.len() as u64],
        }
        .into());
    }
    let coerced = values
        .iter()
        .map(|v| dataset.dtype.coerce(v))
        .collect::<Result<Vec<_>, _>>()?;

    for (offset, value) in offsets.into_iter().zip(coerced) {
        let slot = dataset.data.get_mut(offset as usize).ok_or_else(|| {
            ContainerError::Internal(format!("element {offset} missing from dataset storage"))
        })?;
        *slot = value;
    }
    Ok(())
}

impl Container {
    // -----------------------------------------------------------------------
    // Region I/O
    // -----------------------------------------------------------------------

    /// Read the region named by `selection`, e.g. `"0:2, ::3"`.
    ///
    /// An empty selection reads the whole dataset. Dimensions selected by a
    /// single index are absent from the returned shape.
    pub fn read(&self, id: ObjectId, selection: &str) -> ContainerResult<ArrayData> {
        self.query(|s| {
            let (_, record) = s.record(id)?;
            let dataset = record.as_dataset().ok_or(ContainerError::NotADataset(id))?;
            let region = parse_selection(selection, &dataset.shape, &dataset.max_shape)?;
            gather(dataset, region.offsets(), region.shape())
        })
    }

    /// Write `data` into the region named by `selection`.
    ///
    /// `data.shape` must equal the selection's shape; values are converted to
    /// the dataset's element type.
    pub fn write(&self, id: ObjectId, selection: &str, data: &ArrayData) -> ContainerResult<()> {
        self.mutate(|s| {
            let (address, mut record) = s.record(id)?;
            let dataset = record
                .as_dataset_mut()
                .ok_or(ContainerError::NotADataset(id))?;
            let region = parse_selection(selection, &dataset.shape, &dataset.max_shape)?;
            region.check_shape(&data.shape)?;
            scatter(dataset, region.offsets(), &data.values)?;
            record.touch();
            s.store.write(address, &record)?;
            debug!(id = %id, selection, count = data.len(), "wrote region");
            Ok(())
        })
    }

    /// Read a hyperslab given as per-dimension `start`/`stop`/`step` arrays.
    pub fn read_hyperslab(
        &self,
        id: ObjectId,
        start: Option<&[u64]>,
        stop: Option<&[u64]>,
        step: Option<&[u64]>,
    ) -> ContainerResult<ArrayData> {
        self.query(|s| {
            let (_, record) = s.record(id)?;
            let dataset = record.as_dataset().ok_or(ContainerError::NotADataset(id))?;
            let region = RegionSelection::hyperslab(&dataset.shape, start, stop, step)?;
            gather(dataset, region.offsets(), region.shape())
        })
    }

    pub fn write_hyperslab(
        &self,
        id: ObjectId,
        start: Option<&[u64]>,
        stop: Option<&[u64]>,
        step: Option<&[u64]>,
        data: &ArrayData,
    ) -> ContainerResult<()> {
        self.mutate(|s| {
            let (address, mut record) = s.record(id)?;
            let dataset = record
                .as_dataset_mut()
                .ok_or(ContainerError::NotADataset(id))?;
            let region = RegionSelection::hyperslab(&dataset.shape, start, stop, step)?;
            region.check_shape(&data.shape)?;
            scatter(dataset, region.offsets(), &data.values)?;
            record.touch();
            s.store.write(address, &record)?;
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Point I/O
    // -----------------------------------------------------------------------

    /// Read scattered elements. The result is one-dimensional, in point order.
    pub fn read_points(&self, id: ObjectId, points: Vec<Vec<u64>>) -> ContainerResult<ArrayData> {
        self.query(|s| {
            let (_, record) = s.record(id)?;
            let dataset = record.as_dataset().ok_or(ContainerError::NotADataset(id))?;
            let selection = PointSelection::new(points, &dataset.shape)?;
            gather(dataset, selection.offsets(), selection.shape())
        })
    }

    /// Write one value per point.
    pub fn write_points(
        &self,
        id: ObjectId,
        points: Vec<Vec<u64>>,
        values: &[Scalar],
    ) -> ContainerResult<()> {
        self.mutate(|s| {
            let (address, mut record) = s.record(id)?;
            let dataset = record
                .as_dataset_mut()
                .ok_or(ContainerError::NotADataset(id))?;
            let selection = PointSelection::new(points, &dataset.shape)?;
            scatter(dataset, selection.offsets(), values)?;
            record.touch();
            s.store.write(address, &record)?;
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Resize
    // -----------------------------------------------------------------------

    /// Change a dataset's shape within its maximum shape.
    ///
    /// Existing elements keep their coordinates; new elements hold the
    /// element type's zero value. Shapes over `MAX_ELEMENTS` elements fail
    /// with `InvalidResize` before the container is locked.
    pub fn extend(&self, id: ObjectId, new_shape: &[u64], mode: ResizeMode) -> ContainerResult<()> {
        dense_len(new_shape)?;
        self.mutate(|s| {
            let (address, mut record) = s.record(id)?;
            let dataset = record
                .as_dataset_mut()
                .ok_or(ContainerError::NotADataset(id))?;
            let plan = plan_resize(&dataset.shape, &dataset.max_shape, new_shape, mode)?;
            if plan.is_noop() {
                return Ok(());
            }
            dataset.data = plan.apply(&dataset.data, &dataset.dtype.zero());
            debug!(id = %id, from = ?plan.old_shape, to = ?plan.new_shape, "resized dataset");
            dataset.shape = plan.new_shape;
            record.touch();
            s.store.write(address, &record)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{ElementType, ErrorKind, MaxExtent, MAX_ELEMENTS};

    fn make_dataset(spec: DatasetSpec) -> (Container, ObjectId) {
        let c = Container::in_memory().unwrap();
        let id = c.create_dataset(c.root_id().unwrap(), "d", &spec).unwrap();
        (c, id)
    }

    fn ints(values: &[i64]) -> Vec<Scalar> {
        values.iter().map(|&v| Scalar::Int(v)).collect()
    }

    #[test]
    fn new_dataset_reads_zeroes() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::Int32, vec![2, 3]));
        let all = c.read(d, "").unwrap();
        assert_eq!(all.shape, vec![2, 3]);
        assert_eq!(all.values, ints(&[0; 6]));
    }

    #[test]
    fn write_then_read_strided_region() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::Int64, vec![10]));
        c.write(d, "1:9:3", &ArrayData::vector(ints(&[7, 8, 9])))
            .unwrap();
        assert_eq!(c.read(d, "1:9:3").unwrap().values, ints(&[7, 8, 9]));
        assert_eq!(
            c.read(d, "").unwrap().values,
            ints(&[0, 7, 0, 0, 8, 0, 0, 9, 0, 0])
        );
    }

    #[test]
    fn point_index_reduces_rank() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::Int32, vec![3, 4]));
        c.write(d, "1, :", &ArrayData::vector(ints(&[1, 2, 3, 4])))
            .unwrap();
        let row = c.read(d, "[1, :]").unwrap();
        assert_eq!(row.shape, vec![4]);
        assert_eq!(row.values, ints(&[1, 2, 3, 4]));
        let col = c.read(d, "0:3, 2").unwrap();
        assert_eq!(col.values, ints(&[0, 3, 0]));
    }

    #[test]
    fn write_with_wrong_shape_fails() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::Int32, vec![4]));
        let err = c
            .write(d, "0:2", &ArrayData::vector(ints(&[1, 2, 3])))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        assert_eq!(c.read(d, "").unwrap().values, ints(&[0; 4]));
    }

    #[test]
    fn write_checks_element_type() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::UInt8, vec![2]));
        let err = c
            .write(d, "", &ArrayData::vector(ints(&[1, 300])))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(c.read(d, "").unwrap().values, vec![Scalar::UInt(0); 2]);
    }

    #[test]
    fn out_of_bounds_and_zero_step() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::Float64, vec![4]));
        assert_eq!(c.read(d, "0:5").unwrap_err().kind(), ErrorKind::OutOfBounds);
        assert_eq!(c.read(d, "0:4:0").unwrap_err().kind(), ErrorKind::InvalidStep);
        assert_eq!(c.read(d, "0, 0").unwrap_err().kind(), ErrorKind::InvalidSelection);
    }

    #[test]
    fn read_on_group_is_type_mismatch() {
        let c = Container::in_memory().unwrap();
        let root = c.root_id().unwrap();
        let err = c.read(root, "").unwrap_err();
        assert!(matches!(err, ContainerError::NotADataset(id) if id == root));
    }

    #[test]
    fn scalar_dataset_roundtrip() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::Text, vec![]));
        c.write(d, "", &ArrayData::scalar("hello")).unwrap();
        let back = c.read(d, "").unwrap();
        assert!(back.shape.is_empty());
        assert_eq!(back.values, vec![Scalar::from("hello")]);
    }

    #[test]
    fn hyperslab_arrays() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::Int32, vec![4, 4]));
        let data = ArrayData::new(vec![2, 2], ints(&[1, 2, 3, 4]));
        c.write_hyperslab(d, Some(&[0, 1]), Some(&[4, 3]), Some(&[2, 1]), &data)
            .unwrap();
        assert_eq!(c.read(d, "0:4:2, 1:3").unwrap().values, ints(&[1, 2, 3, 4]));
        let back = c
            .read_hyperslab(d, Some(&[0, 1]), Some(&[4, 3]), Some(&[2, 1]))
            .unwrap();
        assert_eq!(back, data);
        assert_eq!(
            c.read_hyperslab(d, Some(&[0]), None, None)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidSelection
        );
    }

    #[test]
    fn points_roundtrip() {
        let (c, d) = make_dataset(DatasetSpec::new(ElementType::Int32, vec![3, 3]));
        let points = vec![vec![2, 2], vec![0, 1], vec![1, 0]];
        c.write_points(d, points.clone(), &ints(&[9, 8, 7])).unwrap();
        let back = c.read_points(d, points).unwrap();
        assert_eq!(back.shape, vec![3]);
        assert_eq!(back.values, ints(&[9, 8, 7]));
        assert_eq!(
            c.read(d, "").unwrap().values,
            ints(&[0, 8, 0, 7, 0, 0, 0, 0, 9])
        );
        assert_eq!(
            c.read_points(d, vec![vec![3, 0]]).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
    }

    #[test]
    fn extend_to_overflowing_shape_fails_cleanly() {
        let spec = DatasetSpec::new(ElementType::Int8, vec![1, 1])
            .with_max_shape(vec![MaxExtent::Unlimited, MaxExtent::Unlimited]);
        let (c, d) = make_dataset(spec);

        for shape in [[1u64 << 33, 1 << 33], [1 << 32, 1 << 20]] {
            let err = c.extend(d, &shape, ResizeMode::GrowOnly).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidResize);
        }
        // The container stays usable and the dataset unchanged.
        assert!(c.root_id().is_ok());
        assert_eq!(c.object_info(d).unwrap().shape, Some(vec![1, 1]));
        c.extend(d, &[2, 3], ResizeMode::GrowOnly).unwrap();
        assert_eq!(c.read(d, "").unwrap().values.len(), 6);
    }

    #[test]
    fn create_oversized_dataset_fails() {
        let c = Container::in_memory().unwrap();
        let root = c.root_id().unwrap();
        let huge = DatasetSpec::new(ElementType::Float64, vec![1 << 33, 1 << 33]);
        assert_eq!(
            c.create_dataset(root, "huge", &huge).unwrap_err().kind(),
            ErrorKind::InvalidResize
        );
        let wide = DatasetSpec::new(ElementType::Float64, vec![MAX_ELEMENTS + 1]);
        assert_eq!(
            c.create_anonymous_dataset(&wide).unwrap_err().kind(),
            ErrorKind::InvalidResize
        );
        assert_eq!(c.counts().unwrap().datasets, 0);
        assert!(c.list_links(root, &crate::LinkQuery::all()).unwrap().is_empty());
    }

    #[test]
    fn extend_preserves_existing_rows() {
        let spec = DatasetSpec::new(ElementType::Int32, vec![1, 8])
            .with_max_shape(vec![MaxExtent::Unlimited, MaxExtent::Fixed(8)]);
        let (c, d) = make_dataset(spec);
        let row: Vec<i64> = (1..=8).collect();
        c.write(d, "0, :", &ArrayData::vector(ints(&row))).unwrap();

        c.extend(d, &[5, 8], ResizeMode::GrowOnly).unwrap();
        let info = c.object_info(d).unwrap();
        assert_eq!(info.shape, Some(vec![5, 8]));
        assert_eq!(c.read(d, "0, :").unwrap().values, ints(&row));
        assert_eq!(c.read(d, "4, :").unwrap().values, ints(&[0; 8]));

        let err = c.extend(d, &[5, 9], ResizeMode::GrowOnly).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResize);
    }

    #[test]
    fn shrink_requires_truncate_mode() {
        let spec = DatasetSpec::new(ElementType::Int32, vec![4])
            .with_max_shape(vec![MaxExtent::Fixed(4)]);
        let (c, d) = make_dataset(spec);
        c.write(d, "", &ArrayData::vector(ints(&[1, 2, 3, 4]))).unwrap();
        assert_eq!(
            c.extend(d, &[2], ResizeMode::GrowOnly).unwrap_err().kind(),
            ErrorKind::InvalidResize
        );
        c.extend(d, &[2], ResizeMode::AllowTruncate).unwrap();
        assert_eq!(c.read(d, "").unwrap().values, ints(&[1, 2]));
    }

    #[test]
    fn create_rejects_shape_beyond_max() {
        let c = Container::in_memory().unwrap();
        let root = c.root_id().unwrap();
        let spec = DatasetSpec::new(ElementType::Int8, vec![5])
            .with_max_shape(vec![MaxExtent::Fixed(4)]);
        assert_eq!(
            c.create_dataset(root, "d", &spec).unwrap_err().kind(),
            ErrorKind::InvalidResize
        );
        let spec = DatasetSpec::new(ElementType::Int8, vec![5]).with_max_shape(vec![]);
        assert_eq!(
            c.create_dataset(root, "d", &spec).unwrap_err().kind(),
            ErrorKind::InvalidResize
        );
    }
}
