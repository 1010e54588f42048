use tessera_types::{AttributeValue, ObjectId};
use tracing::debug;

use crate::container::Container;
use crate::error::{ContainerError, ContainerResult};

fn validate_attribute_name(name: &str) -> ContainerResult<()> {
    if name.is_empty() {
        return Err(ContainerError::InvalidName {
            name: name.to_string(),
            reason: "attribute names must not be empty".into(),
        });
    }
    Ok(())
}

impl Container {
    /// Create or replace the attribute `name` on any object.
    ///
    /// A replaced attribute keeps its position in listings.
    pub fn set_attribute(
        &self,
        id: ObjectId,
        name: &str,
        value: AttributeValue,
    ) -> ContainerResult<()> {
        validate_attribute_name(name)?;
        let value = AttributeValue::array(value.dtype, value.shape, value.values)?;
        self.mutate(|s| {
            let (address, mut record) = s.record(id)?;
            record.attributes.insert(name.to_string(), value);
            record.touch();
            s.store.write(address, &record)?;
            debug!(id = %id, attribute = name, "set attribute");
            Ok(())
        })
    }

    pub fn get_attribute(&self, id: ObjectId, name: &str) -> ContainerResult<AttributeValue> {
        self.query(|s| {
            let (_, record) = s.record(id)?;
            record
                .attributes
                .get(name)
                .cloned()
                .ok_or_else(|| ContainerError::NotFound(format!("attribute {name:?} of {id}")))
        })
    }

    pub fn delete_attribute(&self, id: ObjectId, name: &str) -> ContainerResult<()> {
        self.mutate(|s| {
            let (address, mut record) = s.record(id)?;
            record
                .attributes
                .shift_remove(name)
                .ok_or_else(|| ContainerError::NotFound(format!("attribute {name:?} of {id}")))?;
            record.touch();
            s.store.write(address, &record)?;
            Ok(())
        })
    }

    /// Attributes in creation order, starting after `marker` and capped at `limit`.
    pub fn list_attributes(
        &self,
        id: ObjectId,
        marker: Option<&str>,
        limit: Option<usize>,
    ) -> ContainerResult<Vec<(String, AttributeValue)>> {
        self.query(|s| {
            let (_, record) = s.record(id)?;
            let start = match marker {
                Some(marker) => record
                    .attributes
                    .get_index_of(marker)
                    .map(|i| i + 1)
                    .ok_or_else(|| {
                        ContainerError::NotFound(format!("attribute marker {marker:?}"))
                    })?,
                None => 0,
            };
            Ok(record
                .attributes
                .iter()
                .skip(start)
                .take(limit.unwrap_or(usize::MAX))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect())
        })
    }
}
