use std::sync::RwLock;

use tessera_types::Address;

use crate::error::{StoreError, StoreResult};
use crate::image::ContainerImage;
use crate::record::ObjectRecord;
use crate::traits::ContainerStore;

/// In-memory container store.
///
/// Intended for tests and embedding, and used by [`FileContainerStore`] as its
/// working copy. The whole image lives behind a `RwLock`; records are cloned
/// on read and write.
///
/// A standalone store keeps a checkpoint of the image as of the last
/// `flush()` so that `revert()` can discard a failed batch of mutations.
/// The working copy inside a file store has no checkpoint: the file itself
/// is the durable state.
///
/// [`FileContainerStore`]: crate::FileContainerStore
pub struct InMemoryContainerStore {
    image: RwLock<ContainerImage>,
    checkpoint: Option<RwLock<ContainerImage>>,
    read_only: bool,
}

impl InMemoryContainerStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::from_image(ContainerImage::new())
    }

    /// Wrap an existing image.
    pub fn from_image(image: ContainerImage) -> Self {
        Self {
            checkpoint: Some(RwLock::new(image.clone())),
            image: RwLock::new(image),
            read_only: false,
        }
    }

    /// Wrap an existing image; every mutation fails with [`StoreError::ReadOnly`].
    pub fn read_only(image: ContainerImage) -> Self {
        Self {
            image: RwLock::new(image),
            checkpoint: None,
            read_only: true,
        }
    }

    /// A writable image without a checkpoint, for backends that own durability.
    pub(crate) fn working_copy(image: ContainerImage) -> Self {
        Self {
            image: RwLock::new(image),
            checkpoint: None,
            read_only: false,
        }
    }

    /// Clone the current image.
    pub fn snapshot(&self) -> ContainerImage {
        self.image.read().expect("lock poisoned").clone()
    }

    /// Replace the current image wholesale.
    pub fn replace(&self, image: ContainerImage) {
        *self.image.write().expect("lock poisoned") = image;
    }

    /// Number of object records.
    pub fn len(&self) -> usize {
        self.image.read().expect("lock poisoned").objects.len()
    }

    /// Returns `true` if no object records exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryContainerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerStore for InMemoryContainerStore {
    fn root(&self) -> StoreResult<Option<Address>> {
        Ok(self.image.read().expect("lock poisoned").root)
    }

    fn set_root(&self, address: Address) -> StoreResult<()> {
        self.check_writable()?;
        self.image.write().expect("lock poisoned").root = Some(address);
        Ok(())
    }

    fn allocate(&self) -> StoreResult<Address> {
        self.check_writable()?;
        Ok(self.image.write().expect("lock poisoned").allocate())
    }

    fn read(&self, address: Address) -> StoreResult<Option<ObjectRecord>> {
        let image = self.image.read().expect("lock poisoned");
        Ok(image.objects.get(&address).cloned())
    }

    fn write(&self, address: Address, record: &ObjectRecord) -> StoreResult<()> {
        self.check_writable()?;
        let mut image = self.image.write().expect("lock poisoned");
        image.objects.insert(address, record.clone());
        Ok(())
    }

    fn delete(&self, address: Address) -> StoreResult<bool> {
        self.check_writable()?;
        let mut image = self.image.write().expect("lock poisoned");
        Ok(image.objects.remove(&address).is_some())
    }

    fn addresses(&self) -> StoreResult<Vec<Address>> {
        let image = self.image.read().expect("lock poisoned");
        Ok(image.objects.keys().copied().collect())
    }

    fn read_reserved(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let image = self.image.read().expect("lock poisoned");
        Ok(image.reserved.get(key).cloned())
    }

    fn write_reserved(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.check_writable()?;
        let mut image = self.image.write().expect("lock poisoned");
        image.reserved.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete_reserved(&self, key: &str) -> StoreResult<bool> {
        self.check_writable()?;
        let mut image = self.image.write().expect("lock poisoned");
        Ok(image.reserved.remove(key).is_some())
    }

    fn reserved_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self.image.read().expect("lock poisoned").reserved_keys(prefix))
    }

    fn flush(&self) -> StoreResult<()> {
        if let Some(checkpoint) = &self.checkpoint {
            *checkpoint.write().expect("lock poisoned") = self.snapshot();
        }
        Ok(())
    }

    fn revert(&self) -> StoreResult<()> {
        if let Some(checkpoint) = &self.checkpoint {
            let image = checkpoint.read().expect("lock poisoned").clone();
            self.replace(image);
        }
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl std::fmt::Debug for InMemoryContainerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContainerStore")
            .field("object_count", &self.len())
            .field("read_only", &self.read_only)
            .finish()
    }
}
