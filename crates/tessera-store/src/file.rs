use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tessera_types::Address;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::image::ContainerImage;
use crate::memory::InMemoryContainerStore;
use crate::record::ObjectRecord;
use crate::traits::ContainerStore;

/// File magic.
const MAGIC: &[u8; 4] = b"TSRA";

/// Current snapshot format version.
pub const FORMAT_VERSION: u32 = 1;

/// Header size: 4 bytes magic + 4 bytes version + 8 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 20;

/// Durability strategy for snapshot writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` the snapshot before it replaces the previous one.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering.
    OsDefault,
}

/// Container store persisted as a single snapshot file.
///
/// On-disk format:
/// ```text
/// [4 bytes: magic "TSRA"]
/// [4 bytes: format version (little-endian u32)]
/// [8 bytes: payload length (little-endian u64)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized ContainerImage)]
/// ```
///
/// Reads and writes go to an in-memory working copy. `flush()` writes the
/// whole image to a temporary file in the same directory and renames it over
/// the snapshot, so a crash leaves either the old or the new state.
pub struct FileContainerStore {
    path: PathBuf,
    memory: InMemoryContainerStore,
    sync_mode: SyncMode,
}

impl FileContainerStore {
    /// Create a new, empty container file. Fails if `path` already exists.
    pub fn create(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let store = Self {
            path: path.to_path_buf(),
            memory: InMemoryContainerStore::working_copy(ContainerImage::new()),
            sync_mode,
        };
        store.flush()?;
        debug!(path = %path.display(), "created container file");
        Ok(store)
    }

    /// Open an existing container file for reading and writing.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        let image = load_image(path)?;
        debug!(
            path = %path.display(),
            objects = image.objects.len(),
            "opened container file"
        );
        Ok(Self {
            path: path.to_path_buf(),
            memory: InMemoryContainerStore::working_copy(image),
            sync_mode,
        })
    }

    /// Open `path` if it exists, otherwise create it.
    pub fn open_or_create(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if path.exists() {
            Self::open(path, sync_mode)
        } else {
            Self::create(path, sync_mode)
        }
    }

    /// Open an existing container file; every mutation fails with
    /// [`StoreError::ReadOnly`].
    pub fn open_read_only(path: &Path) -> StoreResult<Self> {
        let image = load_image(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            memory: InMemoryContainerStore::read_only(image),
            sync_mode: SyncMode::OsDefault,
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    fn persist(&self) -> StoreResult<()> {
        let bytes = encode_image(&self.memory.snapshot())?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        if self.sync_mode == SyncMode::EveryWrite {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "flushed container snapshot");
        Ok(())
    }
}

impl ContainerStore for FileContainerStore {
    fn root(&self) -> StoreResult<Option<Address>> {
        self.memory.root()
    }

    fn set_root(&self, address: Address) -> StoreResult<()> {
        self.memory.set_root(address)
    }

    fn allocate(&self) -> StoreResult<Address> {
        self.memory.allocate()
    }

    fn read(&self, address: Address) -> StoreResult<Option<ObjectRecord>> {
        self.memory.read(address)
    }

    fn write(&self, address: Address, record: &ObjectRecord) -> StoreResult<()> {
        self.memory.write(address, record)
    }

    fn delete(&self, address: Address) -> StoreResult<bool> {
        self.memory.delete(address)
    }

    fn addresses(&self) -> StoreResult<Vec<Address>> {
        self.memory.addresses()
    }

    fn read_reserved(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.memory.read_reserved(key)
    }

    fn write_reserved(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.memory.write_reserved(key, value)
    }

    fn delete_reserved(&self, key: &str) -> StoreResult<bool> {
        self.memory.delete_reserved(key)
    }

    fn reserved_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.memory.reserved_keys(prefix)
    }

    fn flush(&self) -> StoreResult<()> {
        // A read-only working copy never diverges from disk.
        if self.memory.is_read_only() {
            return Ok(());
        }
        self.persist()
    }

    fn revert(&self) -> StoreResult<()> {
        let image = load_image(&self.path)?;
        self.memory.replace(image);
        warn!(path = %self.path.display(), "discarded unflushed container changes");
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.memory.is_read_only()
    }
}

impl std::fmt::Debug for FileContainerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileContainerStore")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .field("read_only", &self.memory.is_read_only())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

fn encode_image(image: &ContainerImage) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(image).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

fn decode_image(path: &Path, bytes: &[u8]) -> StoreResult<ContainerImage> {
    let corrupt = |reason: &str| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if bytes.len() < HEADER_SIZE {
        return Err(corrupt("truncated header"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(corrupt("bad magic"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }

    let mut len_buf = [0u8; 8];
    len_buf.copy_from_slice(&bytes[8..16]);
    let length = u64::from_le_bytes(len_buf);
    let stored_crc = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() as u64 != length {
        warn!(
            path = %path.display(),
            expected = length,
            actual = payload.len(),
            "container payload length mismatch"
        );
        return Err(corrupt("payload length mismatch"));
    }

    let computed_crc = crc32fast::hash(payload);
    if computed_crc != stored_crc {
        warn!(
            path = %path.display(),
            stored_crc,
            computed_crc,
            "container CRC mismatch"
        );
        return Err(corrupt("CRC mismatch"));
    }

    bincode::deserialize(payload).map_err(|e| corrupt(&e.to_string()))
}

fn load_image(path: &Path) -> StoreResult<ContainerImage> {
    let bytes = fs::read(path)?;
    decode_image(path, &bytes)
}
