use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_types::Address;

use crate::record::ObjectRecord;

/// Complete contents of a container, as held in memory and persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerImage {
    pub root: Option<Address>,
    /// Next address `allocate()` will hand out.
    pub next_address: u64,
    pub objects: BTreeMap<Address, ObjectRecord>,
    pub reserved: BTreeMap<String, Vec<u8>>,
}

impl ContainerImage {
    pub fn new() -> Self {
        Self {
            // Address 0 is never handed out.
            next_address: 1,
            ..Self::default()
        }
    }

    pub fn allocate(&mut self) -> Address {
        let address = Address::new(self.next_address);
        self.next_address += 1;
        address
    }

    pub fn reserved_keys(&self, prefix: &str) -> Vec<String> {
        self.reserved
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}
