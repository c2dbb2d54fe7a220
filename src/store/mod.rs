// Facility state store

use crate::error::ParseError;
use crate::record::{FacilityId, FacilityState, Record};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;


/// Latest observed record for every facility ever seen.
///
/// Writes come only from the poll cycle; reads may come from anywhere and
/// always get owned copies. Entries are never removed.
pub struct StateStore {
    /// Lock-free concurrent map for fast reads
    records: DashMap<FacilityId, Record>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Owned copy of every stored record, ordered by id
    pub fn snapshot(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Insert or replace the record for `id`
    pub fn apply(&self, id: FacilityId, record: Record) {
        self.records.insert(id, record);
    }

    /// Get record by id
    pub fn get(&self, id: FacilityId) -> Option<Record> {
        self.records.get(&id).map(|r| r.clone())
    }

    /// Stored state for `id`, without cloning the record
    pub fn state_of(&self, id: FacilityId) -> Option<FacilityState> {
        self.records.get(&id).map(|r| r.state)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace the whole store from its serialized form.
    ///
    /// Input is fully parsed before anything is touched, so malformed bytes
    /// leave the current contents intact.
    pub fn load(&self, bytes: &[u8]) -> Result<(), ParseError> {
        let parsed: BTreeMap<FacilityId, Record> =
            serde_json::from_slice(bytes).map_err(ParseError::snapshot)?;

        self.records.clear();
        for record in parsed.into_values() {
            self.records.insert(record.id, record);
        }

        info!(facilities = self.records.len(), "Loaded state");
        Ok(())
    }

    /// Tab-indented JSON object keyed by id, in ascending id order
    pub fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        let ordered: BTreeMap<FacilityId, Record> = self
            .records
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        ordered.serialize(&mut serializer)?;
        Ok(buf)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
