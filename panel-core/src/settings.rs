//! Last-known authoritative settings snapshot plus pending local edits.
//!
//! The server owns the configuration; this store is a read-through cache in
//! display units. It is only ever overwritten wholesale (on fetch) or edited
//! per key (on an operator change), never merged field by field, so values
//! from different points in time cannot mix.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::PanelError;
use crate::schema::{ParamValue, ParameterKey, SchemaRegistry};

/// Snapshot of camera settings, keyed by logical parameter.
pub type CameraSettings = BTreeMap<ParameterKey, ParamValue>;

/// Shared mutable settings state.
///
/// Every write carries the sequence number of the operation that produced
/// it; a write with a sequence older than the newest one applied is stale
/// (its response lost the race to a later operation) and is dropped.
#[derive(Debug)]
pub struct SettingsStore {
    registry: Arc<SchemaRegistry>,
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    settings: CameraSettings,
    revision: u64,
    latest_seq: u64,
}

impl SettingsStore {
    pub fn new(registry: Arc<SchemaRegistry>) -> SettingsStore {
        SettingsStore {
            registry,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Atomically swap in a freshly fetched snapshot.
    ///
    /// Returns `false` (and leaves the store untouched) when `seq` is older
    /// than the newest write already applied.
    pub fn replace_all(&self, settings: CameraSettings, seq: u64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if seq < inner.latest_seq {
            tracing::debug!(
                seq,
                latest = inner.latest_seq,
                "dropping stale snapshot"
            );
            return false;
        }
        inner.settings = settings;
        inner.latest_seq = seq;
        inner.revision += 1;
        true
    }

    /// Optimistic per-key edit, applied before server confirmation.
    pub fn set_local(
        &self,
        key: ParameterKey,
        value: ParamValue,
        seq: u64,
    ) -> Result<(), PanelError> {
        if self.registry.spec_for(key).is_none() {
            return Err(PanelError::UnknownParameter(key.wire_name().to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        inner.settings.insert(key, value);
        inner.latest_seq = inner.latest_seq.max(seq);
        inner.revision += 1;
        Ok(())
    }

    /// The current snapshot, in display units.
    pub fn current(&self) -> CameraSettings {
        self.inner.lock().unwrap().settings.clone()
    }

    pub fn get(&self, key: ParameterKey) -> Option<ParamValue> {
        self.inner.lock().unwrap().settings.get(&key).copied()
    }

    /// Change counter, bumped on every applied write.
    pub fn revision(&self) -> u64 {
        self.inner.lock().unwrap().revision
    }

    /// Drop the cached snapshot on teardown.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.settings.clear();
        inner.revision += 1;
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }
}
