use std::sync::Arc;

use govwire_core::{Fingerprint, NewRecord};
use govwire_storage::{InsertOutcome, RecordStore, StoreError};

pub use govwire_core::{fingerprint, normalize_title};

/// Fingerprint gate in front of the record store.
#[derive(Clone)]
pub struct Deduplicator {
    store: Arc<dyn RecordStore>,
}

/// What happened to one candidate after deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Stored(i64),
    Duplicate,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// True when an active record already carries `fingerprint`.
    pub async fn exists(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        self.store.find_active_by_fingerprint(fingerprint).await
    }

    /// Check, then insert. A unique-index collision on insert (a racing writer
    /// or an inactive record with the same fingerprint) also counts as a duplicate.
    pub async fn admit(&self, record: &NewRecord) -> Result<Admission, StoreError> {
        if self.exists(&record.fingerprint).await? {
            return Ok(Admission::Duplicate);
        }
        match self.store.insert(record).await? {
            InsertOutcome {
                id: Some(id),
                duplicate: false,
            } => Ok(Admission::Stored(id)),
            _ => Ok(Admission::Duplicate),
        }
    }
}
