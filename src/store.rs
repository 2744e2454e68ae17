use serde_json::Value;
use tracing::info;

use crate::schema::{IdentityKeys, Record};

/// What a [`RecordStore::put`] did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// A stored record already carried every one of its fields with equal values.
    Unchanged,
    /// The record at `index` shared the identity fields and was overwritten.
    Replaced { index: usize },
    /// No stored record matched; the record was pushed to the end.
    Appended { index: usize },
}

impl PutOutcome {
    #[must_use]
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Ordered, in-memory record list with identity-keyed upsert.
#[derive(Debug, Clone)]
pub struct RecordStore {
    identity_keys: IdentityKeys,
    records: Vec<Record>,
    dirty: bool,
}

impl RecordStore {
    #[must_use]
    pub fn new(identity_keys: IdentityKeys) -> Self {
        Self::with_records(identity_keys, Vec::new())
    }

    /// Wrap an already decoded list. The store starts clean.
    #[must_use]
    pub fn with_records(identity_keys: IdentityKeys, records: Vec<Record>) -> Self {
        Self {
            identity_keys,
            records,
            dirty: false,
        }
    }

    #[must_use]
    pub fn identity_keys(&self) -> &IdentityKeys {
        &self.identity_keys
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Insert or update `record`.
    ///
    /// Scanning in list order, only the fields of the stored record are
    /// consulted. A stored record whose fields all appear in `record` with
    /// equal values makes the put a no-op. Otherwise the first stored record
    /// whose identity fields all appear in `record` with equal values is
    /// replaced wholesale. Failing both, `record` is appended.
    ///
    /// A stored record without any identity field matches every incoming
    /// record, and identity fields present only on `record` never prevent a
    /// match.
    pub fn put(&mut self, record: Record) -> PutOutcome {
        let mut matched = None;
        for (index, current) in self.records.iter().enumerate() {
            let mut identity_match = true;
            let mut full_equal = true;
            for (key, value) in current {
                let value_matches = field_equals(&record, key, value);
                if self.identity_keys.contains(key) {
                    identity_match &= value_matches;
                }
                full_equal &= value_matches;
            }
            if full_equal {
                return PutOutcome::Unchanged;
            }
            if identity_match {
                matched = Some(index);
                break;
            }
        }

        self.dirty = true;
        match matched {
            Some(index) => {
                let previous = Value::Object(std::mem::replace(&mut self.records[index], record));
                let current = Value::Object(self.records[index].clone());
                info!(index, %previous, %current, "replacing record");
                PutOutcome::Replaced { index }
            }
            None => {
                self.records.push(record);
                PutOutcome::Appended {
                    index: self.records.len() - 1,
                }
            }
        }
    }
}

fn field_equals(record: &Record, key: &str, value: &Value) -> bool {
    record.get(key).is_some_and(|candidate| candidate == value)
}
