use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::ledger_store::{DocKey, LedgerStore, LedgerTransaction};
use crate::errors::Result;
use crate::ledger::LedgerError;

/// Attempts before a conflicting transaction is surfaced as an error.
const MAX_TRANSACTION_ATTEMPTS: u32 = 32;

#[derive(Clone)]
struct VersionedDocument {
    version: u64,
    body: Value,
}

/// In-memory ledger backend with per-document versions and optimistic
/// commit validation. Used by the test suite and by embedders that do not
/// need durability.
#[derive(Default)]
pub struct MemoryLedger {
    documents: Mutex<HashMap<String, VersionedDocument>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VersionedDocument>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct MemoryTransaction<'a> {
    ledger: &'a MemoryLedger,
    // Version observed per key; 0 marks a document that was absent.
    reads: HashMap<String, u64>,
    writes: HashMap<String, Value>,
}

impl<'a> MemoryTransaction<'a> {
    fn new(ledger: &'a MemoryLedger) -> Self {
        MemoryTransaction {
            ledger,
            reads: HashMap::new(),
            writes: HashMap::new(),
        }
    }

    /// Validates the read-set and applies the write-set. Returns false when
    /// a concurrent commit invalidated one of the reads.
    fn commit(self) -> bool {
        let mut documents = self.ledger.lock();

        for (key, seen_version) in &self.reads {
            let current = documents.get(key).map(|doc| doc.version).unwrap_or(0);
            if current != *seen_version {
                return false;
            }
        }

        for (key, body) in self.writes {
            let entry = documents.entry(key).or_insert(VersionedDocument {
                version: 0,
                body: Value::Null,
            });
            entry.version += 1;
            entry.body = body;
        }
        true
    }
}

impl LedgerTransaction for MemoryTransaction<'_> {
    fn get_raw(&mut self, key: &DocKey) -> Result<Option<Value>> {
        if let Some(pending) = self.writes.get(key.as_str()) {
            return Ok(Some(pending.clone()));
        }

        let documents = self.ledger.lock();
        match documents.get(key.as_str()) {
            Some(doc) => {
                self.reads.insert(key.as_str().to_string(), doc.version);
                Ok(Some(doc.body.clone()))
            }
            None => {
                self.reads.insert(key.as_str().to_string(), 0);
                Ok(None)
            }
        }
    }

    fn put_raw(&mut self, key: &DocKey, body: Value) -> Result<()> {
        self.writes.insert(key.as_str().to_string(), body);
        Ok(())
    }

    fn list_keys(&mut self, prefix: &DocKey) -> Result<Vec<DocKey>> {
        let wanted = format!("{}/", prefix.as_str());
        let documents = self.ledger.lock();
        let mut keys: Vec<DocKey> = documents
            .iter()
            .filter(|(key, _)| key.starts_with(&wanted))
            .map(|(key, doc)| {
                // Scanned documents join the read-set so decisions based on
                // the listing are validated at commit.
                self.reads.insert(key.clone(), doc.version);
                DocKey::new(key.clone())
            })
            .collect();
        drop(documents);

        for key in self.writes.keys() {
            if key.starts_with(&wanted) && !keys.iter().any(|k| k.as_str() == key) {
                keys.push(DocKey::new(key.clone()));
            }
        }
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(keys)
    }
}

impl LedgerStore for MemoryLedger {
    fn run_transaction<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&mut dyn LedgerTransaction) -> Result<T>,
    {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let mut txn = MemoryTransaction::new(self);
            let outcome = f(&mut txn)?;
            if txn.commit() {
                return Ok(outcome);
            }
            debug!("ledger transaction conflicted, retrying (attempt {attempt})");
        }
        Err(LedgerError::Conflict {
            attempts: MAX_TRANSACTION_ATTEMPTS,
        }
        .into())
    }
}
