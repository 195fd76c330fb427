use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::errors::Result;
use crate::ledger::LedgerError;

/// Slash-separated path addressing one document in the ledger namespace,
/// e.g. `alliances/{id}` or `alliances/{id}/progress/{memberId}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocKey(String);

impl DocKey {
    pub fn new(path: impl Into<String>) -> Self {
        DocKey(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One in-flight atomic read-modify-write over the document namespace.
///
/// Reads observe a consistent snapshot plus the transaction's own pending
/// writes; nothing becomes visible to other transactions until commit.
pub trait LedgerTransaction {
    fn get_raw(&mut self, key: &DocKey) -> Result<Option<Value>>;
    fn put_raw(&mut self, key: &DocKey, body: Value) -> Result<()>;
    /// Lists keys one level (or deeper) under `prefix/`.
    fn list_keys(&mut self, prefix: &DocKey) -> Result<Vec<DocKey>>;
}

impl dyn LedgerTransaction + '_ {
    /// Reads and deserializes one document.
    pub fn get<T: DeserializeOwned>(&mut self, key: &DocKey) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(value) => {
                let doc = serde_json::from_value(value).map_err(LedgerError::Serialization)?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Serializes and writes one document, creating or replacing it.
    pub fn put<T: Serialize>(&mut self, key: &DocKey, doc: &T) -> Result<()> {
        let value = serde_json::to_value(doc).map_err(LedgerError::Serialization)?;
        self.put_raw(key, value)
    }
}

/// Optimistic transaction primitive over a keyed document store.
///
/// `run_transaction` executes the body with read-your-writes semantics and
/// commits every touched document atomically. On an optimistic-concurrency
/// conflict the body is re-executed from scratch, so bodies must be safely
/// re-executable; an `Err` from the body aborts with no partial writes.
pub trait LedgerStore: Send + Sync {
    fn run_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnMut(&mut dyn LedgerTransaction) -> Result<T>;
}
