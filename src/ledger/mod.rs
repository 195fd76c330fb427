// Module declarations
pub(crate) mod ledger_errors;
pub(crate) mod ledger_store;
pub(crate) mod memory_ledger;
pub(crate) mod sqlite_ledger;

// Re-export the public interface
pub use ledger_errors::LedgerError;
pub use ledger_store::{DocKey, LedgerStore, LedgerTransaction};
pub use memory_ledger::MemoryLedger;
pub use sqlite_ledger::{DbConnection, DbPool, SqliteLedger};
