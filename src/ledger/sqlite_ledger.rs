use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};
use serde_json::Value;
use std::sync::Arc;

use super::ledger_store::{DocKey, LedgerStore, LedgerTransaction};
use crate::errors::{Error, Result};
use crate::ledger::LedgerError;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// SQLite-backed ledger. Documents live in a single `ledger_documents`
/// table; `run_transaction` maps to one immediate transaction, so SQLite's
/// write lock provides the isolation the engine relies on. The `version`
/// column still bumps per write for change listeners.
pub struct SqliteLedger {
    pool: Arc<DbPool>,
}

impl SqliteLedger {
    /// Opens (creating if needed) the ledger database at `db_path` and runs
    /// pending migrations.
    pub fn new(db_path: &str) -> Result<Self> {
        {
            let mut conn = SqliteConnection::establish(db_path)?;
            conn.batch_execute(
                "PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 30000;
                 PRAGMA synchronous = NORMAL;",
            )?;
        }

        let pool = create_pool(db_path)?;
        run_migrations(&pool)?;
        Ok(SqliteLedger { pool })
    }

    pub fn from_pool(pool: Arc<DbPool>) -> Self {
        SqliteLedger { pool }
    }

    pub fn pool(&self) -> Arc<DbPool> {
        Arc::clone(&self.pool)
    }
}

pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = r2d2::Pool::builder()
        .max_size(8)
        .min_idle(Some(1)) // Keep at least one connection ready
        .connection_timeout(std::time::Duration::from_secs(30))
        .connection_customizer(Box::new(ConnectionCustomizer {}))
        .build(manager)
        .map_err(LedgerError::PoolCreationFailed)?;
    Ok(Arc::new(pool))
}

pub fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("Running ledger database migrations");
    let mut connection = get_connection(pool)?;

    let applied = connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
        error!("Ledger migration failed: {}", e);
        Error::Ledger(LedgerError::MigrationFailed(e.to_string()))
    })?;

    if applied.is_empty() {
        info!("No pending migrations to apply.");
    } else {
        for migration_version in &applied {
            info!("Applied migration {}", migration_version);
        }
    }

    Ok(())
}

/// Gets a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    Ok(pool.get()?)
}

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        use diesel::RunQueryDsl;

        diesel::sql_query(
            "PRAGMA busy_timeout = 30000;
             PRAGMA synchronous = NORMAL;",
        )
        .execute(conn)
        .map_err(diesel::r2d2::Error::QueryError)?;

        Ok(())
    }
}

struct SqliteTransaction<'a> {
    conn: &'a mut SqliteConnection,
}

impl LedgerTransaction for SqliteTransaction<'_> {
    fn get_raw(&mut self, key: &DocKey) -> Result<Option<Value>> {
        use crate::schema::ledger_documents::dsl::*;

        let row: Option<String> = ledger_documents
            .filter(doc_key.eq(key.as_str()))
            .select(body)
            .first::<String>(self.conn)
            .optional()?;

        match row {
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(LedgerError::Serialization)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put_raw(&mut self, key: &DocKey, value: Value) -> Result<()> {
        use crate::schema::ledger_documents::dsl::*;

        let serialized = serde_json::to_string(&value).map_err(LedgerError::Serialization)?;
        let now = Utc::now().naive_utc();

        diesel::insert_into(ledger_documents)
            .values((
                doc_key.eq(key.as_str()),
                body.eq(&serialized),
                version.eq(1_i64),
                updated_at.eq(now),
            ))
            .on_conflict(doc_key)
            .do_update()
            .set((
                body.eq(&serialized),
                version.eq(version + 1),
                updated_at.eq(now),
            ))
            .execute(self.conn)?;

        Ok(())
    }

    fn list_keys(&mut self, prefix: &DocKey) -> Result<Vec<DocKey>> {
        use crate::schema::ledger_documents::dsl::*;

        let pattern = format!("{}/%", prefix.as_str());
        let keys: Vec<String> = ledger_documents
            .filter(doc_key.like(pattern))
            .select(doc_key)
            .order(doc_key.asc())
            .load::<String>(self.conn)?;

        Ok(keys.into_iter().map(DocKey::new).collect())
    }
}

impl LedgerStore for SqliteLedger {
    fn run_transaction<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&mut dyn LedgerTransaction) -> Result<T>,
    {
        let mut conn = get_connection(&self.pool)?;
        conn.immediate_transaction::<T, Error, _>(|tx_conn| {
            let mut txn = SqliteTransaction { conn: tx_conn };
            f(&mut txn)
        })
    }
}
