//! SQLite implementation of ChainStore.

use super::{ChainStateSnapshot, ChainStore};
use anchorex_types::{ArchivedHash, BalanceEntry, L1VerifiedEntry};
use eyre::{eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{path::Path, sync::Mutex};

/// SQLite-backed chain state.
///
/// The packed scalar record sits in a single-row table; the mappings get one table each.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (useful for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {e}"))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chain_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                record BLOB NOT NULL,
                saved_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS balances (
                account BLOB PRIMARY KEY,
                amount BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS l1_verified (
                height INTEGER PRIMARY KEY,
                block_hash BLOB NOT NULL,
                signal_root BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS l2_hashes (
                number INTEGER PRIMARY KEY,
                hash BLOB NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

fn to_array<const N: usize>(bytes: Vec<u8>, column: &str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| eyre!("{column}: expected {N} bytes, got {}", bytes.len()))
}

impl ChainStore for SqliteStore {
    fn load_state(&self) -> Result<Option<ChainStateSnapshot>> {
        let conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {e}"))?;

        let row: Option<(Vec<u8>, i64)> = conn
            .query_row("SELECT record, saved_at FROM chain_state WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        let Some((record, saved_at)) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare("SELECT account, amount FROM balances ORDER BY account")?;
        let balances = stmt
            .query_map([], |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?)))?
            .map(|row| -> Result<BalanceEntry> {
                let (account, amount) = row?;
                Ok(BalanceEntry {
                    account: to_array(account, "balances.account")?,
                    amount: to_array(amount, "balances.amount")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT height, block_hash, signal_root FROM l1_verified ORDER BY height",
        )?;
        let l1_verified = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?, row.get::<_, Vec<u8>>(2)?))
            })?
            .map(|row| -> Result<L1VerifiedEntry> {
                let (height, block_hash, signal_root) = row?;
                Ok(L1VerifiedEntry {
                    height: height as u64,
                    block_hash: to_array(block_hash, "l1_verified.block_hash")?,
                    signal_root: to_array(signal_root, "l1_verified.signal_root")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn.prepare("SELECT number, hash FROM l2_hashes ORDER BY number")?;
        let l2_hashes = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))?
            .map(|row| -> Result<ArchivedHash> {
                let (number, hash) = row?;
                let hash = to_array(hash, "l2_hashes.hash")?;
                Ok(ArchivedHash { number: number as u64, hash })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ChainStateSnapshot {
            record,
            balances,
            l1_verified,
            l2_hashes,
            saved_at: saved_at as u64,
        }))
    }

    fn save_state(&self, snapshot: &ChainStateSnapshot) -> Result<()> {
        let mut conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {e}"))?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO chain_state (id, record, saved_at) VALUES (1, ?1, ?2)",
            params![snapshot.record.as_slice(), snapshot.saved_at as i64],
        )?;

        tx.execute("DELETE FROM balances", [])?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT INTO balances (account, amount) VALUES (?1, ?2)")?;
            for entry in &snapshot.balances {
                stmt.execute(params![entry.account.as_slice(), entry.amount.as_slice()])?;
            }

            // archives only grow; rows not in the snapshot stay as they are
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO l1_verified (height, block_hash, signal_root)
                 VALUES (?1, ?2, ?3)",
            )?;
            for entry in &snapshot.l1_verified {
                stmt.execute(params![
                    entry.height as i64,
                    entry.block_hash.as_slice(),
                    entry.signal_root.as_slice(),
                ])?;
            }

            let mut stmt = tx
                .prepare_cached("INSERT OR REPLACE INTO l2_hashes (number, hash) VALUES (?1, ?2)")?;
            for entry in &snapshot.l2_hashes {
                stmt.execute(params![entry.number as i64, entry.hash.as_slice()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}
