//! Trait for abstracting the persistence API so different database backends can be used.

mod sqlite;

pub use anchorex_types::ChainStateSnapshot;
pub use sqlite::SqliteStore;

/// Persists the chain state between runs.
pub trait ChainStore: Send + Sync {
    /// Load the last saved state, or None if nothing was saved yet.
    fn load_state(&self) -> eyre::Result<Option<ChainStateSnapshot>>;

    /// Save the state atomically.
    ///
    /// The record and balances replace the stored ones. Archive entries are upserted and
    /// entries missing from `snapshot` are kept, so callers pass only what changed.
    fn save_state(&self, snapshot: &ChainStateSnapshot) -> eyre::Result<()>;
}
