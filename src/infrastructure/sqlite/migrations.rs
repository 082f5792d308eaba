use crate::domain::error::DomainError;
use rusqlite::Connection;

/// Done flags live in their own table keyed by (market, window config), so
/// running a new window configuration needs no schema change.
pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS checkpoints (
            market_id TEXT PRIMARY KEY,
            structurally_dead INTEGER NOT NULL DEFAULT 0,
            empty INTEGER NOT NULL DEFAULT 0,
            last_offset INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS checkpoint_windows (
            market_id TEXT NOT NULL,
            window_key TEXT NOT NULL,
            done INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (market_id, window_key)
        );

        CREATE INDEX IF NOT EXISTS idx_checkpoint_windows_key ON checkpoint_windows(window_key);
        ",
    )
    .map_err(|e| DomainError::Checkpoint(format!("migration failed: {e}")))
}
