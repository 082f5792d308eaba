use crate::domain::entities::checkpoint::CheckpointRecord;
use crate::domain::error::DomainError;
use crate::domain::ports::checkpoint_repository::{CheckpointRepository, CheckpointSummary};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::Mutex;

/// SQLite-backed checkpoint store. Writes are serialized behind the
/// connection mutex; each market owns a disjoint key, so worker loops
/// never contend on the same row.
pub struct SqliteCheckpointRepo {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointRepo {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DomainError> {
        self.conn
            .lock()
            .map_err(|e| DomainError::Checkpoint(e.to_string()))
    }
}

impl CheckpointRepository for SqliteCheckpointRepo {
    fn get(&self, market_id: &str) -> Result<Option<CheckpointRecord>, DomainError> {
        let conn = self.lock()?;
        let base = conn
            .query_row(
                "SELECT structurally_dead, empty, last_offset, updated_at
                 FROM checkpoints WHERE market_id = ?1",
                params![market_id],
                |row| {
                    Ok((
                        row.get::<_, bool>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| DomainError::Checkpoint(format!("checkpoint read: {e}")))?;

        let Some((structurally_dead, empty, last_offset, updated_str)) = base else {
            return Ok(None);
        };

        let mut record = CheckpointRecord::new(market_id.to_string());
        record.structurally_dead = structurally_dead;
        record.empty = empty;
        record.last_offset = last_offset.max(0) as u64;
        record.updated_at = DateTime::parse_from_rfc3339(&updated_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let mut stmt = conn
            .prepare(
                "SELECT window_key, done FROM checkpoint_windows WHERE market_id = ?1",
            )
            .map_err(|e| DomainError::Checkpoint(e.to_string()))?;
        let rows = stmt
            .query_map(params![market_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
            })
            .map_err(|e| DomainError::Checkpoint(e.to_string()))?;
        for row in rows {
            let (key, done) = row.map_err(|e| DomainError::Checkpoint(e.to_string()))?;
            record.done.insert(key, done);
        }
        Ok(Some(record))
    }

    fn upsert(&self, record: &CheckpointRecord) -> Result<(), DomainError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::Checkpoint(e.to_string()))?;

        // MAX keeps flags monotonic even if a stale in-memory record is
        // written back: dead/empty/done are set exactly once, never unset.
        tx.execute(
            "INSERT INTO checkpoints (market_id, structurally_dead, empty, last_offset, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(market_id) DO UPDATE SET
                 structurally_dead = MAX(checkpoints.structurally_dead, excluded.structurally_dead),
                 empty = MAX(checkpoints.empty, excluded.empty),
                 last_offset = excluded.last_offset,
                 updated_at = excluded.updated_at",
            params![
                record.market_id,
                record.structurally_dead,
                record.empty,
                record.last_offset as i64,
                record.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| DomainError::Checkpoint(format!("checkpoint write: {e}")))?;

        for (window_key, done) in &record.done {
            if !done {
                continue;
            }
            tx.execute(
                "INSERT INTO checkpoint_windows (market_id, window_key, done)
                 VALUES (?1, ?2, 1)
                 ON CONFLICT(market_id, window_key) DO UPDATE SET
                     done = MAX(checkpoint_windows.done, 1)",
                params![record.market_id, window_key],
            )
            .map_err(|e| DomainError::Checkpoint(format!("checkpoint write: {e}")))?;
        }

        tx.commit()
            .map_err(|e| DomainError::Checkpoint(format!("checkpoint commit: {e}")))
    }

    fn excluded_ids(&self, window_key: &str) -> Result<HashSet<String>, DomainError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT market_id FROM checkpoints WHERE structurally_dead = 1
                 UNION
                 SELECT market_id FROM checkpoint_windows WHERE window_key = ?1 AND done = 1",
            )
            .map_err(|e| DomainError::Checkpoint(e.to_string()))?;
        let rows = stmt
            .query_map(params![window_key], |row| row.get::<_, String>(0))
            .map_err(|e| DomainError::Checkpoint(e.to_string()))?;
        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row.map_err(|e| DomainError::Checkpoint(e.to_string()))?);
        }
        Ok(ids)
    }

    fn summary(&self, window_key: &str) -> Result<CheckpointSummary, DomainError> {
        let conn = self.lock()?;
        let (total, structurally_dead, empty) = conn
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(structurally_dead), 0),
                        COALESCE(SUM(empty), 0)
                 FROM checkpoints",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .map_err(|e| DomainError::Checkpoint(e.to_string()))?;
        let done = conn
            .query_row(
                "SELECT COUNT(*) FROM checkpoint_windows WHERE window_key = ?1 AND done = 1",
                params![window_key],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| DomainError::Checkpoint(e.to_string()))?;

        Ok(CheckpointSummary {
            window_key: window_key.to_string(),
            total: total as usize,
            done: done as usize,
            structurally_dead: structurally_dead as usize,
            empty: empty as usize,
        })
    }
}
