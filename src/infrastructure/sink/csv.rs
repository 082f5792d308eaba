use crate::domain::entities::trade::EnrichedTrade;
use crate::domain::error::DomainError;
use crate::domain::ports::trade_sink::TradeSink;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Append-only CSV sink, one `trades_<market>.csv` per market under the
/// output directory. The header is written exactly once, iff the file did
/// not exist before this append — so a crash between flushes recovers by
/// simply appending again.
pub struct CsvDirSink {
    dir: PathBuf,
}

impl CsvDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| DomainError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn market_path(&self, market_id: &str) -> PathBuf {
        self.dir.join(format!("trades_{market_id}.csv"))
    }
}

impl TradeSink for CsvDirSink {
    fn append(&self, market_id: &str, records: &[EnrichedTrade]) -> Result<usize, DomainError> {
        let path = self.market_path(market_id);
        let write_header = !Path::new(&path).exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| DomainError::Storage(format!("open {}: {e}", path.display())))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        for record in records {
            writer
                .serialize(record)
                .map_err(|e| DomainError::Storage(format!("write {}: {e}", path.display())))?;
        }
        writer
            .flush()
            .map_err(|e| DomainError::Storage(format!("flush {}: {e}", path.display())))?;
        Ok(records.len())
    }
}
