use crate::domain::entities::trade::EnrichedTrade;
use crate::domain::error::DomainError;
use crate::domain::ports::trade_sink::TradeSink;

/// Accumulates enriched trades for one market and flushes them to the sink
/// in batches, so output lands in a few large appends instead of one write
/// per page.
#[derive(Debug)]
pub struct ChunkBuffer {
    records: Vec<EnrichedTrade>,
    chunk_size: usize,
}

impl ChunkBuffer {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            records: Vec::new(),
            chunk_size,
        }
    }

    pub fn extend(&mut self, records: Vec<EnrichedTrade>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn should_flush(&self) -> bool {
        self.chunk_size > 0 && self.records.len() >= self.chunk_size
    }

    /// Appends the buffered records to the sink and clears the buffer.
    /// Calling this with an empty buffer is a caller bug and is rejected.
    pub fn flush(&mut self, sink: &dyn TradeSink, market_id: &str) -> Result<usize, DomainError> {
        if self.records.is_empty() {
            return Err(DomainError::InvalidInput(
                "flush called on an empty chunk buffer".into(),
            ));
        }
        let written = sink.append(market_id, &self.records)?;
        self.records.clear();
        Ok(written)
    }
}
