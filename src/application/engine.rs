use crate::application::chunk::ChunkBuffer;
use crate::application::enrichment::EnrichmentService;
use crate::config::IngestConfig;
use crate::domain::entities::checkpoint::CheckpointRecord;
use crate::domain::entities::market::MarketDescriptor;
use crate::domain::entities::trade::TradeRecord;
use crate::domain::error::DomainError;
use crate::domain::ports::checkpoint_repository::CheckpointRepository;
use crate::domain::ports::trade_sink::TradeSink;
use crate::domain::ports::trade_source::TradeSource;
use crate::domain::values::outcome::{
    DeadReason, DoneReason, MarketOutcome, MarketReport, RunReport,
};
use crate::domain::values::progress::{GuardVerdict, ProgressGuard};
use crate::domain::values::window::WindowPlan;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives the per-market state machine
/// `PLANNING → FETCHING → {DONE, DEAD, ERROR}` over the injected ports and
/// records a checkpoint the moment any market reaches a terminal state.
///
/// Markets are independent: the only state shared between loops is the
/// stats cache, the checkpoint store and the rate limiter inside the trade
/// source, so the same engine runs sequentially or as a worker pool.
#[derive(Clone)]
pub struct IngestionEngine {
    source: Arc<dyn TradeSource>,
    enrichment: Arc<EnrichmentService>,
    checkpoints: Arc<dyn CheckpointRepository>,
    sink: Arc<dyn TradeSink>,
    config: IngestConfig,
}

impl IngestionEngine {
    pub fn new(
        source: Arc<dyn TradeSource>,
        enrichment: Arc<EnrichmentService>,
        checkpoints: Arc<dyn CheckpointRepository>,
        sink: Arc<dyn TradeSink>,
        config: IngestConfig,
    ) -> Self {
        Self {
            source,
            enrichment,
            checkpoints,
            sink,
            config,
        }
    }

    /// Runs every market not already excluded by its checkpoint. Individual
    /// market failures are reported and skipped over; only checkpoint-store
    /// failures abort the run.
    pub async fn run(
        &self,
        markets: Vec<MarketDescriptor>,
        cancel: CancellationToken,
    ) -> Result<RunReport, DomainError> {
        let window_key = self.config.window_key();
        let excluded = self.checkpoints.excluded_ids(&window_key)?;

        let considered = markets.len();
        let active: VecDeque<MarketDescriptor> = markets
            .into_iter()
            .filter(|m| !excluded.contains(&m.condition_id))
            .collect();
        let skipped = considered - active.len();
        let active_count = active.len();
        info!(
            window = %window_key,
            considered,
            skipped,
            active = active_count,
            "starting ingestion run"
        );

        let queue = Arc::new(Mutex::new(active));
        // Child token: a fatal storage error cancels the remaining workers
        // without cancelling the operator's token.
        let run_cancel = cancel.child_token();
        let workers = self.config.concurrency.max(1).min(active_count.max(1));

        let mut join = JoinSet::new();
        for _ in 0..workers {
            let engine = self.clone();
            let queue = queue.clone();
            let run_cancel = run_cancel.clone();
            let window_key = window_key.clone();
            join.spawn(async move {
                let mut reports = Vec::new();
                loop {
                    if run_cancel.is_cancelled() {
                        break;
                    }
                    let market = queue.lock().expect("market queue lock").pop_front();
                    let Some(market) = market else { break };
                    match engine
                        .ingest_market(&market, &window_key, &run_cancel)
                        .await
                    {
                        Ok(Some(report)) => reports.push(report),
                        // Cancelled mid-market: the market re-runs cleanly
                        // next time, nothing more to do here.
                        Ok(None) => break,
                        Err(e) => {
                            run_cancel.cancel();
                            return Err((e, reports));
                        }
                    }
                }
                Ok(reports)
            });
        }

        let mut reports: Vec<MarketReport> = Vec::new();
        let mut fatal: Option<DomainError> = None;
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok(Ok(worker_reports)) => reports.extend(worker_reports),
                Ok(Err((e, worker_reports))) => {
                    reports.extend(worker_reports);
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    fatal.get_or_insert(DomainError::Storage(format!("worker panicked: {e}")));
                }
            }
        }
        if let Some(e) = fatal {
            error!(error = %e, "run aborted");
            return Err(e);
        }

        let report = RunReport {
            window_key,
            markets_considered: considered,
            markets_skipped: skipped,
            markets_cancelled: active_count - reports.len(),
            records_written: reports.iter().map(|r| r.records_written).sum(),
            markets: reports,
        };
        info!(
            processed = report.markets.len(),
            cancelled = report.markets_cancelled,
            records = report.records_written,
            "run finished"
        );
        Ok(report)
    }

    /// One market, start to terminal state. `Ok(None)` means the run was
    /// cancelled mid-market: buffered records are dropped and the
    /// checkpoint stays untouched so the next run starts this market from
    /// scratch. The only `Err` is a checkpoint-store failure.
    async fn ingest_market(
        &self,
        market: &MarketDescriptor,
        window_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<MarketReport>, DomainError> {
        let cfg = &self.config;
        let market_id = market.condition_id.as_str();

        // PLANNING
        let plan = WindowPlan::for_market(market, cfg.window_hours);
        if plan.late_closing {
            debug!(market = market_id, "close time after end date; window anchored to end date");
        }
        info!(
            market = market_id,
            question = %market.question,
            cutoff = %plan.cutoff,
            "market start"
        );

        let mut guard = ProgressGuard::new(cfg.stagnation_limit);
        let mut buffer = ChunkBuffer::new(cfg.chunk_size);
        let mut offset: u64 = 0;
        let mut pages: u32 = 0;
        let mut written: usize = 0;

        // FETCHING
        let mut outcome = loop {
            if cancel.is_cancelled() {
                info!(market = market_id, "cancelled mid-market");
                return Ok(None);
            }

            let page = match self.source.fetch_page(market_id, offset, cfg.page_limit).await {
                Ok(page) => page,
                Err(e) if e.is_transient() => {
                    warn!(market = market_id, offset, error = %e, "transient fetch failure; retrying");
                    if sleep_cancellable(cfg.retry_delay, cancel).await {
                        info!(market = market_id, "cancelled during retry wait");
                        return Ok(None);
                    }
                    continue;
                }
                Err(e) => {
                    error!(market = market_id, offset, error = %e, "aborting market; checkpoint untouched");
                    break MarketOutcome::Aborted {
                        error: e.to_string(),
                    };
                }
            };
            pages += 1;

            if page.is_empty() {
                if offset == 0 {
                    break MarketOutcome::Dead {
                        reason: DeadReason::NoHistory,
                    };
                }
                break MarketOutcome::Done {
                    reason: DoneReason::Exhausted,
                };
            }

            if offset == 0 && cfg.min_lifetime_trades > 0 && page.len() < cfg.min_lifetime_trades {
                debug!(
                    market = market_id,
                    lifetime = page.len(),
                    minimum = cfg.min_lifetime_trades,
                    "lifetime trade count below minimum"
                );
                break MarketOutcome::Dead {
                    reason: DeadReason::ThinHistory,
                };
            }

            let page_min = page
                .iter()
                .map(|t| t.timestamp)
                .min()
                .expect("non-empty page");
            let kept: Vec<TradeRecord> = page
                .into_iter()
                .filter(|t| plan.contains(t.timestamp))
                .collect();

            if kept.is_empty() {
                // Every record on the page precedes the cutoff.
                break MarketOutcome::Done {
                    reason: DoneReason::WindowCovered,
                };
            }
            if offset == 0 && cfg.min_recent_trades > 0 && kept.len() < cfg.min_recent_trades {
                debug!(
                    market = market_id,
                    in_window = kept.len(),
                    minimum = cfg.min_recent_trades,
                    "in-window trade count below minimum"
                );
                break MarketOutcome::Dead {
                    reason: DeadReason::QuietWindow,
                };
            }

            match guard.observe(&kept) {
                GuardVerdict::RepeatedPage => {
                    warn!(market = market_id, offset, "repeated page; terminating");
                    break MarketOutcome::Done {
                        reason: DoneReason::RepeatedPage,
                    };
                }
                GuardVerdict::Stagnant => {
                    warn!(market = market_id, offset, "no timestamp progress; terminating");
                    break MarketOutcome::Done {
                        reason: DoneReason::Stagnation,
                    };
                }
                GuardVerdict::Continue => {}
            }

            let enriched = self.enrichment.enrich(&kept).await;
            buffer.extend(enriched);
            if buffer.should_flush() {
                match buffer.flush(self.sink.as_ref(), market_id) {
                    Ok(n) => {
                        written += n;
                        debug!(market = market_id, written, "chunk flushed");
                    }
                    Err(e) => {
                        error!(market = market_id, error = %e, "sink write failed; aborting market");
                        break MarketOutcome::Aborted {
                            error: e.to_string(),
                        };
                    }
                }
            }

            if page_min <= plan.cutoff {
                break MarketOutcome::Done {
                    reason: DoneReason::WindowCovered,
                };
            }
            offset += cfg.page_limit;
        };

        // Final flush, then checkpoint — in that order, so a flushed-but-
        // uncheckpointed crash re-runs the market rather than losing rows.
        if !matches!(outcome, MarketOutcome::Aborted { .. }) && !buffer.is_empty() {
            match buffer.flush(self.sink.as_ref(), market_id) {
                Ok(n) => written += n,
                Err(e) => {
                    error!(market = market_id, error = %e, "final flush failed; aborting market");
                    outcome = MarketOutcome::Aborted {
                        error: e.to_string(),
                    };
                }
            }
        }

        if !matches!(outcome, MarketOutcome::Aborted { .. }) {
            let mut checkpoint = self
                .checkpoints
                .get(market_id)?
                .unwrap_or_else(|| CheckpointRecord::new(market_id.to_string()));
            match &outcome {
                MarketOutcome::Done { .. } => checkpoint.mark_done(window_key),
                MarketOutcome::Dead { reason } => {
                    checkpoint.mark_dead(matches!(reason, DeadReason::NoHistory));
                    // Dead also counts as done for the active window.
                    checkpoint.mark_done(window_key);
                }
                MarketOutcome::Aborted { .. } => unreachable!(),
            }
            checkpoint.last_offset = offset;
            self.checkpoints.upsert(&checkpoint)?;
        }

        info!(
            market = market_id,
            outcome = %outcome,
            pages,
            records = written,
            "market finished"
        );
        Ok(Some(MarketReport {
            market_id: market_id.to_string(),
            outcome,
            pages_fetched: pages,
            records_written: written,
        }))
    }
}

/// Sleeps for `duration` unless cancelled first; true means cancelled.
async fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
