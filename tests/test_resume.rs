mod common;

use common::*;
use polypull::config::VolumeFilter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Running twice against unchanged remote data appends nothing the second
/// time: the first run's checkpoints exclude every finished market.
#[tokio::test]
async fn test_idempotent_resume_across_engine_instances() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("checkpoints.db");
    let db_path = db_path.to_str().unwrap();
    let out_dir = dir.path().join("trades");
    std::fs::create_dir_all(&out_dir).unwrap();

    let markets = vec![
        market("0xm1", "2025-01-10T00:00:00Z"),
        market("0xm2", "2025-01-10T00:00:00Z"),
    ];
    let script = |source: &ScriptedSource| {
        source.script(
            "0xm1",
            vec![Step::Page(page_descending(
                "0xm1",
                "0xa",
                "2025-01-09T00:00:30Z",
                100,
            ))],
        );
        // 0xm2 has no history: dead on first contact.
        source.script("0xm2", vec![Step::Page(vec![])]);
    };

    // First run.
    let source1 = Arc::new(ScriptedSource::new());
    script(&source1);
    let stats1 = Arc::new(CountingStatsSource::new());
    let engine1 = wire(db_path, &out_dir, source1.clone(), stats1, test_config());
    let first = engine1
        .run(markets.clone(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.markets.len(), 2);
    let rows_after_first = csv_rows(&out_dir, "0xm1").len();
    assert_eq!(rows_after_first, 31);

    // Second run: fresh engine over the same checkpoint DB and sink. The
    // scripted source would happily serve data again, but is never asked.
    let source2 = Arc::new(ScriptedSource::new());
    script(&source2);
    let stats2 = Arc::new(CountingStatsSource::new());
    let engine2 = wire(db_path, &out_dir, source2.clone(), stats2, test_config());
    let second = engine2
        .run(markets, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(second.markets_skipped, 2);
    assert!(second.markets.is_empty());
    assert_eq!(second.records_written, 0);
    assert!(source2.call_log().is_empty());
    assert_eq!(csv_rows(&out_dir, "0xm1").len(), rows_after_first);

    // Checkpoints unchanged in substance.
    let summary = engine2.status("24h").unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.done, 2);
    assert_eq!(summary.structurally_dead, 1);
    assert_eq!(summary.empty, 1);
}

/// Done flags are per window configuration: finishing the 24h window does
/// not exclude the market from a 48h+filter run, and vice versa.
#[tokio::test]
async fn test_done_flags_are_per_window_config() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("checkpoints.db");
    let db_path = db_path.to_str().unwrap();
    let out_dir = dir.path().join("trades");
    std::fs::create_dir_all(&out_dir).unwrap();

    let m = market("0xm1", "2025-01-10T00:00:00Z");
    let page = || page_descending("0xm1", "0xa", "2025-01-09T00:00:30Z", 100);

    let source1 = Arc::new(ScriptedSource::new());
    source1.script("0xm1", vec![Step::Page(page())]);
    let engine1 = wire(
        db_path,
        &out_dir,
        source1,
        Arc::new(CountingStatsSource::new()),
        test_config(),
    );
    engine1
        .run(vec![m.clone()], CancellationToken::new())
        .await
        .unwrap();

    // Same market, different window configuration: processed again.
    let mut config = test_config();
    config.window_hours = 48;
    config.volume_filter = Some(VolumeFilter::cash(1000));
    let source2 = Arc::new(ScriptedSource::new());
    source2.script("0xm1", vec![Step::Page(page())]);
    let engine2 = wire(
        db_path,
        &out_dir,
        source2.clone(),
        Arc::new(CountingStatsSource::new()),
        config,
    );
    let report = engine2.run(vec![m], CancellationToken::new()).await.unwrap();

    assert_eq!(report.markets_skipped, 0);
    assert_eq!(report.markets.len(), 1);
    assert!(!source2.call_log().is_empty());
    assert_eq!(engine2.status("48h_cash1000").unwrap().done, 1);
    assert_eq!(engine2.status("24h").unwrap().done, 1);
}
