//! Background auto-reindex worker
//!
//! A plain interval thread: sleep, re-run the ingestion pipeline, flush the
//! search caches. The stdio loop keeps serving while this runs; the shared
//! store handle serializes their writes.

use std::path::PathBuf;
use std::time::Duration;

use hermes_graph::Hermes;

const INTERVAL_VAR: &str = "HERMES_AUTO_INDEX_INTERVAL_SECS";
const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Spawn the worker. An interval of 0 disables it.
pub fn spawn(engine: Hermes, project_root: PathBuf) {
    let interval_secs = std::env::var(INTERVAL_VAR)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);

    if interval_secs == 0 {
        tracing::info!("auto-reindex disabled ({INTERVAL_VAR}=0)");
        return;
    }

    std::thread::spawn(move || {
        tracing::info!("auto-reindex worker started (interval {interval_secs}s)");
        loop {
            std::thread::sleep(Duration::from_secs(interval_secs));
            match engine.pipeline().ingest_directory(&project_root) {
                Ok(report) => {
                    engine.invalidate_caches();
                    tracing::info!("auto-reindex: {report}");
                }
                Err(e) => tracing::warn!("auto-reindex failed: {e}"),
            }
        }
    });
}
