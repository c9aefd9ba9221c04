//! Background eviction.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::KnowledgeEngine;

/// Run [`KnowledgeEngine::cleanup_memories`] every `interval`.
///
/// The first pass happens one full interval after spawning. Failures are
/// logged and the loop keeps going; abort the handle to stop it.
pub fn spawn_periodic_cleanup(engine: Arc<KnowledgeEngine>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Starting periodic memory cleanup");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match engine.cleanup_memories().await {
                Ok(report) => debug!(evicted = report.total(), "Periodic cleanup pass"),
                Err(e) => warn!(error = %e, "Periodic cleanup failed"),
            }
        }
    })
}
