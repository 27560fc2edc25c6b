use crate::engine::VisualizationEngine;
use crate::logger::{log, LogSeverity::*};
use std::sync::Arc;
use tokio::task::{self, JoinHandle};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Spawns a task draining `engine` on its configured tick interval.
/// Abort the returned handle to stop it.
pub fn spawn_ticker(engine: Arc<VisualizationEngine>) -> JoinHandle<()> {
    let period = engine.config().tick_interval();
    spawn_ticker_every(engine, period)
}

pub fn spawn_ticker_every(engine: Arc<VisualizationEngine>, period: Duration) -> JoinHandle<()> {
    log(format!("Overlay ticker running every {:?}", period), Info);
    tokio::spawn(ticker(engine, period))
}

/// Drains the queue once per tick. A slow tick delays the next one instead of
/// bursting to catch up.
///
/// Sink calls are synchronous, so each drain runs on the blocking pool and the
/// next tick waits for it to finish.
async fn ticker(engine: Arc<VisualizationEngine>, period: Duration) {
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let engine = Arc::clone(&engine);
        match task::spawn_blocking(move || engine.drain_tick()).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => log(format!("Overlay tick failed: {}", err), Error),
            Err(err) => log(format!("Overlay tick aborted: {}", err), Error),
        }
    }
}
