// src/engine/tick_loop.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::sink::{CLEAR_SCREEN, OutputSink};
use crate::exec::Supervise;

/// Command-mode driver: restart on a fixed period.
///
/// Ticks are rate-limited by construction, so no debouncing. A restart that
/// overruns the period delays the next tick rather than bunching them up.
#[derive(Debug)]
pub struct TickLoop<S: Supervise> {
    supervisor: Arc<S>,
    period: Duration,
    clear: Option<OutputSink>,
}

impl<S: Supervise> TickLoop<S> {
    pub fn new(supervisor: Arc<S>, period: Duration) -> Self {
        Self {
            supervisor,
            period,
            clear: None,
        }
    }

    /// Clear the terminal through `sink` before each tick run.
    pub fn clear_screen(mut self, sink: OutputSink) -> Self {
        self.clear = Some(sink);
        self
    }

    /// Run immediately, then once per period until cancelled.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!(every = ?self.period, "running command periodically");

        self.supervisor.restart().await;

        let Some(first_tick) = Instant::now().checked_add(self.period) else {
            warn!(every = ?self.period, "period too long to schedule; running once");
            cancel.cancelled().await;
            self.supervisor.shutdown().await;
            return Ok(());
        };
        let mut ticker = interval_at(first_tick, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("cancellation requested; stopping tick loop");
                    break;
                }
                _ = ticker.tick() => {
                    if let Some(sink) = &self.clear {
                        if let Err(err) = sink.write_raw(CLEAR_SCREEN).await {
                            debug!(error = %err, "clear screen");
                        }
                    }
                    info!("running command every {:?}", self.period);
                    self.supervisor.restart().await;
                }
            }
        }

        self.supervisor.shutdown().await;
        debug!("tick loop finished");
        Ok(())
    }
}
