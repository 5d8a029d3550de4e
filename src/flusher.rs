use crate::agent::Agent;
use crate::error::AgentError;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::warn;

/// Shortest accepted flush interval.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Background task that flushes an [`Agent`] on a fixed interval.
///
/// A failed flush is logged and left alone: its entries stay queued and go
/// out with the next tick.
pub struct FlushLoop {
    agent: Arc<Agent>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl FlushLoop {
    /// Spawn the loop on the current Tokio runtime.
    ///
    /// Intervals below [`MIN_FLUSH_INTERVAL`] are raised to it.
    pub fn spawn(agent: Arc<Agent>, flush_interval: Duration) -> Self {
        let flush_interval = flush_interval.max(MIN_FLUSH_INTERVAL);
        let (stop, mut stopped) = oneshot::channel::<()>();
        let agent_bg = Arc::clone(&agent);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        if let Err(e) = agent_bg.flush().await {
                            warn!(error = %e, pending = agent_bg.len(), "periodic log flush failed");
                        }
                    }
                }
            }
        });

        Self { agent, stop, handle }
    }

    /// Stop the loop and run one final flush.
    pub async fn shutdown(self) -> Result<(), AgentError> {
        let _ = self.stop.send(());
        let _ = self.handle.await;
        self.agent.flush().await
    }
}
