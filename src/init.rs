use crate::agent::Agent;
use crate::flusher::FlushLoop;
use crate::layer::AgentLayer;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global tracing setup around an [`Agent`].
///
/// **Fields**
/// - `max_level`: most verbose tracing level forwarded into the agent.
/// - `flush_interval`: period of the background [`FlushLoop`].
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to [`AgentLayer`] so events are also printed.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub max_level: Level,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            max_level: Level::INFO,
            flush_interval: Duration::from_secs(1),
            enable_stdout: false,
        }
    }
}

/// Install a global `tracing` subscriber feeding the agent and start its
/// periodic flush.
///
/// **Parameters**
/// - `agent`: the agent receiving every forwarded event.
/// - `config`: [`LayerConfig`] controlling level, flush period and stdout.
///
/// **Returns**
/// - the running [`FlushLoop`]; call [`FlushLoop::shutdown`] before exit
///   to push what is still queued.
/// - `Err(..)` if a global subscriber was already installed.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracing_with_config(
    agent: Arc<Agent>,
    config: LayerConfig,
) -> Result<FlushLoop, tracing::subscriber::SetGlobalDefaultError> {
    let layer = AgentLayer::new(Arc::clone(&agent)).with_max_level(config.max_level);

    // The subscriber type differs with and without the fmt layer.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(FlushLoop::spawn(agent, config.flush_interval))
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(agent: Arc<Agent>) -> Result<FlushLoop, tracing::subscriber::SetGlobalDefaultError> {
    init_tracing_with_config(agent, LayerConfig::default())
}
