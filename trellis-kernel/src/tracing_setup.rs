use tracing::{debug, error, info, trace};
use tracing_subscriber::EnvFilter;
use trellis_common::Hash;

use crate::{ConfigError, FinalRound, GraphError, KernelConfig};

/// Install a global fmt subscriber. `RUST_LOG` wins over `config.log_filter`.
pub fn init(config: &KernelConfig) -> Result<(), ConfigError> {
    let filter = env_filter(config, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ConfigError::Subscriber(e.to_string()))
}

/// Valid `env` directives win; otherwise `config.log_filter` must parse.
fn env_filter(config: &KernelConfig, env: Option<&str>) -> Result<EnvFilter, ConfigError> {
    if let Some(filter) = env.and_then(|d| EnvFilter::try_new(d).ok()) {
        return Ok(filter);
    }
    Ok(EnvFilter::try_new(&config.log_filter)?)
}

/// Track a completed graph load
pub fn graph_loaded(network_id: &Hash, nodes: usize, finals: usize) {
    info!(
        target: "graph_loaded",
        network_id = %network_id,
        nodes = nodes,
        final_rounds = finals,
    );
}

/// Track a validator's rounds as read from the store
pub fn round_loaded(node_id: &Hash, cache_number: u64, final_number: Option<u64>, snapshots: usize) {
    trace!(
        target: "round_loaded",
        node_id = %node_id,
        cache_number = cache_number,
        final_number = ?final_number,
        snapshots = snapshots,
    );
}

/// Track a round being sealed
pub fn round_sealed(round: &FinalRound) {
    debug!(
        target: "round_sealed",
        node_id = %round.node_id,
        number = round.number,
        start = round.start,
        end = round.end,
        hash = %round.hash,
    );
}

/// Report corrupted local round state
pub fn integrity_fault(node_id: &Hash, err: &GraphError) {
    error!(
        target: "integrity_fault",
        node_id = %node_id,
        error = %err,
    );
}
