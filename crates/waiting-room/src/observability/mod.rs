//! Observability for the waiting room.
//!
//! # Privacy by Default
//!
//! Instrumented operations use `#[instrument(skip_all)]` with an explicit
//! allow-list of fields (action key, target count, status). Display names,
//! avatars and lobby message text are never logged. Metric labels are
//! bounded:
//! - `action`: 6 values (four batch keys, accept-one, deny-one)
//! - `status`: allow, deny
//! - `policy`: 4 values (three policies plus ask-moderator)
//! - `outcome` / `result` / `trigger` / `queue` / `reason`: small fixed sets
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `wr_decisions_total` | Counter | `action`, `status` | Decisions computed |
//! | `wr_policy_updates_total` | Counter | `policy`, `result` | Default policy writes |
//! | `wr_batch_apply_total` | Counter | `outcome` | Batch dispatch results |
//! | `wr_batch_apply_duration_seconds` | Histogram | `outcome` | Backend batch latency |
//! | `wr_panel_close_total` | Counter | `trigger` | Panel close requests |
//! | `wr_pending_users` | Gauge | `queue` | Users currently waiting |
//! | `wr_rejected_actions_total` | Counter | `reason` | Locally rejected actions |

pub mod metrics;

pub use metrics::{
    init_metrics_recorder, record_batch_apply, record_decision, record_panel_close,
    record_policy_update, record_rejected_action, set_pending_users,
};

use common::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| format!("Invalid log level {:?}: {e}", config.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| format!("Failed to install tracing subscriber: {e}"))
}
