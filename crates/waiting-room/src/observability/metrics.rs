//! Metrics definitions for the waiting room.
//!
//! All metrics follow Prometheus naming conventions:
//! - `wr_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Every label is bounded by an enum or a fixed string set in the calling
//! code. No label ever carries a user id or display name.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded. Batch apply buckets
/// cover a backend round trip up to the default 5s timeout.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("wr_batch_apply".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set batch apply buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Decision Metrics (Counters)
// ============================================================================

/// Record a computed decision.
///
/// Metric: `wr_decisions_total`
/// Labels: `action`, `status`
///
/// Cardinality: 6 x 2
pub fn record_decision(action: &str, status: &str) {
    counter!(
        "wr_decisions_total",
        "action" => action.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a default policy write.
///
/// Metric: `wr_policy_updates_total`
/// Labels: `policy`, `result` (applied, failed, reverted, revert_failed)
pub fn record_policy_update(policy: &str, result: &str) {
    counter!(
        "wr_policy_updates_total",
        "policy" => policy.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record an action rejected before reaching the backend.
///
/// Metric: `wr_rejected_actions_total`
/// Labels: `reason` (invalid_action, user_not_pending, invalid_lobby_message)
pub fn record_rejected_action(reason: &str) {
    counter!("wr_rejected_actions_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Batch Apply Metrics
// ============================================================================

/// Record the result of dispatching one batch decision.
///
/// Metrics: `wr_batch_apply_total`, `wr_batch_apply_duration_seconds`
/// Labels: `outcome` (applied, partial, failed, skipped)
pub fn record_batch_apply(outcome: &str, duration: Duration) {
    counter!("wr_batch_apply_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("wr_batch_apply_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

// ============================================================================
// Panel Metrics
// ============================================================================

/// Record a panel close request.
///
/// Metric: `wr_panel_close_total`
/// Labels: `trigger` (lifecycle, batch_action)
pub fn record_panel_close(trigger: &str) {
    counter!("wr_panel_close_total", "trigger" => trigger.to_string()).increment(1);
}

/// Set the number of users waiting in a queue.
///
/// Metric: `wr_pending_users`
/// Labels: `queue` (authenticated, guest)
pub fn set_pending_users(queue: &str, count: usize) {
    // usize to f64 conversion is safe for realistic queue lengths
    #[allow(clippy::cast_precision_loss)]
    gauge!("wr_pending_users", "queue" => queue.to_string()).set(count as f64);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_decision() {
        record_decision("allow-everyone", "ALLOW");
        record_decision("deny-everyone", "DENY");
        record_decision("accept-one", "ALLOW");
    }

    #[test]
    fn test_record_policy_update() {
        record_policy_update("ALWAYS_ACCEPT", "applied");
        record_policy_update("ALWAYS_DENY", "failed");
        record_policy_update("ASK_MODERATOR", "reverted");
    }

    #[test]
    fn test_record_batch_apply() {
        record_batch_apply("applied", Duration::from_millis(12));
        record_batch_apply("partial", Duration::from_millis(40));
        record_batch_apply("failed", Duration::from_secs(5));
        record_batch_apply("skipped", Duration::ZERO);
    }

    #[test]
    fn test_panel_and_queue_metrics() {
        record_panel_close("lifecycle");
        record_panel_close("batch_action");
        set_pending_users("authenticated", 0);
        set_pending_users("guest", 12);
        record_rejected_action("invalid_action");
    }

    #[test]
    fn test_metrics_are_captured_by_recorder() {
        use metrics_util::debugging::DebuggingRecorder;

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_decision("allow-all-auth", "ALLOW");
            record_policy_update("ALWAYS_ACCEPT_AUTH", "applied");
            record_batch_apply("applied", Duration::from_millis(5));
            record_panel_close("lifecycle");
            set_pending_users("guest", 3);
            record_rejected_action("user_not_pending");
        });

        let names: Vec<String> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();

        for expected in [
            "wr_decisions_total",
            "wr_policy_updates_total",
            "wr_batch_apply_total",
            "wr_batch_apply_duration_seconds",
            "wr_panel_close_total",
            "wr_pending_users",
            "wr_rejected_actions_total",
        ] {
            assert!(
                names.iter().any(|n| n == expected),
                "missing {expected} in {names:?}"
            );
        }
    }
}
