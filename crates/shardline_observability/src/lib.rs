//! Observability setup: structured logging and metrics.

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber with structured logging.
///
/// `RUST_LOG` wins over `default_filter` when it is set. Calling this twice
/// is harmless: the second registration is ignored.
pub fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

/// Record one routing decision: which executor ran and how many units it produced.
pub fn record_route_metrics(strategy: &'static str, route_units: usize) {
    metrics::counter!("shardline_routes_total", "strategy" => strategy).increment(1);
    metrics::histogram!("shardline_route_units", "strategy" => strategy).record(route_units as f64);
}

/// Record the outcome of one rule-change event.
pub fn record_rule_event(event_type: &'static str, outcome: &'static str) {
    metrics::counter!(
        "shardline_rule_events_total",
        "type" => event_type,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one merged result: how many shard results fed it and how many rows it produced.
pub fn record_merge_metrics(merger: &'static str, shard_results: usize, rows: usize) {
    metrics::counter!("shardline_merges_total", "merger" => merger).increment(1);
    metrics::histogram!("shardline_merge_shard_results", "merger" => merger)
        .record(shard_results as f64);
    metrics::histogram!("shardline_merge_rows", "merger" => merger).record(rows as f64);
}
