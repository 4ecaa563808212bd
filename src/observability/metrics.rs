//! Metric recording helpers.
//!
//! # Metrics
//! - `fabric_transactions_total` (counter): submits by outcome
//! - `fabric_endorsement_failures_total` (counter): invalid endorsement responses
//! - `fabric_queries_total` (counter): handler evaluations by strategy, outcome
//! - `fabric_events_dispatched_total` (counter): routed events by listener kind
//! - `fabric_listener_errors_total` (counter): failed or panicked callbacks by kind
//! - `fabric_event_services` (gauge): pooled event services by pool

pub fn record_transaction(outcome: &'static str) {
    metrics::counter!("fabric_transactions_total", "outcome" => outcome).increment(1);
}

pub fn record_endorsement_failures(count: usize) {
    metrics::counter!("fabric_endorsement_failures_total").increment(count as u64);
}

pub fn record_query(strategy: &'static str, outcome: &'static str) {
    metrics::counter!("fabric_queries_total", "strategy" => strategy, "outcome" => outcome).increment(1);
}

pub fn record_event_dispatched(kind: &'static str) {
    metrics::counter!("fabric_events_dispatched_total", "kind" => kind).increment(1);
}

pub fn record_listener_error(kind: &'static str) {
    metrics::counter!("fabric_listener_errors_total", "kind" => kind).increment(1);
}

pub fn record_event_services(pool: &'static str, count: usize) {
    metrics::gauge!("fabric_event_services", "pool" => pool).set(count as f64);
}
