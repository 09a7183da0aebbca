//! Metrics collection.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): settled call groups by method, outcome
//! - `dispatch_request_duration_seconds` (histogram): call group latency, retries included
//! - `dispatch_attempts_total` (counter): transport attempts by method
//! - `dispatch_retries_total` (counter): retries scheduled after transport failures
//! - `dispatch_duplicates_rejected_total` (counter): calls rejected as duplicates
//! - `dispatch_in_flight` (gauge): accepted, unsettled call groups

use std::time::Instant;

use metrics::{counter, gauge, histogram};

pub fn record_outcome(method: &str, outcome: &'static str, start: Instant) {
    counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("dispatch_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_attempt(method: &str) {
    counter!("dispatch_attempts_total", "method" => method.to_string()).increment(1);
}

pub fn record_retry(method: &str) {
    counter!("dispatch_retries_total", "method" => method.to_string()).increment(1);
}

pub fn record_duplicate(method: &str) {
    counter!("dispatch_duplicates_rejected_total", "method" => method.to_string()).increment(1);
}

pub fn set_in_flight(count: usize) {
    gauge!("dispatch_in_flight").set(count as f64);
}
