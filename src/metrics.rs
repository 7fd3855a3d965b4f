/// Metrics and telemetry for Pollbox
///
/// Prometheus-compatible counters for the auth and voting flows, exposed at
/// the /metrics endpoint.

use crate::error::{PollError, PollResult};
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Login attempts by outcome: success, invalid, locked
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "pollbox_login_attempts_total",
        "Total number of login attempts",
        &["outcome"]
    )
    .unwrap();

    /// Accounts registered
    pub static ref REGISTRATIONS_TOTAL: IntCounter = register_int_counter!(
        "pollbox_registrations_total",
        "Total number of accounts registered"
    )
    .unwrap();

    /// Sessions issued (login + registration)
    pub static ref SESSIONS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "pollbox_sessions_created_total",
        "Total number of sessions issued"
    )
    .unwrap();

    /// Votes recorded by question kind
    pub static ref VOTES_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "pollbox_votes_recorded_total",
        "Total number of votes recorded",
        &["kind"]
    )
    .unwrap();

    /// Duplicate-vote attempts rejected
    pub static ref VOTE_CONFLICTS_TOTAL: IntCounter = register_int_counter!(
        "pollbox_vote_conflicts_total",
        "Total number of duplicate-vote attempts rejected"
    )
    .unwrap();
}

/// Render all registered metrics in the Prometheus text format
pub fn render() -> PollResult<String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| PollError::Internal(format!("Metrics encoding failed: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| PollError::Internal(format!("Metrics encoding produced invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
        VOTES_RECORDED_TOTAL.with_label_values(&["binary"]).inc();

        let output = render().unwrap();
        assert!(output.contains("pollbox_login_attempts_total"));
        assert!(output.contains("pollbox_votes_recorded_total"));
    }
}
