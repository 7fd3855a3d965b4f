//! Failed-login lockout tracking.
//!
//! Tracks failed authentication attempts per (client address, email) pair
//! entirely in process memory: 5 failures within the attempt window lock the
//! pair out for 15 minutes. Records are cleared on successful login and swept
//! periodically so the map cannot grow without bound.
//!
//! This state is best-effort: it resets on process restart and is not shared
//! across instances. A multi-instance deployment needs a shared store for a
//! hard guarantee.

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Maximum failed attempts before lockout
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Lockout duration (milliseconds): 15 minutes
pub const LOCKOUT_DURATION_MS: i64 = 15 * 60 * 1000;

/// Window within which failures accumulate (milliseconds): 15 minutes
pub const ATTEMPT_WINDOW_MS: i64 = 15 * 60 * 1000;

/// Maximum tracked records; throttling is best-effort beyond this
pub const MAX_RECORDS: usize = 10_000;

/// Sweep interval (seconds) for the background cleanup job
pub const SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
struct FailureRecord {
    count: u32,
    first_attempt: i64,
    locked_until: Option<i64>,
}

/// Result of a lockout check
#[derive(Debug, Clone, Copy)]
pub struct LockoutStatus {
    pub locked: bool,
    pub remaining_ms: i64,
}

/// Process-scoped tracker of failed login attempts.
///
/// One instance lives on the application context and is injected into the
/// login flow; it is not a module-level global. All mutation goes through
/// the internal mutex.
pub struct LockoutTracker {
    records: Mutex<HashMap<String, FailureRecord>>,
}

fn record_key(addr: &str, email: &str) -> String {
    format!("{}|{}", addr, email.trim().to_lowercase())
}

impl LockoutTracker {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether this (address, email) pair is currently locked out.
    ///
    /// A lock whose window has elapsed transitions the pair back to clear
    /// and the record is removed.
    pub fn check(&self, addr: &str, email: &str) -> LockoutStatus {
        let now = chrono::Utc::now().timestamp_millis();
        let key = record_key(addr, email);
        let mut records = self.records.lock().unwrap();

        if let Some(record) = records.get(&key) {
            if let Some(locked_until) = record.locked_until {
                if locked_until > now {
                    return LockoutStatus {
                        locked: true,
                        remaining_ms: locked_until - now,
                    };
                }
                // Lock window has elapsed
                records.remove(&key);
            }
        }

        LockoutStatus {
            locked: false,
            remaining_ms: 0,
        }
    }

    /// Record a failed login attempt. Crossing the threshold sets the lock.
    pub fn record_failure(&self, addr: &str, email: &str) {
        let now = chrono::Utc::now().timestamp_millis();
        let key = record_key(addr, email);
        let mut records = self.records.lock().unwrap();

        if let Some(record) = records.get_mut(&key) {
            if now - record.first_attempt > ATTEMPT_WINDOW_MS && record.locked_until.is_none() {
                // Window has elapsed without a lock; start counting fresh
                record.count = 1;
                record.first_attempt = now;
            } else {
                record.count += 1;
                if record.count >= MAX_FAILED_ATTEMPTS && record.locked_until.is_none() {
                    record.locked_until = Some(now + LOCKOUT_DURATION_MS);
                    warn!(addr, email, "login lockout engaged after {} failures", record.count);
                }
            }
            return;
        }

        if records.len() >= MAX_RECORDS {
            warn!(
                "lockout tracker at capacity ({}), not tracking new key",
                MAX_RECORDS
            );
            return;
        }

        records.insert(
            key,
            FailureRecord {
                count: 1,
                first_attempt: now,
                locked_until: None,
            },
        );
    }

    /// Remove the record for this pair; called on successful login.
    pub fn clear(&self, addr: &str, email: &str) {
        let key = record_key(addr, email);
        self.records.lock().unwrap().remove(&key);
    }

    /// Remove records whose lock window or attempt window has elapsed.
    /// Returns the number of records removed.
    pub fn sweep_expired(&self) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let mut records = self.records.lock().unwrap();
        let before = records.len();

        records.retain(|_, record| {
            if let Some(locked_until) = record.locked_until {
                return locked_until > now;
            }
            now - record.first_attempt <= ATTEMPT_WINDOW_MS
        });

        before - records.len()
    }

    /// Number of live records (for monitoring)
    pub fn active_records(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl Default for LockoutTracker {
    fn default() -> Self {
        Self::new()
    }
}
