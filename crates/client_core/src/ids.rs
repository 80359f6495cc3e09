//! Client-side identifiers: workspace ids, report ids and error entry keys.
//!
//! Uniqueness is probabilistic only; ids are drawn from the random bits of a
//! v4 UUID and nothing checks them against the server.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use shared::domain::{PolicyId, ReportActionId, ReportId};
use uuid::Uuid;

/// Folds the 128 UUID bits into 64 so the fixed version and variant bits
/// are mixed with random ones.
fn random_u64() -> u64 {
    let bits = Uuid::new_v4().as_u128();
    ((bits >> 64) as u64) ^ (bits as u64)
}

/// 16 uppercase hexadecimal characters.
pub fn generate_policy_id() -> PolicyId {
    PolicyId::new(format!("{:016X}", random_u64()))
}

/// Positive id that stays within the 53-bit integer range JSON clients keep
/// exact.
pub fn generate_report_id() -> ReportId {
    ReportId(((random_u64() >> 11) as i64).max(1))
}

pub fn generate_report_action_id() -> ReportActionId {
    ReportActionId(((random_u64() >> 11) as i64).max(1))
}

/// Microsecond timestamps used as error entry keys.
///
/// Keys are strictly increasing per clock, so two failures recorded within
/// the same microsecond still land under distinct keys.
#[derive(Debug, Default)]
pub struct ErrorKeyClock {
    last: AtomicI64,
}

impl ErrorKeyClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&self) -> String {
        let now = Utc::now().timestamp_micros();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(previous + 1);
            match self
                .last
                .compare_exchange_weak(previous, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next.to_string(),
                Err(actual) => previous = actual,
            }
        }
    }
}
