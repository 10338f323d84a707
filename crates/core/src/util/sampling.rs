//! Sampling decisions.
//!
//! `should_sample` is a straight random comparison; `consistent_sample`
//! hashes a stable identifier so a given user is consistently in or out at a
//! fixed rate.

use rand::Rng;
use xxhash_rust::xxh3::xxh3_64;

/// Random sampling decision for a rate in [0, 1].
pub fn should_sample(rate: f64) -> bool {
    if rate >= 1.0 {
        return true;
    }
    if rate <= 0.0 {
        return false;
    }
    rand::rng().random::<f64>() < rate
}

/// Deterministic sampling decision: the same `user_id` always lands on the
/// same side of the rate.
pub fn consistent_sample(user_id: &str, rate: f64) -> bool {
    if rate >= 1.0 {
        return true;
    }
    if rate <= 0.0 {
        return false;
    }
    let bucket = xxh3_64(user_id.as_bytes()) % 100;
    (bucket as f64) < rate * 100.0
}
