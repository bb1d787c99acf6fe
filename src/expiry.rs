//! # Expiry Sweeper
//!
//! A recurring task that reclaims memory by deleting keys whose time-to-live has elapsed,
//! independently of any client reading them. Runs on its own `tokio` task and touches only the
//! store, using the same lock discipline as ordinary commands.

use crate::storage::Store;
use crate::types::{SharedKeyspace, Value};
use log::trace;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::time::{Duration, Instant};

/// Maximum number of keys sampled per tick.
pub const SAMPLE_SIZE: usize = crate::constants::SWEEP_SAMPLE_SIZE;
/// If more than this fraction of a sample was expired, the sweeper repeats immediately.
pub const REPEAT_THRESHOLD: f64 = crate::constants::SWEEP_REPEAT_THRESHOLD;

struct SweepOutcome {
    sampled: usize,
    expired: usize,
}

/// Runs the sweeper forever. Meant to be spawned as a long-running `tokio` task alongside the
/// server's accept loop.
pub async fn sweep_loop(store: Store, interval: Duration) {
    loop {
        let outcome = sweep_tick(&store.shared_keyspace());
        if outcome.sampled == 0 {
            tokio::time::sleep(interval).await;
            continue;
        }

        trace!(
            "sweeper: sampled {} key(s), {} expired",
            outcome.sampled,
            outcome.expired
        );

        let ratio = outcome.expired as f64 / outcome.sampled as f64;
        if ratio > REPEAT_THRESHOLD {
            // Adaptively accelerate cleanup under high expiry pressure: no sleep, go again.
            continue;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Performs one sweep tick: samples up to [`SAMPLE_SIZE`] keys with a live TTL and deletes any
/// that have expired. Acquires the keyspace write lock once for the whole tick, so it never
/// races a command's own lazy-expiry check.
fn sweep_tick(keyspace: &SharedKeyspace) -> SweepOutcome {
    let mut map = keyspace.write().expect("keyspace lock poisoned");

    let candidates: Vec<String> = map
        .iter()
        .filter_map(|(key, value)| match value {
            Value::StringValue { expiry: Some(_), .. } => Some(key.clone()),
            _ => None,
        })
        .collect();

    if candidates.is_empty() {
        return SweepOutcome { sampled: 0, expired: 0 };
    }

    let mut rng = thread_rng();
    let sample: Vec<&String> = candidates.choose_multiple(&mut rng, SAMPLE_SIZE).collect();

    let now = Instant::now();
    let mut expired = 0usize;
    for key in &sample {
        let is_expired = matches!(
            map.get(key.as_str()),
            Some(Value::StringValue { expiry: Some(at), .. }) if *at <= now
        );
        if is_expired {
            map.remove(key.as_str());
            expired += 1;
        }
    }

    SweepOutcome {
        sampled: sample.len(),
        expired,
    }
}
