//! Day/hour activity heatmap derived from the cached transactions.

use chrono::DateTime;
use scry_core::TxSummary;
use std::collections::BTreeMap;

/// Transaction count per UTC hour, keyed `YYYY-MM-DD-HH`.
pub type Heatmap = BTreeMap<String, u64>;

/// Bucket key for a unix timestamp, `None` for out-of-range values.
pub fn bucket_key(timestamp: u64) -> Option<String> {
    let ts = i64::try_from(timestamp).ok()?;
    DateTime::from_timestamp(ts, 0).map(|dt| dt.format("%Y-%m-%d-%H").to_string())
}

/// Accumulates transaction counts per UTC hour bucket.
pub fn build_heatmap(transactions: &[TxSummary]) -> Heatmap {
    let mut buckets = Heatmap::new();
    for tx in transactions {
        if let Some(key) = bucket_key(tx.timestamp) {
            *buckets.entry(key).or_default() += 1;
        }
    }
    buckets
}

/// Reduces hour buckets to per-day totals, keyed `YYYY-MM-DD`.
pub fn daily_totals(heatmap: &Heatmap) -> BTreeMap<String, u64> {
    let mut days = BTreeMap::new();
    for (key, count) in heatmap {
        *days.entry(key[..10].to_string()).or_default() += count;
    }
    days
}
