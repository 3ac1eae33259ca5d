use serde::{Deserialize, Serialize};

/// Point-in-time metrics view. Every field is read under the scheduler lock,
/// so counters, gauges, token sums, and the latency summary are mutually
/// consistent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub queue_rejected: u64,
    /// Child processes currently running.
    pub active: u64,
    /// Items currently waiting for a slot.
    pub queued: u64,
    pub tokens: TokenTotals,
    pub latency: LatencySummary,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
}

/// Summary over the bounded latency window. The p95 index is
/// `floor(n * 0.95)`, which degenerates for tiny windows (n=1 reports the
/// only sample); treat p95 as meaningful only once the window holds a few
/// dozen observations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySummary {
    pub avg_ms: u64,
    pub p95_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}
