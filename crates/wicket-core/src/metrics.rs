use std::collections::VecDeque;

use wicket_common::{LatencySummary, MetricsSnapshot, TokenTotals};

/// Bound on the latency window; the oldest sample is evicted past this.
const LATENCY_WINDOW: usize = 1000;

/// Cumulative counters, token sums, and the bounded latency window. Lives
/// inside the scheduler's mutex so every snapshot is consistent across all
/// fields.
#[derive(Debug, Default)]
pub struct MetricsState {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub queue_rejected: u64,
    input_tokens: u64,
    output_tokens: u64,
    latencies: VecDeque<u64>,
}

impl MetricsState {
    /// Record one successful request: latency sample plus token sums.
    pub fn record_completion(&mut self, elapsed_ms: u64, input_tokens: u64, output_tokens: u64) {
        self.completed += 1;

        self.latencies.push_back(elapsed_ms);
        if self.latencies.len() > LATENCY_WINDOW {
            self.latencies.pop_front();
        }

        if input_tokens > 0 {
            self.input_tokens += input_tokens;
        }
        if output_tokens > 0 {
            self.output_tokens += output_tokens;
        }
    }

    pub fn snapshot(&self, active: usize, queued: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            total: self.total,
            completed: self.completed,
            failed: self.failed,
            timed_out: self.timed_out,
            queue_rejected: self.queue_rejected,
            active: active as u64,
            queued: queued as u64,
            tokens: TokenTotals {
                input: self.input_tokens,
                output: self.output_tokens,
            },
            latency: latency_summary(&self.latencies),
        }
    }
}

fn latency_summary(window: &VecDeque<u64>) -> LatencySummary {
    if window.is_empty() {
        return LatencySummary::default();
    }

    let mut sorted: Vec<u64> = window.iter().copied().collect();
    sorted.sort_unstable();

    let n = sorted.len();
    let sum: u64 = sorted.iter().sum();
    let p95_idx = ((n as f64) * 0.95).floor() as usize;

    LatencySummary {
        avg_ms: ((sum as f64) / (n as f64)).round() as u64,
        p95_ms: sorted[p95_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}
