use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use wicket_common::{AgentRequest, AgentResponse, GatewayConfig, GatewayError, MetricsSnapshot};

use crate::executor::{AgentExecutor, ExecutionResult};
use crate::metrics::MetricsState;
use crate::parser;

/// What a caller's submission ultimately resolves to.
pub type SubmitResult = Result<AgentResponse, GatewayError>;

/// One admitted or waiting request: correlation id, payload, queue rank, and
/// the single-shot resolver that delivers the final response. The oneshot
/// sender is consumed on send, so double resolution is impossible by
/// construction.
struct QueuedItem {
    req_id: String,
    request: AgentRequest,
    rank: u8,
    enqueued_at: Instant,
    tx: oneshot::Sender<SubmitResult>,
}

/// Everything the scheduler mutates, behind one lock: the wait queue (kept
/// sorted by rank, FIFO within a rank), the running-child count, and all
/// metrics. No protected section blocks on I/O; the executor always runs
/// outside the lock.
struct Inner {
    active: usize,
    queue: Vec<QueuedItem>,
    metrics: MetricsState,
}

struct Shared {
    config: GatewayConfig,
    executor: Arc<dyn AgentExecutor>,
    inner: Mutex<Inner>,
}

/// Cheaply cloneable handle onto the shared scheduler state.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    pub fn new(config: GatewayConfig, executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                executor,
                inner: Mutex::new(Inner {
                    active: 0,
                    queue: Vec::new(),
                    metrics: MetricsState::default(),
                }),
            }),
        }
    }

    /// Admit, enqueue, or reject one request, then wait for its resolution.
    /// Every path resolves the caller exactly once.
    pub async fn submit(&self, request: AgentRequest) -> SubmitResult {
        let (tx, rx) = oneshot::channel();
        let rank = request.priority.rank();
        let shared = &self.shared;

        {
            let mut inner = shared.inner.lock().await;
            inner.metrics.total += 1;

            let item = QueuedItem {
                req_id: short_id(),
                request,
                rank,
                enqueued_at: Instant::now(),
                tx,
            };

            if inner.active < shared.config.max_concurrent {
                inner.active += 1;
                tracing::debug!(req_id=%item.req_id, active=inner.active, "dispatching immediately");
                spawn_dispatch(shared, item);
            } else if inner.queue.len() < shared.config.max_queue_depth {
                // FIFO within a rank: insert before the first strictly
                // lower-priority item.
                let pos = inner
                    .queue
                    .iter()
                    .position(|q| q.rank > item.rank)
                    .unwrap_or(inner.queue.len());
                tracing::debug!(req_id=%item.req_id, pos, depth=inner.queue.len() + 1, "enqueued");
                inner.queue.insert(pos, item);
            } else {
                let queued = inner.queue.len();
                inner.metrics.queue_rejected += 1;
                tracing::warn!(
                    req_id=%item.req_id,
                    queued,
                    max=shared.config.max_queue_depth,
                    "queue full, rejecting"
                );
                let _ = item.tx.send(Err(GatewayError::QueueFull {
                    queued,
                    max: shared.config.max_queue_depth,
                }));
            }

            // Every submit is a scheduler event: expired waiters get drained
            // even when this request bypassed or missed the queue.
            pump(shared, &mut inner);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Internal {
                detail: "request dropped without resolution".to_string(),
            }),
        }
    }

    /// Consistent point-in-time view across counters, gauges, and latency.
    pub async fn snapshot_metrics(&self) -> MetricsSnapshot {
        let inner = self.shared.inner.lock().await;
        inner.metrics.snapshot(inner.active, inner.queue.len())
    }

    pub async fn active(&self) -> usize {
        self.shared.inner.lock().await.active
    }

    pub async fn queued(&self) -> usize {
        self.shared.inner.lock().await.queue.len()
    }
}

fn spawn_dispatch(shared: &Arc<Shared>, item: QueuedItem) {
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        run_item(shared, item).await;
    });
}

/// Execute one admitted item to its terminal outcome, then free the slot and
/// pump the queue.
async fn run_item(shared: Arc<Shared>, item: QueuedItem) {
    let QueuedItem {
        req_id,
        request,
        tx,
        ..
    } = item;

    let timeout_ms = request
        .timeout_ms
        .unwrap_or(shared.config.default_timeout_ms);
    let max_turns = request.max_turns.unwrap_or(shared.config.default_max_turns);
    let args = build_args(&shared.config, &request, max_turns);

    let start = Instant::now();
    let exec = shared
        .executor
        .execute(&args, Duration::from_millis(timeout_ms))
        .await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let mut inner = shared.inner.lock().await;
    let result = match exec {
        Err(e) => {
            inner.metrics.failed += 1;
            tracing::error!(req_id=%req_id, error=%e, "dispatch failed");
            Err(GatewayError::Internal {
                detail: e.to_string(),
            })
        }
        Ok(run) if run.killed => {
            inner.metrics.timed_out += 1;
            tracing::warn!(req_id=%req_id, timeout_ms, elapsed_ms, "execution deadline hit");
            Err(GatewayError::ExecutionTimeout {
                limit_ms: timeout_ms,
            })
        }
        Ok(run) if run.exit_code != 0 => {
            inner.metrics.failed += 1;
            tracing::warn!(req_id=%req_id, exit_code=run.exit_code, elapsed_ms, "child failed");
            Err(GatewayError::ProcessFailure {
                detail: failure_detail(&run),
            })
        }
        Ok(run) => {
            let parsed = parser::parse_agent_output(&run.stdout);
            if parsed.max_turns_exhausted {
                inner.metrics.failed += 1;
                tracing::warn!(req_id=%req_id, max_turns, elapsed_ms, "max turns exhausted");
                Err(GatewayError::MaxTurnsExhausted { max_turns })
            } else {
                inner.metrics.record_completion(
                    elapsed_ms,
                    parsed.input_tokens.unwrap_or(0),
                    parsed.output_tokens.unwrap_or(0),
                );
                tracing::info!(req_id=%req_id, elapsed_ms, "completed");
                Ok(AgentResponse {
                    text: parsed.text,
                    model: parsed.model,
                    input_tokens: parsed.input_tokens,
                    output_tokens: parsed.output_tokens,
                    error: None,
                })
            }
        }
    };

    let _ = tx.send(result);
    inner.active -= 1;
    pump(&shared, &mut inner);
}

/// The dispatch loop: drain expired waiters, then fill free slots from the
/// queue front. Caller holds the lock.
fn pump(shared: &Arc<Shared>, inner: &mut Inner) {
    let limit = Duration::from_millis(shared.config.queue_timeout_ms);

    // Late drain, tail first so removal keeps earlier indices valid.
    for i in (0..inner.queue.len()).rev() {
        if inner.queue[i].enqueued_at.elapsed() > limit {
            let item = inner.queue.remove(i);
            inner.metrics.timed_out += 1;
            tracing::warn!(req_id=%item.req_id, "queue wait deadline exceeded");
            let _ = item.tx.send(Err(GatewayError::QueueTimeout {
                limit_ms: shared.config.queue_timeout_ms,
            }));
        }
    }

    while inner.active < shared.config.max_concurrent && !inner.queue.is_empty() {
        let item = inner.queue.remove(0);
        // Re-check the wait deadline; the item may have expired between the
        // drain above and this pop.
        if item.enqueued_at.elapsed() > limit {
            inner.metrics.timed_out += 1;
            tracing::warn!(req_id=%item.req_id, "queue wait deadline exceeded at pop");
            let _ = item.tx.send(Err(GatewayError::QueueTimeout {
                limit_ms: shared.config.queue_timeout_ms,
            }));
            continue;
        }
        inner.active += 1;
        tracing::debug!(req_id=%item.req_id, active=inner.active, "dispatching from queue");
        spawn_dispatch(shared, item);
    }
}

fn build_args(config: &GatewayConfig, request: &AgentRequest, max_turns: u32) -> Vec<String> {
    let mut args = vec![
        "-p".to_string(),
        request.prompt.clone(),
        "--output-format".to_string(),
        "json".to_string(),
        "--max-turns".to_string(),
        max_turns.to_string(),
        "--permission-mode".to_string(),
        config.permission_mode.clone(),
    ];
    if let Some(model) = request.model.as_deref().filter(|m| !m.is_empty()) {
        args.push("--model".to_string());
        args.push(model.to_string());
    }
    if let Some(system_prompt) = request.system_prompt.as_deref() {
        args.push("--system-prompt".to_string());
        args.push(system_prompt.to_string());
    }
    args
}

/// stderr truncated to 500 chars, or the exit code when stderr is empty.
fn failure_detail(run: &ExecutionResult) -> String {
    let stderr = run.stderr.trim();
    if stderr.is_empty() {
        format!("exit code {}", run.exit_code)
    } else {
        stderr.chars().take(500).collect()
    }
}

/// 8-hex-char correlation token.
fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
