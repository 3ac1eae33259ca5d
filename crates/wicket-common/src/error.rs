/// Terminal failure kinds surfaced by the core. Every failure is a value
/// delivered through the item's resolver; the scheduler never panics toward
/// a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Admission rejected: the wait queue is at capacity.
    QueueFull { queued: usize, max: usize },
    /// The item waited past the queue deadline before it could dispatch.
    QueueTimeout { limit_ms: u64 },
    /// The child process outlived its execution deadline and was killed.
    ExecutionTimeout { limit_ms: u64 },
    /// The child exited non-zero.
    ProcessFailure { detail: String },
    /// The CLI hit its agentic turn limit without producing a final answer.
    MaxTurnsExhausted { max_turns: u32 },
    /// Anything else that broke inside dispatch.
    Internal { detail: String },
}

impl GatewayError {
    /// Status code the HTTP boundary maps this kind to.
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::QueueFull { .. } => 503,
            GatewayError::QueueTimeout { .. } => 408,
            GatewayError::ExecutionTimeout { .. } => 504,
            GatewayError::ProcessFailure { .. } => 502,
            GatewayError::MaxTurnsExhausted { .. } => 422,
            GatewayError::Internal { .. } => 500,
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::QueueFull { queued, max } => {
                write!(f, "Queue full ({queued}/{max})")
            }
            GatewayError::QueueTimeout { limit_ms } => {
                write!(f, "Queued for too long (>{limit_ms}ms)")
            }
            GatewayError::ExecutionTimeout { limit_ms } => {
                write!(f, "Request timed out after {}s", limit_ms / 1000)
            }
            GatewayError::ProcessFailure { detail } => write!(f, "{detail}"),
            GatewayError::MaxTurnsExhausted { max_turns } => {
                write!(
                    f,
                    "Reached max turns ({max_turns}). Increase maxTurns for complex requests."
                )
            }
            GatewayError::Internal { detail } => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for GatewayError {}
