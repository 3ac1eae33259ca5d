use serde::{Deserialize, Serialize};

/// Dispatch priority. Lower rank dispatches first; equal ranks keep FIFO
/// order within the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Numeric rank used for queue ordering (1 = highest priority).
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

/// One caller's request as accepted by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    /// Required; the boundary rejects blank prompts before they reach the
    /// scheduler.
    #[serde(default)]
    pub prompt: String,

    /// Short model tag (`opus`|`sonnet`|`haiku`); absent or empty means the
    /// CLI's own default.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Agentic turn budget; falls back to the configured default.
    #[serde(default)]
    pub max_turns: Option<u32>,

    /// Per-request execution deadline; falls back to the configured default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub priority: Priority,
}

/// Final response delivered to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
