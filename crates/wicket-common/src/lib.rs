pub mod config;
pub mod error;
pub mod request;
pub mod snapshot;
pub mod telemetry;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use request::{AgentRequest, AgentResponse, Priority};
pub use snapshot::{LatencySummary, MetricsSnapshot, TokenTotals};
