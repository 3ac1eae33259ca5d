use std::sync::Arc;

use wicket_common::GatewayConfig;
use wicket_core::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub config: Arc<GatewayConfig>,
}
