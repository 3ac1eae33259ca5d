use std::env;

/// Flat runtime configuration, read once at startup and immutable after.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    /// Upper bound on concurrently running child processes.
    pub max_concurrent: usize,
    /// Upper bound on the wait queue; zero disables queueing entirely.
    pub max_queue_depth: usize,
    /// Soft deadline on how long an item may wait before dispatch.
    pub queue_timeout_ms: u64,
    pub default_max_turns: u32,
    pub default_timeout_ms: u64,
    /// Value passed to the CLI's `--permission-mode` flag.
    pub permission_mode: String,
    /// Binary launched per request; overridable for tests.
    pub cli_bin: String,
    /// Shared secret enforced by the HTTP boundary only.
    pub proxy_api_key: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 9100,
            max_concurrent: 5,
            max_queue_depth: 20,
            queue_timeout_ms: 60_000,
            default_max_turns: 2,
            default_timeout_ms: 180_000,
            permission_mode: "default".to_string(),
            cli_bin: "claude".to_string(),
            proxy_api_key: None,
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from the environment, starting from defaults.
    /// A variable that is set but unparsable is an error, not a silent
    /// fallback.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = parsed_var::<u16>("PORT")? {
            cfg.port = v;
        }
        if let Some(v) = parsed_var::<usize>("MAX_CONCURRENT")? {
            cfg.max_concurrent = v;
        }
        if let Some(v) = parsed_var::<usize>("MAX_QUEUE_DEPTH")? {
            cfg.max_queue_depth = v;
        }
        if let Some(v) = parsed_var::<u64>("QUEUE_TIMEOUT_MS")? {
            cfg.queue_timeout_ms = v;
        }
        if let Some(v) = parsed_var::<u32>("DEFAULT_MAX_TURNS")? {
            cfg.default_max_turns = v;
        }
        if let Some(v) = parsed_var::<u64>("DEFAULT_TIMEOUT_MS")? {
            cfg.default_timeout_ms = v;
        }
        if let Some(v) = string_var("PERMISSION_MODE") {
            cfg.permission_mode = v;
        }
        if let Some(v) = string_var("CLAUDE_BIN") {
            cfg.cli_bin = v;
        }
        cfg.proxy_api_key = string_var("PROXY_API_KEY");

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be in 1..=65535");
        }
        if self.max_concurrent == 0 {
            anyhow::bail!("MAX_CONCURRENT must be >= 1");
        }
        if self.queue_timeout_ms == 0 {
            anyhow::bail!("QUEUE_TIMEOUT_MS must be > 0");
        }
        if self.default_max_turns == 0 {
            anyhow::bail!("DEFAULT_MAX_TURNS must be >= 1");
        }
        if self.default_timeout_ms == 0 {
            anyhow::bail!("DEFAULT_TIMEOUT_MS must be > 0");
        }
        Ok(())
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> anyhow::Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => {
            let raw = raw.trim().to_string();
            raw.parse::<T>()
                .map(Some)
                .map_err(|_| anyhow::anyhow!("invalid {name}: {raw:?}"))
        }
        Err(_) => Ok(None),
    }
}

fn string_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
