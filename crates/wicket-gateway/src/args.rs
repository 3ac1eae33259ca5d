use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    /// Listen address; defaults to 0.0.0.0 on the configured PORT.
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Log output format: "text" or "json".
    #[arg(long, default_value = "text")]
    pub log_format: String,
}
