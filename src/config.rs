use std::path::PathBuf;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Host settings shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct HostConfig {
    /// World-state file read before the call and rewritten after a successful write
    #[arg(long, env = "BOAT_STATE", default_value = "world_state.json", global = true)]
    pub state: PathBuf,

    /// Log filter in tracing env-filter syntax; RUST_LOG takes precedence
    #[arg(long, env = "BOAT_LOG", default_value = "warn", global = true)]
    pub log: String,
}

impl HostConfig {
    /// Logs go to stderr so stdout carries only JSON results.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log))
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
