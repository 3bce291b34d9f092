//! Environment-driven startup configuration.

use clap::Parser;
use std::path::PathBuf;

/// Configuration for the signing service, read from the environment (or
/// flags, for local runs). Parsed once at startup; [`Config::validate`]
/// must be called before the config is used to build the app.
#[derive(Parser, Debug, Clone)]
#[command(name = "signing-service")]
#[command(about = "Signing service facade: single-mode Ed25519 and threshold-mode MPC wallets")]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Number of parties a freshly-generated threshold wallet splits its
    /// key into.
    #[arg(long, env = "MPC_NODES", default_value_t = 3)]
    pub mpc_nodes: usize,

    /// Minimum number of parties required to sign.
    #[arg(long, env = "MPC_THRESHOLD", default_value_t = 2)]
    pub mpc_threshold: usize,

    /// Required on mutating routes (all `POST`s). No default: startup
    /// fails loudly rather than silently running an unauthenticated
    /// signing service.
    #[arg(long, env = "API_KEY")]
    pub api_key: Option<String>,

    /// Base directory for the filesystem-backed share store.
    #[arg(long, env = "SHARE_STORE_PATH", default_value = "./data/shares")]
    pub share_store_path: PathBuf,
}

impl Config {
    /// Enforce `2 <= threshold <= nodes` and that an API key is configured.
    /// Callers should log and exit non-zero on `Err`, not panic.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mpc_threshold < 2 {
            anyhow::bail!(
                "MPC_THRESHOLD must be at least 2, got {}",
                self.mpc_threshold
            );
        }
        if self.mpc_threshold > self.mpc_nodes {
            anyhow::bail!(
                "MPC_THRESHOLD ({}) must not exceed MPC_NODES ({})",
                self.mpc_threshold,
                self.mpc_nodes
            );
        }
        if self.api_key.is_none() {
            anyhow::bail!("API_KEY must be set; mutating routes require it");
        }
        Ok(())
    }
}
