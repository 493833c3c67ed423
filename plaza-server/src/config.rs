use crate::room::ReclaimPolicy;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT secret must not be empty")]
    EmptySecret,
    #[error("token ttl must be positive")]
    ZeroTtl,
}

#[derive(Parser)]
#[command(name = "plaza-server", version, about = "Realtime presence server for shared 2D rooms")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the realtime server.
    Serve(ServerConfig),

    /// Print a signed token for local testing.
    IssueToken(TokenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    #[arg(long, env = "PLAZA_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    #[arg(long, env = "PLAZA_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// TOML file listing `[[rooms]]` with `id`, `width` and `height`.
    #[arg(long, env = "PLAZA_ROOMS_FILE", default_value = "rooms.toml")]
    pub rooms_file: PathBuf,

    #[arg(long, env = "PLAZA_RECLAIM", value_enum, default_value_t = ReclaimPolicy::ReapWhenEmpty)]
    pub reclaim: ReclaimPolicy,

    #[arg(long, env = "PLAZA_LOG", default_value = "plaza_server=info,tower_http=warn")]
    pub log_filter: String,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub avatar_url: Option<String>,

    #[arg(long, env = "PLAZA_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, default_value_t = 3600)]
    pub ttl_secs: u64,
}

impl TokenArgs {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        Ok(())
    }
}
