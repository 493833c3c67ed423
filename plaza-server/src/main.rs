use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use plaza_server::collaborators::{Identity, JwtVerifier, StaticRoomDirectory};
use plaza_server::config::{Cli, Command, ServerConfig, TokenArgs};
use plaza_server::{ConnectionGateway, RoomRegistry, router};
use plaza_core::UserId;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Serve(config) => serve(config).await,
        Command::IssueToken(args) => issue_token(args),
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    config.validate()?;

    let directory = StaticRoomDirectory::load(&config.rooms_file)
        .with_context(|| format!("Failed to load rooms from {}", config.rooms_file.display()))?;
    info!("Loaded {} rooms from {}", directory.len(), config.rooms_file.display());

    let registry = Arc::new(RoomRegistry::new(config.reclaim));
    let gateway = ConnectionGateway::new(
        registry,
        Arc::new(JwtVerifier::new(&config.jwt_secret)),
        Arc::new(directory),
    );

    let app = router(gateway);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Presence server listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}

fn issue_token(args: TokenArgs) -> Result<()> {
    args.validate()?;

    let identity = Identity {
        username: args.name.clone().unwrap_or_else(|| args.user.clone()),
        user_id: UserId::from(args.user.clone()),
        avatar_url: args.avatar_url.clone(),
    };

    let token = JwtVerifier::new(&args.jwt_secret)
        .issue(&identity, Duration::from_secs(args.ttl_secs))
        .context("Failed to sign token")?;

    eprintln!(
        "{} {} ({}s)",
        "Token for".green().bold(),
        identity.user_id.to_string().cyan(),
        args.ttl_secs
    );
    println!("{}", token);
    Ok(())
}
