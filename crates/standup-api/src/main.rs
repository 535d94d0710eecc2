//! Standup CLI and REST API entry point.
//!
//! Binary name: `standup`
//!
//! Parses CLI arguments, initializes the database and services, then
//! dispatches to the appropriate command handler or starts the REST API
//! server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "standup", &mut std::io::stdout());
        return Ok(());
    }

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,standup=debug",
        _ => "trace",
    };

    match cli.command {
        Commands::Serve { bind, otel } => {
            // The server path uses the observe stack (fmt + optional OTel
            // export); RUST_LOG wins when set, verbosity otherwise.
            standup_observe::tracing_setup::init_tracing(otel, filter)
                .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

            let state = AppState::init().await?;
            let bind_addr = bind.unwrap_or_else(|| state.config.bind_addr.clone());

            let router = http::router::build_router(state);
            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            tracing::info!(%bind_addr, "Standup API listening");
            axum::serve(listener, router).await?;

            standup_observe::tracing_setup::shutdown_tracing();
        }

        Commands::Link {
            local_user,
            account,
            access_token,
            refresh_token,
            cloud_id,
            expires_in_secs,
            scope,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(filter))
                .with_target(false)
                .init();
            let state = AppState::init().await?;
            cli::link(
                &state,
                local_user,
                account,
                access_token,
                refresh_token,
                cloud_id,
                expires_in_secs,
                scope,
                cli.json,
            )
            .await?;
        }

        Commands::Sessions { account } => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(filter))
                .with_target(false)
                .init();
            let state = AppState::init().await?;
            cli::sessions(&state, &account, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
