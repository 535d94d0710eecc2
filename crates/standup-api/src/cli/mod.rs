//! CLI definitions and command implementations.
//!
//! The binary doubles as the API server (`standup serve`) and a small
//! operator toolbelt: `link` stores an external-account linkage for local
//! development (the OAuth handshake normally does this), `sessions` lists
//! an account's sessions, `completions` emits shell completions.

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};

use standup_infra::sqlite::token::{FeedTokenUpsert, SqliteFeedTokenStore};

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "standup", about = "Scrum update assistant", version)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit machine-readable JSON where applicable
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the REST API server
    Serve {
        /// Bind address override (defaults to config.toml / 127.0.0.1:8080)
        #[arg(long)]
        bind: Option<String>,
        /// Export spans via OpenTelemetry (stdout exporter)
        #[arg(long)]
        otel: bool,
    },

    /// Store an external-account linkage for local development
    Link {
        /// Anonymous local user id (what the UI sends in X-Local-User)
        #[arg(long)]
        local_user: String,
        /// Externally authenticated account id
        #[arg(long)]
        account: String,
        /// Access token for the activity feed
        #[arg(long)]
        access_token: String,
        /// Refresh token (unused until a refresh flow exists)
        #[arg(long, default_value = "")]
        refresh_token: String,
        /// Cloud/site id the feed queries run against
        #[arg(long)]
        cloud_id: Option<String>,
        /// Access token lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        expires_in_secs: i64,
        /// Granted scope string
        #[arg(long, default_value = "read:jira-work")]
        scope: String,
    },

    /// List sessions for an account
    Sessions {
        /// Externally authenticated account id
        #[arg(long)]
        account: String,
    },

    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

/// `standup link` -- write or overwrite the token linkage row.
pub async fn link(
    state: &AppState,
    local_user: String,
    account: String,
    access_token: String,
    refresh_token: String,
    cloud_id: Option<String>,
    expires_in_secs: i64,
    scope: String,
    json: bool,
) -> anyhow::Result<()> {
    let store = SqliteFeedTokenStore::new(state.db_pool.clone());
    store
        .upsert_token(&FeedTokenUpsert {
            local_user_id: local_user.clone(),
            authenticated_user_id: account.clone(),
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            scope,
            cloud_id,
        })
        .await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "linked": true, "local_user": local_user, "account": account })
        );
    } else {
        println!("Linked local user '{local_user}' to account '{account}'");
    }
    Ok(())
}

/// `standup sessions` -- list an account's sessions, most recent first.
pub async fn sessions(state: &AppState, account: &str, json: bool) -> anyhow::Result<()> {
    let sessions = state.sessions().list_sessions(account).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions for account '{account}'");
        return Ok(());
    }

    for session in sessions {
        let date = session
            .scrum_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6}  {:<30}  scrum date: {:<12}  updated: {}",
            session.id,
            session.title,
            date,
            session.updated_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}
