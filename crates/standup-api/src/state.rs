//! Application state wiring all services together.
//!
//! AppState holds the concrete orchestrator used by both CLI and REST
//! API. Core components are generic over their traits; AppState pins them
//! to the concrete infra implementations and picks the configured scrum
//! generation strategy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use standup_core::chat::dummy::DummyChatClient;
use standup_core::chat::orchestrator::ChatOrchestrator;
use standup_core::scrum::generator::{
    CannedScrumGenerator, FeedScrumGenerator, GenerationSequence, ScrumUpdateGenerator,
};
use standup_core::session::service::SessionService;
use standup_infra::config::{load_global_config, resolve_data_dir};
use standup_infra::jira::client::JiraActivityFeed;
use standup_infra::sqlite::pool::DatabasePool;
use standup_infra::sqlite::session::SqliteSessionRepository;
use standup_types::config::GlobalConfig;
use standup_types::scrum::ScrumDraft;

/// The configured scrum generation strategy.
///
/// Both variants satisfy [`ScrumUpdateGenerator`]; which one runs is a
/// config decision, not a code path difference visible to the
/// orchestrator.
pub enum AppGenerator {
    Canned(CannedScrumGenerator),
    Feed(FeedScrumGenerator<JiraActivityFeed>),
}

impl ScrumUpdateGenerator for AppGenerator {
    async fn draft_for_message(&self, user_id: &str, user_message: &str) -> Option<ScrumDraft> {
        match self {
            AppGenerator::Canned(generator) => generator.draft_for_message(user_id, user_message).await,
            AppGenerator::Feed(generator) => generator.draft_for_message(user_id, user_message).await,
        }
    }
}

pub type ConcreteSessionService = SessionService<SqliteSessionRepository>;
pub type ConcreteOrchestrator =
    ChatOrchestrator<DummyChatClient, AppGenerator, SqliteSessionRepository>;

/// Shared application state used by CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub db_pool: DatabasePool,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire the orchestrator.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("standup.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        // One sequence shared by the dummy chat client and the canned
        // generator, so consecutive drafts stay distinct regardless of
        // which path produced them.
        let sequence = GenerationSequence::new();

        let generator = match config.scrum.generator.as_str() {
            "feed" => AppGenerator::Feed(FeedScrumGenerator::new(JiraActivityFeed::new(
                db_pool.clone(),
                config.feed.base_url.clone(),
                Duration::from_secs(config.feed.timeout_secs),
            ))),
            _ => AppGenerator::Canned(CannedScrumGenerator::new(sequence.clone())),
        };

        let sessions = SessionService::new(SqliteSessionRepository::new(db_pool.clone()));
        let orchestrator = Arc::new(ChatOrchestrator::new(
            DummyChatClient::new(sequence),
            generator,
            sessions,
        ));

        Ok(Self {
            orchestrator,
            db_pool,
            config,
            data_dir,
        })
    }

    /// The session service behind the orchestrator.
    pub fn sessions(&self) -> &ConcreteSessionService {
        self.orchestrator.sessions()
    }
}
