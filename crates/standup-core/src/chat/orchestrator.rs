//! One-conversation-turn orchestration.
//!
//! Ties the generator, the chat capability, and the session store
//! together: classify the user text, produce the assistant reply, detect
//! whether the exchange produced a scrum update, and hand persistence to
//! the session service. The caller owns the visible transcript and passes
//! it in whole; the orchestrator never keeps conversation state.

use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tracing::{debug, info, warn};

use standup_types::chat::{ChatTurn, MessageRole};
use standup_types::error::RepositoryError;
use standup_types::scrum::{MessageMetadata, ScrumDraft};
use standup_types::session::{NewMessage, Session};

use crate::chat::client::ChatClient;
use crate::scrum::format::{format_draft, parse_draft};
use crate::scrum::generator::ScrumUpdateGenerator;
use crate::session::service::SessionService;
use crate::session::store::SessionRepository;

/// Assistant text when the chat capability is unreachable. Upstream loss
/// degrades the turn; it never fails the request.
const UNAVAILABLE_RESPONSE: &str =
    "The assistant is unavailable right now. Please try again shortly.";

/// What one orchestrated turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    pub assistant_text: String,
    /// The scrum draft this exchange produced, if any.
    pub draft: Option<ScrumDraft>,
    /// The scrum session the transcript was persisted into, if a draft
    /// resulted. Free-form appends do not populate this.
    pub session: Option<Session>,
}

/// Incremental events from the streaming turn variant.
#[derive(Debug)]
pub enum TurnEvent {
    /// A chunk of assistant text.
    Delta(String),
    /// The turn finished; persistence (if any) already happened.
    Completed(TurnOutcome),
    /// The turn failed mid-stream; nothing was persisted.
    Failed(String),
}

pub struct ChatOrchestrator<C, G, R>
where
    C: ChatClient,
    G: ScrumUpdateGenerator,
    R: SessionRepository,
{
    client: C,
    generator: G,
    sessions: SessionService<R>,
}

impl<C, G, R> ChatOrchestrator<C, G, R>
where
    C: ChatClient + 'static,
    G: ScrumUpdateGenerator + 'static,
    R: SessionRepository + 'static,
{
    pub fn new(client: C, generator: G, sessions: SessionService<R>) -> Self {
        Self {
            client,
            generator,
            sessions,
        }
    }

    /// The session service this orchestrator persists through.
    pub fn sessions(&self) -> &SessionService<R> {
        &self.sessions
    }

    /// Run one conversation turn.
    ///
    /// `transcript` is the visible conversation before this turn;
    /// `session_id` is the session the UI currently has open, if any.
    pub async fn run_turn(
        &self,
        user_id: &str,
        transcript: &[ChatTurn],
        session_id: Option<i64>,
        user_text: &str,
    ) -> Result<TurnOutcome, RepositoryError> {
        // The generator classifies first; when it produces a draft the
        // formatted block is the assistant turn and carries structured
        // metadata, so the legacy parser never runs.
        if let Some(draft) = self.generator.draft_for_message(user_id, user_text).await {
            let assistant_text = format_draft(&draft);
            let session = self
                .persist_scrum_turn(user_id, transcript, user_text, &assistant_text, &draft)
                .await?;
            return Ok(TurnOutcome {
                assistant_text,
                draft: Some(draft),
                session: Some(session),
            });
        }

        let mut conversation = transcript.to_vec();
        conversation.push(ChatTurn::user(user_text));

        let assistant_text = match self.client.respond(&conversation).await {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, "Chat capability unavailable, degrading turn");
                return Ok(TurnOutcome {
                    assistant_text: UNAVAILABLE_RESPONSE.to_string(),
                    draft: None,
                    session: None,
                });
            }
        };

        // Legacy detection: the capability itself may have produced the
        // canonical block. Ordinary replies parse to None routinely.
        if let Some(draft) = parse_draft(&assistant_text) {
            let session = self
                .persist_scrum_turn(user_id, transcript, user_text, &assistant_text, &draft)
                .await?;
            return Ok(TurnOutcome {
                assistant_text,
                draft: Some(draft),
                session: Some(session),
            });
        }
        debug!("Turn produced no scrum draft");

        if let Some(session_id) = session_id {
            self.sessions
                .append_message(user_id, session_id, &NewMessage::new(MessageRole::User, user_text))
                .await?;
            self.sessions
                .append_message(
                    user_id,
                    session_id,
                    &NewMessage::new(MessageRole::Assistant, assistant_text.clone()),
                )
                .await?;
        }

        Ok(TurnOutcome {
            assistant_text,
            draft: None,
            session: None,
        })
    }

    /// Streaming variant of [`run_turn`]: assistant text arrives as
    /// chunks, persistence happens once the text is complete.
    pub fn stream_turn(
        self: Arc<Self>,
        user_id: String,
        transcript: Vec<ChatTurn>,
        session_id: Option<i64>,
        user_text: String,
    ) -> Pin<Box<dyn Stream<Item = TurnEvent> + Send + 'static>> {
        Box::pin(async_stream::stream! {
            if let Some(draft) = self.generator.draft_for_message(&user_id, &user_text).await {
                let assistant_text = format_draft(&draft);
                for chunk in chunk_text(&assistant_text) {
                    yield TurnEvent::Delta(chunk);
                }
                match self
                    .persist_scrum_turn(&user_id, &transcript, &user_text, &assistant_text, &draft)
                    .await
                {
                    Ok(session) => yield TurnEvent::Completed(TurnOutcome {
                        assistant_text,
                        draft: Some(draft),
                        session: Some(session),
                    }),
                    Err(err) => yield TurnEvent::Failed(err.to_string()),
                }
                return;
            }

            let mut conversation = transcript.clone();
            conversation.push(ChatTurn::user(user_text.clone()));

            let mut assistant_text = String::new();
            let mut upstream = self.client.stream(conversation);
            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(text) => {
                        assistant_text.push_str(&text);
                        yield TurnEvent::Delta(text);
                    }
                    Err(err) => {
                        warn!(%err, "Chat stream failed mid-turn");
                        yield TurnEvent::Failed(err.to_string());
                        return;
                    }
                }
            }

            let outcome = self
                .finish_streamed_turn(&user_id, &transcript, session_id, &user_text, assistant_text)
                .await;
            match outcome {
                Ok(outcome) => yield TurnEvent::Completed(outcome),
                Err(err) => yield TurnEvent::Failed(err.to_string()),
            }
        })
    }

    async fn finish_streamed_turn(
        &self,
        user_id: &str,
        transcript: &[ChatTurn],
        session_id: Option<i64>,
        user_text: &str,
        assistant_text: String,
    ) -> Result<TurnOutcome, RepositoryError> {
        if let Some(draft) = parse_draft(&assistant_text) {
            let session = self
                .persist_scrum_turn(user_id, transcript, user_text, &assistant_text, &draft)
                .await?;
            return Ok(TurnOutcome {
                assistant_text,
                draft: Some(draft),
                session: Some(session),
            });
        }

        if let Some(session_id) = session_id {
            self.sessions
                .append_message(user_id, session_id, &NewMessage::new(MessageRole::User, user_text))
                .await?;
            self.sessions
                .append_message(
                    user_id,
                    session_id,
                    &NewMessage::new(MessageRole::Assistant, assistant_text.clone()),
                )
                .await?;
        }

        Ok(TurnOutcome {
            assistant_text,
            draft: None,
            session: None,
        })
    }

    /// Select the scrum session for the draft's date and resync the whole
    /// visible transcript into it, tagging the assistant turn that
    /// carried the draft.
    async fn persist_scrum_turn(
        &self,
        user_id: &str,
        transcript: &[ChatTurn],
        user_text: &str,
        assistant_text: &str,
        draft: &ScrumDraft,
    ) -> Result<Session, RepositoryError> {
        let session = self
            .sessions
            .get_or_create_session_for_scrum_update(user_id, draft)
            .await?;

        let mut messages: Vec<NewMessage> = transcript
            .iter()
            .filter(|turn| matches!(turn.role, MessageRole::User | MessageRole::Assistant))
            .map(|turn| NewMessage::new(turn.role, turn.content.clone()))
            .collect();
        messages.push(NewMessage::new(MessageRole::User, user_text));
        messages.push(
            NewMessage::new(MessageRole::Assistant, assistant_text).with_metadata(
                MessageMetadata::ScrumGeneration {
                    scrum_update: draft.clone(),
                    captured_at: Utc::now(),
                },
            ),
        );

        self.sessions
            .replace_messages(user_id, session.id, messages)
            .await?;
        info!(session_id = session.id, scrum_date = %draft.scrum_date, "Scrum turn persisted");
        Ok(session)
    }
}

/// Fixed-size character chunks for streaming pre-rendered text.
fn chunk_text(text: &str) -> Vec<String> {
    text.chars()
        .collect::<Vec<char>>()
        .chunks(16)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
