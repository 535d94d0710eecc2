//! Deterministic chat client for local runs and tests.
//!
//! Generates scrum updates only for explicit commands and a fixed line
//! otherwise, so the whole conversation flow works without any model
//! vendor behind it. Shares a [`GenerationSequence`] with whichever
//! generator is wired next to it, keeping consecutive drafts distinct no
//! matter which entry point produced them.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;

use standup_types::chat::{ChatTurn, MessageRole};
use standup_types::error::ChatClientError;

use crate::chat::client::ChatClient;
use crate::scrum::format::format_draft;
use crate::scrum::generator::{CannedScrumGenerator, GenerationSequence, is_scrum_command};

/// Reply for anything that is not a scrum command.
const GENERIC_RESPONSE: &str = "I am dummy AI and can generate scrum updates on request.";

/// Streamed chunk size in characters.
const STREAM_CHUNK_CHARS: usize = 8;
/// Pause between streamed chunks, simulating token latency.
const STREAM_CHUNK_DELAY: Duration = Duration::from_millis(10);

pub struct DummyChatClient {
    generator: CannedScrumGenerator,
}

impl DummyChatClient {
    pub fn new(sequence: GenerationSequence) -> Self {
        Self {
            generator: CannedScrumGenerator::new(sequence),
        }
    }

    fn build_response(&self, conversation: &[ChatTurn]) -> String {
        let user_message = conversation
            .iter()
            .rev()
            .find(|turn| turn.role == MessageRole::User)
            .map(|turn| turn.content.as_str())
            .unwrap_or_default();

        if is_scrum_command(user_message) {
            format_draft(&self.generator.generate())
        } else {
            GENERIC_RESPONSE.to_string()
        }
    }
}

impl ChatClient for DummyChatClient {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn respond(&self, conversation: &[ChatTurn]) -> Result<String, ChatClientError> {
        Ok(self.build_response(conversation))
    }

    fn stream(
        &self,
        conversation: Vec<ChatTurn>,
    ) -> Pin<Box<dyn Stream<Item = Result<String, ChatClientError>> + Send + 'static>> {
        let response = self.build_response(&conversation);
        Box::pin(async_stream::stream! {
            let chars: Vec<char> = response.chars().collect();
            for chunk in chars.chunks(STREAM_CHUNK_CHARS) {
                tokio::time::sleep(STREAM_CHUNK_DELAY).await;
                yield Ok(chunk.iter().collect::<String>());
            }
        })
    }
}
