//! ChatClient trait definition.
//!
//! The opaque capability that turns a conversation into assistant text.
//! Uses native async fn in traits (RPITIT) for `respond`, and
//! `Pin<Box<dyn Stream>>` for `stream` (streams need to be object-safe
//! for dynamic wiring).

use std::pin::Pin;

use futures_util::Stream;

use standup_types::chat::ChatTurn;
use standup_types::error::ChatClientError;

/// Trait for chat capability backends.
///
/// The core does not care which vendor (if any) backs an implementation,
/// only that it returns or streams plain text attributable to the
/// assistant role.
pub trait ChatClient: Send + Sync {
    /// Human-readable client name (e.g., "dummy").
    fn name(&self) -> &str;

    /// Produce the full assistant reply for the conversation so far.
    fn respond(
        &self,
        conversation: &[ChatTurn],
    ) -> impl std::future::Future<Output = Result<String, ChatClientError>> + Send;

    /// Produce the assistant reply as incremental text chunks.
    ///
    /// Returns a boxed stream (not RPITIT) so implementations stay
    /// object-safe behind `dyn`-style wiring.
    fn stream(
        &self,
        conversation: Vec<ChatTurn>,
    ) -> Pin<Box<dyn Stream<Item = Result<String, ChatClientError>> + Send + 'static>>;
}
