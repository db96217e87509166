//! Chat session management: the conversation plus the state of the input box.

mod builder;
mod reply;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

pub use builder::{compose_user_parts, RequestBuilder};
pub use reply::{reply, Reply, EMPTY_RESPONSE_APOLOGY};

use crate::{
    attachment::{Attachment, AttachmentPolicy, AttachmentSlot, Preview, PreviewTracker},
    client::ContentGenerator,
    config::ChatConfig,
    conversation::{Conversation, Message},
    error::ChatError,
};

/// Marks that a request is in flight.
///
/// Clones share the same flag, so other parts of the UI can observe it.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// Returns `true` while a request is in flight.
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag, or returns `None` if it is already set.
    pub fn acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(self.clone()))
    }
}

/// Clears the [`BusyFlag`] when dropped.
#[derive(Debug)]
pub struct BusyGuard(BusyFlag);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::SeqCst);
    }
}

/// What happened to a send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing to send: no text and no attachment.
    Ignored,
    /// A previous request is still in flight.
    Busy,
    /// The turn was sent and the model's reply appended.
    Replied(Reply),
}

/// A chat session with the Gemini AI model.
#[derive(Debug)]
pub struct ChatSession<G> {
    generator: G,
    builder: RequestBuilder,
    policy: AttachmentPolicy,
    conversation: Conversation,
    attachment: AttachmentSlot,
    busy: BusyFlag,
    error: Option<String>,
}

impl<G: ContentGenerator> ChatSession<G> {
    /// Creates a session answering through `generator`.
    pub fn new(generator: G, config: &ChatConfig) -> Self {
        Self::with_parts(
            generator,
            RequestBuilder::from_config(config),
            config.attachment_policy(),
        )
    }

    /// Creates a session from an explicit request builder and attachment policy.
    pub fn with_parts(generator: G, builder: RequestBuilder, policy: AttachmentPolicy) -> Self {
        Self {
            generator,
            builder,
            policy,
            conversation: Conversation::default(),
            attachment: AttachmentSlot::new(PreviewTracker::new()),
            busy: BusyFlag::default(),
            error: None,
        }
    }

    /// Replaces the starting conversation.
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = conversation;
        self
    }

    /// Reads an image file and makes it the pending attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or violates the attachment
    /// policy; the previous attachment, if any, is kept in that case.
    pub async fn attach_file(&mut self, path: impl AsRef<Path>) -> Result<&Preview, ChatError> {
        let attachment = Attachment::from_path(path, &self.policy).await?;
        Ok(self.attach(attachment))
    }

    /// Makes `attachment` the pending attachment, replacing any previous one.
    pub fn attach(&mut self, attachment: Attachment) -> &Preview {
        info!(name = attachment.name(), "attached image");
        self.attachment.attach(attachment)
    }

    /// Drops the pending attachment. Returns `true` if there was one.
    pub fn remove_attachment(&mut self) -> bool {
        self.attachment.remove()
    }

    /// Returns `true` if `text` (with the pending attachment) would be sent.
    pub fn can_send(&self, text: &str) -> bool {
        !self.busy.is_busy() && (!text.trim().is_empty() || !self.attachment.is_empty())
    }

    /// Sends a user turn and appends the model's reply.
    ///
    /// The user message is appended before the call, the reply after it.
    /// Failures never escape: they are appended as a model message and kept
    /// as the session error.
    pub async fn send(&mut self, text: &str) -> SendOutcome {
        if !self.can_send(text) {
            return if self.busy.is_busy() {
                SendOutcome::Busy
            } else {
                SendOutcome::Ignored
            };
        }
        let Some(_guard) = self.busy.acquire() else {
            return SendOutcome::Busy;
        };
        self.error = None;

        let attachment = self.attachment.take();
        let Some(parts) = compose_user_parts(text, attachment.as_ref()) else {
            return SendOutcome::Ignored;
        };

        let request = self.builder.build(&self.conversation, parts.clone());
        self.conversation.append(Message::user(parts));

        let reply = reply(&self.generator, &request).await;
        if let Reply::Failed(message) = &reply {
            self.error = Some(format!("Failed to get response: {message}"));
        }
        self.conversation.append(reply.clone().into_message());
        SendOutcome::Replied(reply)
    }

    /// The conversation so far, greeting included.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The attachment that will go out with the next message.
    pub fn pending_attachment(&self) -> Option<&Attachment> {
        self.attachment.pending()
    }

    /// The preview of the pending attachment.
    pub fn attachment_preview(&self) -> Option<&Preview> {
        self.attachment.preview()
    }

    /// Tracks how many attachment previews are alive.
    pub fn previews(&self) -> &PreviewTracker {
        self.attachment.tracker()
    }

    /// The busy flag, shareable with the UI.
    pub fn busy(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// Returns `true` while a request is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// The error of the last send, if it failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Dismisses the error banner.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// The system instruction sent with every request.
    pub fn system_instruction(&self) -> &str {
        self.builder.system_instruction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_flag_is_exclusive_and_cleared_on_drop() {
        let flag = BusyFlag::default();
        let guard = flag.acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.clone().acquire().is_none());
        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.acquire().is_some());
    }
}
