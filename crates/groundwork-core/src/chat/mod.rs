//! Grounded chat
//!
//! Conversation state is an explicit [`ConversationStore`] handed to
//! [`ChatService::respond`] on every turn.

mod conversation;
mod prompt;
mod service;

pub use conversation::{ConversationStore, Message, Role};
pub use prompt::{build_prompt, has_usable_context, ASSISTANT_PREAMBLE};
pub use service::{ChatReply, ChatService};
