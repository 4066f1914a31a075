//! One chat turn: retrieve, prompt, generate, record

use super::conversation::{ConversationStore, Message};
use super::prompt::{build_prompt, has_usable_context};
use crate::llm::Generator;
use crate::retrieval::{format_context, ContextBuilder};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result of a chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub success: bool,
    pub context_used: bool,
    /// Source paths of the passages placed in the prompt
    pub sources: Vec<String>,
}

/// Answers user messages grounded on the indexed corpus
pub struct ChatService {
    context: ContextBuilder,
    generator: Arc<dyn Generator>,
    top_k: usize,
    max_attempts: u32,
}

impl ChatService {
    pub fn new(context: ContextBuilder, generator: Arc<dyn Generator>, top_k: usize) -> Self {
        Self {
            context,
            generator,
            top_k,
            max_attempts: 1,
        }
    }

    /// Attempt count quoted in the failure reply
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Run one turn for `session_id`.
    ///
    /// Generation failures never surface as errors; they produce an
    /// unsuccessful reply that is not added to the transcript.
    pub async fn respond(
        &self,
        conversations: &ConversationStore,
        session_id: &str,
        message: &str,
    ) -> ChatReply {
        let history = conversations.history(session_id);
        conversations.append(session_id, Message::user(message));

        let hits = self.context.search(message, self.top_k).await;
        let context = format_context(&hits);
        let context_used = has_usable_context(&context);
        let sources: Vec<String> = if context_used {
            hits.iter()
                .map(|h| h.entry.metadata.source.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            Vec::new()
        };

        let prompt = build_prompt(message, &context, &history);

        match self.generator.generate(&prompt).await {
            Ok(response) => {
                conversations.append(session_id, Message::assistant(response.clone()));
                ChatReply {
                    response,
                    success: true,
                    context_used,
                    sources,
                }
            }
            Err(e) => {
                tracing::error!("Generation failed for session {}: {}", session_id, e);
                ChatReply {
                    response: format!(
                        "Failed to generate response after {} attempts",
                        self.max_attempts
                    ),
                    success: false,
                    context_used,
                    sources,
                }
            }
        }
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GroundworkError, Result};
    use crate::index::Fingerprint;
    use crate::llm::HashingEmbedder;
    use crate::store::{IndexEntry, InMemoryVectorStore, VectorStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes canned text and remembers prompts
    struct ScriptedGenerator {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(String::from),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| GroundworkError::Generation("model offline".to_string()))
        }

        async fn check_connection(&self) -> Result<Vec<String>> {
            Ok(vec!["scripted".to_string()])
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    async fn context() -> ContextBuilder {
        let store = InMemoryVectorStore::new(Arc::new(HashingEmbedder::new(128)));
        store
            .add(&IndexEntry::chunk(
                "d",
                0,
                "When DHCP leases fail, verify the relay helper address.".into(),
                "dhcp/relay.md",
                Fingerprint {
                    mtime: 0.0,
                    size: 1,
                },
            ))
            .await
            .unwrap();
        ContextBuilder::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_successful_turn_records_transcript() {
        let generator = Arc::new(ScriptedGenerator::new(Some("Check the helper address.")));
        let service = ChatService::new(context().await, generator.clone(), 3);
        let conversations = ConversationStore::default();

        let reply = service
            .respond(&conversations, "s", "dhcp leases fail")
            .await;
        assert!(reply.success);
        assert!(reply.context_used);
        assert_eq!(reply.sources, vec!["dhcp/relay.md"]);
        assert_eq!(reply.response, "Check the helper address.");
        assert_eq!(
            conversations.history("s"),
            vec![
                Message::user("dhcp leases fail"),
                Message::assistant("Check the helper address.")
            ]
        );

        service.respond(&conversations, "s", "still failing").await;
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("--- From relay.md ---"));
        assert!(prompts[1].contains("User: dhcp leases fail\nAssistant: Check the helper address."));
        assert!(!prompts[1].contains("User: still failing"));
        assert!(prompts[1].contains("User's latest message: still failing"));
    }

    #[tokio::test]
    async fn test_failed_generation_degrades() {
        let generator = Arc::new(ScriptedGenerator::new(None));
        let service = ChatService::new(context().await, generator, 3).with_max_attempts(3);
        let conversations = ConversationStore::default();

        let reply = service.respond(&conversations, "s", "dhcp").await;
        assert!(!reply.success);
        assert_eq!(reply.response, "Failed to generate response after 3 attempts");
        assert_eq!(conversations.history("s"), vec![Message::user("dhcp")]);
    }

    #[tokio::test]
    async fn test_no_context_without_store_hits() {
        let store = InMemoryVectorStore::new(Arc::new(HashingEmbedder::default()));
        let generator = Arc::new(ScriptedGenerator::new(Some("ok")));
        let service = ChatService::new(ContextBuilder::new(Arc::new(store)), generator.clone(), 5);

        let reply = service
            .respond(&ConversationStore::default(), "s", "anything at all")
            .await;
        assert!(!reply.context_used);
        assert!(reply.sources.is_empty());
        assert!(!generator.prompts.lock().unwrap()[0].contains("knowledge base"));
    }
}
