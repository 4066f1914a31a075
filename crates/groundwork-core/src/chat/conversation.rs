//! Bounded per-session transcripts

use crate::config::SessionConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One transcript line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

struct Session {
    messages: VecDeque<Message>,
    last_active: Instant,
}

/// Session id to transcript map.
///
/// Holds at most `max_sessions` sessions (the least recently active is
/// evicted), drops sessions idle for longer than `idle_ttl`, and keeps the
/// newest `max_messages` messages per session.
pub struct ConversationStore {
    sessions: Mutex<HashMap<String, Session>>,
    max_sessions: usize,
    idle_ttl: Duration,
    max_messages: usize,
}

impl ConversationStore {
    pub fn new(max_sessions: usize, idle_ttl: Duration, max_messages: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_ttl,
            max_messages: max_messages.max(1),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.max_sessions,
            Duration::from_secs(config.idle_ttl_secs),
            config.max_messages,
        )
    }

    /// Append a message, creating the session if needed
    pub fn append(&self, session_id: &str, message: Message) {
        self.append_at(session_id, message, Instant::now());
    }

    /// Transcript of a session, oldest first; empty for unknown or expired
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.history_at(session_id, Instant::now())
    }

    /// Forget a session; returns whether it existed
    pub fn clear(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    /// Drop every expired session; returns how many were dropped
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        // A panic mid-update leaves at worst a partial transcript
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, session: &Session, now: Instant) -> bool {
        now.saturating_duration_since(session.last_active) > self.idle_ttl
    }

    pub(crate) fn append_at(&self, session_id: &str, message: Message, now: Instant) {
        let mut sessions = self.lock();

        let expired = sessions
            .get(session_id)
            .is_some_and(|s| self.is_expired(s, now));
        if expired {
            sessions.remove(session_id);
        }

        if !sessions.contains_key(session_id) && sessions.len() >= self.max_sessions {
            sessions.retain(|_, s| !self.is_expired(s, now));
            if sessions.len() >= self.max_sessions {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, s)| s.last_active)
                    .map(|(id, _)| id.clone());
                if let Some(id) = oldest {
                    tracing::debug!("Evicting conversation {}", id);
                    sessions.remove(&id);
                }
            }
        }

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                messages: VecDeque::new(),
                last_active: now,
            });
        session.messages.push_back(message);
        while session.messages.len() > self.max_messages {
            session.messages.pop_front();
        }
        session.last_active = now;
    }

    pub(crate) fn history_at(&self, session_id: &str, now: Instant) -> Vec<Message> {
        let mut sessions = self.lock();
        match sessions.get(session_id) {
            Some(s) if self.is_expired(s, now) => {
                sessions.remove(session_id);
                Vec::new()
            }
            Some(s) => s.messages.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn prune_at(&self, now: Instant) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        before - sessions.len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
