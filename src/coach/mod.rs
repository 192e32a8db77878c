//! Coach orchestrator
//!
//! Owns the session lifecycle and the per-message pipeline: classify,
//! persist, escalate, build context, call the completion backend (or fall
//! back), persist the reply. Storage trouble degrades rather than fails:
//! session creation falls back to an in-memory ephemeral session and a
//! message-write failure is logged without blocking reply generation. The
//! user always gets a reply within the latency budget.

pub mod fallback;
pub mod prompt;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, Timelike, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::classifier::{classify, Classification, RiskLevel};
use crate::context;
use crate::error::CoachError;
use crate::llm::{CompletionBackend, CompletionError, Usage};
use crate::providers::{AchievementsProvider, JournalProvider, UserStatsProvider};
use crate::session::{ActiveSessions, Session, SessionStore, StoredMessage};

pub use prompt::HistoryTurn;

/// Everything the HTTP layer needs from one chat round trip.
#[derive(Debug)]
pub struct ChatOutcome {
    pub session_id: String,
    pub reply: String,
    /// Classification of the *user* message; this is what the client renders.
    pub classification: Classification,
    pub usage: Option<Usage>,
    /// Set when the reply came from the fallback responder, carrying the
    /// gateway failure that caused it.
    pub degraded: Option<CompletionError>,
}

pub struct CoachService {
    store: SessionStore,
    cache: ActiveSessions,
    stats: Arc<dyn UserStatsProvider>,
    journal: Arc<dyn JournalProvider>,
    achievements: Arc<dyn AchievementsProvider>,
    backend: Arc<dyn CompletionBackend>,
    /// In-memory sessions created while storage was down, keyed by their
    /// temporary id; evicted when the session ends.
    ephemeral: RwLock<HashMap<String, Session>>,
}

impl CoachService {
    pub fn new(
        store: SessionStore,
        stats: Arc<dyn UserStatsProvider>,
        journal: Arc<dyn JournalProvider>,
        achievements: Arc<dyn AchievementsProvider>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            store,
            cache: ActiveSessions::new(),
            stats,
            journal,
            achievements,
            backend,
            ephemeral: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session for the user. If the backend write fails, an
    /// ephemeral in-memory session keeps the conversation usable.
    pub async fn start(&self, user_id: &str) -> Session {
        match self.store.create_session(user_id).await {
            Ok(session) => {
                info!(session_id = %session.id, "session started");
                self.cache.set(user_id, &session.id).await;
                session
            }
            Err(e) => {
                warn!("session creation failed, using ephemeral session: {e}");
                let session = Session::ephemeral(user_id);
                self.cache.set(user_id, &session.id).await;
                self.ephemeral
                    .write()
                    .await
                    .insert(session.id.clone(), session.clone());
                session
            }
        }
    }

    /// Resume the user's open session, checking the local cache before the
    /// store so a warm process skips the lookup; creates one only when no
    /// open session exists, never forking history.
    pub async fn resume(&self, user_id: &str) -> Session {
        if let Some(cached_id) = self.cache.get(user_id).await {
            if let Some(session) = self.lookup(&cached_id).await {
                if session.is_open() {
                    return session;
                }
            }
        }

        match self.store.find_open_session(user_id).await {
            Ok(Some(session)) => {
                self.cache.set(user_id, &session.id).await;
                session
            }
            Ok(None) => self.start(user_id).await,
            Err(e) => {
                warn!("open-session lookup failed: {e}");
                self.start(user_id).await
            }
        }
    }

    /// Find a session by id across the store and the ephemeral map.
    async fn lookup(&self, session_id: &str) -> Option<Session> {
        if let Some(session) = self.ephemeral.read().await.get(session_id) {
            return Some(session.clone());
        }
        self.store.get_session(session_id).await.ok().flatten()
    }

    /// Classify and record one message, updating the session's derived
    /// aggregates. Persistence is best-effort: a write failure is logged and
    /// the classified message is still returned so the pipeline continues.
    pub async fn send_message(
        &self,
        session_id: &str,
        user_id: &str,
        text: &str,
        is_user: bool,
        response_time_ms: Option<i64>,
    ) -> StoredMessage {
        let class = classify(text);
        let message = StoredMessage::new(session_id, user_id, text, is_user, &class, response_time_ms);

        // Ephemeral sessions keep their aggregates in memory only.
        {
            let mut ephemeral = self.ephemeral.write().await;
            if let Some(session) = ephemeral.get_mut(session_id) {
                apply_aggregates(session, &class, is_user);
                return message;
            }
        }

        if let Err(e) = self.store.append_message(&message).await {
            warn!(session_id, "message write failed, continuing without persistence: {e}");
        }

        if class.risk == RiskLevel::Critical {
            info!(session_id, "critical message, flagging session for intervention");
            if let Err(e) = self.store.set_intervention(session_id).await {
                warn!(session_id, "failed to persist intervention flag: {e}");
            }
        }

        if let Err(e) = self.store.merge_topics(session_id, &class.topics).await {
            warn!(session_id, "failed to merge session topics: {e}");
        }

        if is_user {
            if let Err(e) = self.store.set_sentiment(session_id, class.sentiment).await {
                warn!(session_id, "failed to record session sentiment: {e}");
            }
        }

        message
    }

    /// Full chat round trip for one inbound user message.
    pub async fn handle_chat(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
        history: &[HistoryTurn],
    ) -> ChatOutcome {
        // A session id owned by a different user is treated as unknown;
        // the caller gets their own session, never someone else's history.
        let session = match self.lookup(session_id).await {
            Some(session) if session.is_open() && session.user_id == user_id => session,
            _ => self.resume(user_id).await,
        };

        let user_message = self
            .send_message(&session.id, user_id, text, true, None)
            .await;
        let classification = Classification {
            sentiment: user_message.sentiment,
            topics: user_message.topics.clone(),
            risk: user_message.risk_level,
        };

        let history = if history.is_empty() {
            self.stored_history(&session).await
        } else {
            history.to_vec()
        };

        let (reply, usage, degraded, elapsed_ms) =
            self.generate_reply(user_id, text, &history).await;

        self.send_message(&session.id, user_id, &reply, false, Some(elapsed_ms))
            .await;

        ChatOutcome {
            session_id: session.id,
            reply,
            classification,
            usage,
            degraded,
        }
    }

    /// Build the context snapshot and ask the backend for a reply. Any
    /// gateway error yields a fallback reply instead of a hard failure; the
    /// error class is passed up for the HTTP status mapping.
    async fn generate_reply(
        &self,
        user_id: &str,
        text: &str,
        history: &[HistoryTurn],
    ) -> (String, Option<Usage>, Option<CompletionError>, i64) {
        let snapshot = self.build_snapshot(user_id).await;
        let messages = prompt::assemble_prompt(&snapshot, history, text);
        debug!(turns = messages.len(), snapshot_chars = snapshot.len(), "prompt assembled");

        let started = Instant::now();
        let result = self.backend.complete(&messages).await;
        let elapsed_ms = started.elapsed().as_millis() as i64;

        match result {
            Ok(completion) => (completion.text, completion.usage, None, elapsed_ms),
            Err(e) => {
                warn!(backend = self.backend.name(), "falling back to canned reply: {e}");
                (fallback::fallback_reply(text).to_string(), None, Some(e), elapsed_ms)
            }
        }
    }

    /// Context snapshot from the read-only providers. Every lookup failure
    /// degrades to "no data"; this never errors.
    async fn build_snapshot(&self, user_id: &str) -> String {
        let stats = self.stats.user_stats(user_id).await.ok().flatten();
        let journal = self
            .journal
            .recent_entries(user_id, context::JOURNAL_WINDOW_DAYS)
            .await
            .unwrap_or_default();
        let achievements = self.achievements.achievement_counts(user_id).await.ok();

        let now = Utc::now();
        let hour = Local::now().hour();
        context::build_snapshot(stats.as_ref(), &journal, achievements.as_ref(), now, hour)
    }

    /// Prior turns from the store when the client sent no history.
    async fn stored_history(&self, session: &Session) -> Vec<HistoryTurn> {
        if session.ephemeral {
            return Vec::new();
        }
        match self.store.list_messages(&session.id).await {
            Ok(messages) => messages
                .into_iter()
                .map(|m| HistoryTurn { text: m.text, is_user: m.is_user })
                .collect(),
            Err(e) => {
                warn!(session_id = %session.id, "history load failed: {e}");
                Vec::new()
            }
        }
    }

    /// Close a session. Idempotent: a second call reports
    /// [`CoachError::SessionAlreadyEnded`] and persists nothing. Ephemeral
    /// sessions are evicted from the in-memory map; nothing about them
    /// outlives the close.
    pub async fn end(&self, session_id: &str, rating: Option<i64>) -> Result<(), CoachError> {
        {
            let mut ephemeral = self.ephemeral.write().await;
            if let Some(session) = ephemeral.remove(session_id) {
                drop(ephemeral);
                self.cache.clear(&session.user_id).await;
                return Ok(());
            }
        }

        let session = self
            .lookup(session_id)
            .await
            .ok_or_else(|| CoachError::SessionNotFound(session_id.to_string()))?;
        self.store.end_session(session_id, rating).await?;
        self.cache.clear(&session.user_id).await;
        info!(session_id, "session ended");
        Ok(())
    }

    /// Session state as currently known, for tests and the status surface.
    pub async fn session(&self, session_id: &str) -> Option<Session> {
        self.lookup(session_id).await
    }
}

fn apply_aggregates(session: &mut Session, class: &Classification, is_user: bool) {
    if class.risk == RiskLevel::Critical {
        session.intervention_triggered = true;
    }
    for topic in &class.topics {
        if !session.topics_discussed.contains(topic) {
            session.topics_discussed.push(topic.clone());
        }
    }
    if is_user {
        session.sentiment = Some(class.sentiment);
    }
}
