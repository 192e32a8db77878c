//! Session and message persistence
//!
//! CRUD over coach sessions and their messages against SQLite, plus an
//! in-process cache of each user's active session id for fast resume.
//!
//! Messages are immutable once written; the only mutable session state is
//! the derived aggregates (`topics_discussed`, `intervention_triggered`,
//! last `sentiment`) and the close fields. Ordering within a session is
//! `created_at` ascending with insertion order breaking ties (rowid).

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::classifier::{Classification, RiskLevel, Sentiment};
use crate::error::CoachError;

/// A bounded conversation between one user and the coach.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    /// Unix millis.
    pub started_at: i64,
    /// Unset while the session is open.
    pub ended_at: Option<i64>,
    /// Last sentiment computed from a user message.
    pub sentiment: Option<Sentiment>,
    /// Optional 1-5 rating set at close.
    pub helpfulness_rating: Option<i64>,
    /// Sticky: once true, never reset by normal flow.
    pub intervention_triggered: bool,
    /// Union of topics across every message, insertion-ordered.
    pub topics_discussed: Vec<String>,
    /// True for the in-memory stand-in created when storage is down.
    pub ephemeral: bool,
}

impl Session {
    /// In-memory stand-in used when session creation against the backend
    /// fails; chat stays usable, nothing is persisted.
    pub fn ephemeral(user_id: &str) -> Self {
        Self {
            id: format!("temp-{}", Uuid::new_v4()),
            user_id: user_id.to_string(),
            started_at: Utc::now().timestamp_millis(),
            ended_at: None,
            sentiment: None,
            helpfulness_rating: None,
            intervention_triggered: false,
            topics_discussed: Vec::new(),
            ephemeral: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// One turn within a session, immutable once written.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub text: String,
    pub is_user: bool,
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    pub risk_level: RiskLevel,
    /// Gateway latency for assistant replies.
    pub response_time_ms: Option<i64>,
    pub created_at: i64,
}

impl StoredMessage {
    pub fn new(
        session_id: &str,
        user_id: &str,
        text: &str,
        is_user: bool,
        class: &Classification,
        response_time_ms: Option<i64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            is_user,
            sentiment: class.sentiment,
            topics: class.topics.clone(),
            risk_level: class.risk,
            response_time_ms,
            created_at: Utc::now().timestamp_millis(),
        }
    }
}

type SessionRow = (
    String,         // id
    String,         // user_id
    i64,            // started_at
    Option<i64>,    // ended_at
    Option<String>, // sentiment
    Option<i64>,    // helpfulness_rating
    i64,            // intervention_triggered
    String,         // topics_discussed (JSON)
);

fn session_from_row(row: SessionRow) -> Session {
    let (id, user_id, started_at, ended_at, sentiment, helpfulness_rating, intervention, topics) =
        row;
    Session {
        id,
        user_id,
        started_at,
        ended_at,
        sentiment: sentiment.as_deref().map(Sentiment::parse),
        helpfulness_rating,
        intervention_triggered: intervention != 0,
        topics_discussed: serde_json::from_str(&topics).unwrap_or_default(),
        ephemeral: false,
    }
}

const SESSION_COLUMNS: &str = "id, user_id, started_at, ended_at, sentiment, \
     helpfulness_rating, intervention_triggered, topics_discussed";

/// Persistence for sessions and messages.
#[derive(Clone)]
pub struct SessionStore {
    db: SqlitePool,
}

impl SessionStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a new open session for the user.
    ///
    /// The storage layer enforces at most one open session per user; if a
    /// concurrent create already won, the existing open session is returned
    /// instead of forking conversation history.
    pub async fn create_session(&self, user_id: &str) -> Result<Session, CoachError> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            started_at: Utc::now().timestamp_millis(),
            ended_at: None,
            sentiment: None,
            helpfulness_rating: None,
            intervention_triggered: false,
            topics_discussed: Vec::new(),
            ephemeral: false,
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO coach_sessions (id, user_id, started_at, topics_discussed)
            VALUES ($1, $2, $3, '[]')
            "#,
        )
        .bind(&session.id)
        .bind(user_id)
        .bind(session.started_at)
        .execute(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(session),
            Err(e) => {
                // Unique open-session index: another create got there first.
                if let Some(open) = self.find_open_session(user_id).await? {
                    return Ok(open);
                }
                Err(e.into())
            }
        }
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, CoachError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM coach_sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(session_from_row))
    }

    pub async fn find_open_session(&self, user_id: &str) -> Result<Option<Session>, CoachError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM coach_sessions \
             WHERE user_id = $1 AND ended_at IS NULL"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(session_from_row))
    }

    /// Append one immutable message.
    pub async fn append_message(&self, message: &StoredMessage) -> Result<(), CoachError> {
        sqlx::query(
            r#"
            INSERT INTO coach_messages
                (id, session_id, user_id, text, is_user, sentiment, topics,
                 risk_level, response_time_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(&message.user_id)
        .bind(&message.text)
        .bind(message.is_user as i64)
        .bind(message.sentiment.as_str())
        .bind(serde_json::to_string(&message.topics).unwrap_or_else(|_| "[]".to_string()))
        .bind(message.risk_level.as_str())
        .bind(message.response_time_ms)
        .bind(message.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// All messages of a session, `created_at` ascending, insertion order
    /// breaking ties.
    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, CoachError> {
        let rows: Vec<(
            String,
            String,
            String,
            String,
            i64,
            String,
            String,
            String,
            Option<i64>,
            i64,
        )> = sqlx::query_as(
            r#"
            SELECT id, session_id, user_id, text, is_user, sentiment, topics,
                   risk_level, response_time_ms, created_at
            FROM coach_messages
            WHERE session_id = $1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, session_id, user_id, text, is_user, sentiment, topics, risk, rt, created)| {
                    StoredMessage {
                        id,
                        session_id,
                        user_id,
                        text,
                        is_user: is_user != 0,
                        sentiment: Sentiment::parse(&sentiment),
                        topics: serde_json::from_str(&topics).unwrap_or_default(),
                        risk_level: RiskLevel::parse(&risk),
                        response_time_ms: rt,
                        created_at: created,
                    }
                },
            )
            .collect())
    }

    /// Set the sticky intervention flag. Monotonic; there is no reset path.
    pub async fn set_intervention(&self, session_id: &str) -> Result<(), CoachError> {
        sqlx::query("UPDATE coach_sessions SET intervention_triggered = 1 WHERE id = $1")
            .bind(session_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Record the last computed sentiment on the session.
    pub async fn set_sentiment(
        &self,
        session_id: &str,
        sentiment: Sentiment,
    ) -> Result<(), CoachError> {
        sqlx::query("UPDATE coach_sessions SET sentiment = $1 WHERE id = $2")
            .bind(sentiment.as_str())
            .bind(session_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Union `topics` into the session's discussed set. Read-modify-write;
    /// last-write-wins under concurrent sends is an accepted race since
    /// sessions are single-user in practice.
    pub async fn merge_topics(
        &self,
        session_id: &str,
        topics: &[String],
    ) -> Result<(), CoachError> {
        if topics.is_empty() {
            return Ok(());
        }

        let row: Option<(String,)> =
            sqlx::query_as("SELECT topics_discussed FROM coach_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&self.db)
                .await?;

        let Some((raw,)) = row else {
            return Err(CoachError::SessionNotFound(session_id.to_string()));
        };

        let mut discussed: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();
        for topic in topics {
            if !discussed.contains(topic) {
                discussed.push(topic.clone());
            }
        }

        sqlx::query("UPDATE coach_sessions SET topics_discussed = $1 WHERE id = $2")
            .bind(serde_json::to_string(&discussed).unwrap_or_else(|_| "[]".to_string()))
            .bind(session_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Close a session, optionally recording a helpfulness rating.
    ///
    /// Idempotence: a second call finds no open row and reports
    /// `SessionAlreadyEnded` without touching the original end time.
    pub async fn end_session(
        &self,
        session_id: &str,
        rating: Option<i64>,
    ) -> Result<(), CoachError> {
        let result = sqlx::query(
            r#"
            UPDATE coach_sessions
            SET ended_at = $1, helpfulness_rating = $2
            WHERE id = $3 AND ended_at IS NULL
            "#,
        )
        .bind(Utc::now().timestamp_millis())
        .bind(rating)
        .bind(session_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            if self.get_session(session_id).await?.is_some() {
                return Err(CoachError::SessionAlreadyEnded(session_id.to_string()));
            }
            return Err(CoachError::SessionNotFound(session_id.to_string()));
        }

        Ok(())
    }
}

/// In-process map of user id to their active session id. Lets `resume` skip
/// a storage round trip; always revalidated against the store before use.
#[derive(Default)]
pub struct ActiveSessions {
    inner: RwLock<HashMap<String, String>>,
}

impl ActiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str) -> Option<String> {
        self.inner.read().await.get(user_id).cloned()
    }

    pub async fn set(&self, user_id: &str, session_id: &str) {
        self.inner
            .write()
            .await
            .insert(user_id.to_string(), session_id.to_string());
    }

    pub async fn clear(&self, user_id: &str) {
        self.inner.write().await.remove(user_id);
    }
}
