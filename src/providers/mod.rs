//! Read-only collaborator interfaces
//!
//! The coach consumes the profile, journal, and achievement subsystems
//! through these traits and never writes to them. The sqlx implementations
//! read the local tables those subsystems maintain; tests substitute stubs.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Recovery profile basics for one user.
#[derive(Debug, Clone)]
pub struct UserStats {
    pub display_name: Option<String>,
    pub substance: Option<String>,
    pub quit_at: Option<DateTime<Utc>>,
}

impl UserStats {
    /// Whole days since the quit date, clamped at zero.
    pub fn days_abstinent(&self, now: DateTime<Utc>) -> Option<i64> {
        self.quit_at.map(|q| (now - q).num_days().max(0))
    }

    /// First name only; nothing else from the profile ever reaches a prompt.
    pub fn first_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .filter(|n| !n.is_empty())
    }
}

/// One day of journal flags. Deliberately flag-only: raw journal text never
/// crosses this interface.
#[derive(Debug, Clone)]
pub struct JournalDay {
    pub mood_positive: bool,
    pub craving: bool,
    pub good_sleep: bool,
    /// Self-reported energy, 1..=5.
    pub energy: i64,
}

/// Badge bookkeeping, counts only.
#[derive(Debug, Clone, Default)]
pub struct AchievementCounts {
    pub unlocked: i64,
    pub streak_badges: Vec<String>,
}

#[async_trait]
pub trait UserStatsProvider: Send + Sync {
    async fn user_stats(&self, user_id: &str) -> Result<Option<UserStats>>;
}

#[async_trait]
pub trait JournalProvider: Send + Sync {
    /// The user's most recent entries, newest first, at most `limit`.
    async fn recent_entries(&self, user_id: &str, limit: i64) -> Result<Vec<JournalDay>>;
}

#[async_trait]
pub trait AchievementsProvider: Send + Sync {
    async fn achievement_counts(&self, user_id: &str) -> Result<AchievementCounts>;
}

/// sqlx-backed implementation of all three provider traits.
#[derive(Clone)]
pub struct SqliteProviders {
    db: SqlitePool,
}

impl SqliteProviders {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStatsProvider for SqliteProviders {
    async fn user_stats(&self, user_id: &str) -> Result<Option<UserStats>> {
        let row: Option<(Option<String>, Option<String>, Option<i64>)> = sqlx::query_as(
            "SELECT display_name, substance, quit_at FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(display_name, substance, quit_at)| UserStats {
            display_name,
            substance,
            quit_at: quit_at.and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms)),
        }))
    }
}

#[async_trait]
impl JournalProvider for SqliteProviders {
    async fn recent_entries(&self, user_id: &str, limit: i64) -> Result<Vec<JournalDay>> {
        let rows: Vec<(i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT mood_positive, craving, good_sleep, energy
            FROM journal_entries
            WHERE user_id = $1
            ORDER BY entry_date DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(mood_positive, craving, good_sleep, energy)| JournalDay {
                mood_positive: mood_positive != 0,
                craving: craving != 0,
                good_sleep: good_sleep != 0,
                energy,
            })
            .collect())
    }
}

#[async_trait]
impl AchievementsProvider for SqliteProviders {
    async fn achievement_counts(&self, user_id: &str) -> Result<AchievementCounts> {
        let unlocked: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM achievements WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        let streaks: Vec<(String,)> = sqlx::query_as(
            "SELECT badge FROM achievements WHERE user_id = $1 AND is_streak = 1 ORDER BY unlocked_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(AchievementCounts {
            unlocked: unlocked.0,
            streak_badges: streaks.into_iter().map(|(b,)| b).collect(),
        })
    }
}
