//! Privacy-bounded context digest
//!
//! Turns a user's recovery state into a short natural-language snapshot for
//! prompt injection. Everything is bucketed or aggregated before it leaves
//! this module: no calendar dates, no raw journal rows, no identifier beyond
//! a first name. The snapshot is built fresh per request and never persisted.
//!
//! Missing inputs degrade to a minimal generic snapshot; this function can
//! not fail.

use crate::providers::{AchievementCounts, JournalDay, UserStats};
use chrono::{DateTime, Utc};

/// Upper bound on the digest, in characters. Keeps the prompt share of the
/// snapshot predictable regardless of badge names.
const MAX_SNAPSHOT_CHARS: usize = 700;

/// How many journal days feed the aggregate bands.
pub const JOURNAL_WINDOW_DAYS: i64 = 7;

/// Build the context snapshot. `hour` is the caller's local hour (0..24),
/// passed in rather than read from the clock so tests can pin it.
pub fn build_snapshot(
    stats: Option<&UserStats>,
    journal: &[JournalDay],
    achievements: Option<&AchievementCounts>,
    now: DateTime<Utc>,
    hour: u32,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    match stats {
        Some(stats) => {
            if let Some(name) = stats.first_name() {
                lines.push(format!("You are coaching {name}."));
            }
            match stats.days_abstinent(now) {
                Some(days) => lines.push(format!("Recovery stage: {}.", stage_phrase(days))),
                None => lines.push("Recovery stage: not yet tracked.".to_string()),
            }
            if let Some(substance) = stats.substance.as_deref() {
                lines.push(format!("Quitting: {substance}."));
            }
        }
        None => {
            lines.push(
                "No recovery profile on record yet; keep the tone warm and general.".to_string(),
            );
        }
    }

    if journal.is_empty() {
        lines.push("No recent check-ins.".to_string());
    } else {
        let days = journal.len();
        let craving_days = journal.iter().filter(|d| d.craving).count();
        let mood_frac = fraction(journal.iter().filter(|d| d.mood_positive).count(), days);
        let sleep_frac = fraction(journal.iter().filter(|d| d.good_sleep).count(), days);
        let mean_energy = journal.iter().map(|d| d.energy as f64).sum::<f64>() / days as f64;

        lines.push(format!(
            "Past week: mood {}, cravings {} ({} of {} days), sleep {}, energy {}.",
            mood_band(mood_frac),
            craving_band(craving_days),
            craving_days,
            days,
            sleep_band(sleep_frac),
            energy_band(mean_energy),
        ));
    }

    if let Some(counts) = achievements {
        if counts.unlocked > 0 {
            let mut line = format!("Achievements unlocked: {}.", counts.unlocked);
            if let Some(badge) = counts.streak_badges.first() {
                line.push_str(&format!(" Latest streak badge: {badge}."));
            }
            lines.push(line);
        }
    }

    lines.push(format!("Time of day: {}.", time_of_day(hour)));
    if is_late_night(hour) {
        lines.push("It is late at night; being awake now may itself be a sleep concern.".to_string());
    }

    let mut snapshot = lines.join("\n");
    // Truncate on a char boundary; names and badge labels can be non-ASCII.
    if let Some((cut, _)) = snapshot.char_indices().nth(MAX_SNAPSHOT_CHARS) {
        snapshot.truncate(cut);
    }
    snapshot
}

/// Named recovery stages. Bucketing instead of exact day counts gives the
/// completion backend calibrated tone without exposing dates.
pub fn stage_phrase(days: i64) -> &'static str {
    match days {
        0 => "quit day, the very first hours; getting through the next craving is the whole job",
        1 => "day one complete; withdrawal is near its peak",
        2 => "day two; cravings and irritability are usually strongest right now",
        3 => "day three; the worst of the physical withdrawal is about to break",
        4..=7 => "first week; nicotine is leaving the body and habits feel raw",
        8..=14 => "second week; physical symptoms fade while routines still pull hard",
        15..=30 => "first month; rebuilding daily routines around the habit gaps",
        31..=60 => "second month; confidence grows and complacency becomes the risk",
        61..=90 => "approaching ninety days; a major consolidation milestone",
        91..=180 => "past ninety days; recovery is becoming the new normal",
        181..=365 => "past six months; occasional ambush cravings are the main threat",
        _ => "more than a year; long-term maintenance",
    }
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

/// Craving-day count to a qualitative band.
pub fn craving_band(days: usize) -> &'static str {
    match days {
        0 => "none",
        1..=2 => "occasional",
        3..=4 => "moderate",
        _ => "frequent",
    }
}

fn mood_band(frac: f64) -> &'static str {
    if frac >= 0.7 {
        "mostly positive"
    } else if frac >= 0.4 {
        "mixed"
    } else {
        "low"
    }
}

fn sleep_band(frac: f64) -> &'static str {
    if frac >= 0.7 {
        "mostly good"
    } else if frac >= 0.4 {
        "uneven"
    } else {
        "poor"
    }
}

fn energy_band(mean: f64) -> &'static str {
    if mean >= 4.0 {
        "high"
    } else if mean >= 2.5 {
        "moderate"
    } else {
        "low"
    }
}

pub fn time_of_day(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "late night",
    }
}

fn is_late_night(hour: u32) -> bool {
    !(5..=21).contains(&hour)
}
