//! Message classification
//!
//! Pure, deterministic sentiment/topic/risk scoring over the ordered rule
//! table in [`rules`]. Total by construction: unclassifiable input falls
//! through to neutral/low with no topics, and nothing in here can fail.

pub mod rules;

use serde::{Deserialize, Serialize};

pub use rules::RULESET_VERSION;

/// How urgently a message may indicate danger to the user.
/// Ordered: low < medium < high < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Total parse; unknown input degrades to `Low`.
    pub fn parse(s: &str) -> Self {
        match s {
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Low,
        }
    }
}

/// Message sentiment. `Crisis` is a category of its own, not a degree of
/// `Negative`: it is what gates the safety path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Crisis,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Crisis => "crisis",
        }
    }

    /// Total parse; unknown input degrades to `Neutral`.
    pub fn parse(s: &str) -> Self {
        match s {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            "crisis" => Sentiment::Crisis,
            _ => Sentiment::Neutral,
        }
    }
}

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    pub risk: RiskLevel,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            topics: Vec::new(),
            risk: RiskLevel::Low,
        }
    }
}

/// Classify a message: walk the ordered tiers, then extract topics.
///
/// Tier semantics: the first crisis tier to match ends the walk with
/// crisis/critical. Lower tiers can raise risk (never lower it) and set
/// sentiment only while it is still neutral, so the table's ordering decides
/// which lexicon wins when several match.
pub fn classify(text: &str) -> Classification {
    let lowered = text.to_lowercase();

    let mut sentiment = Sentiment::Neutral;
    let mut risk = RiskLevel::Low;

    for tier in rules::RULE_TIERS {
        if !tier.phrases.iter().any(|p| lowered.contains(p)) {
            continue;
        }
        if let Some(r) = tier.risk {
            risk = risk.max(r);
        }
        if let Some(s) = tier.sentiment {
            if sentiment == Sentiment::Neutral {
                sentiment = s;
            }
        }
        if tier.short_circuit {
            break;
        }
    }

    Classification {
        sentiment,
        risk,
        topics: extract_topics(&lowered),
    }
}

/// Extract topics independently of the tier walk. Non-exclusive: a message
/// may carry zero or many topics.
fn extract_topics(lowered: &str) -> Vec<String> {
    rules::TOPIC_RULES
        .iter()
        .filter(|rule| rule.phrases.iter().any(|p| lowered.contains(p)))
        .map(|rule| rule.topic.to_string())
        .collect()
}
