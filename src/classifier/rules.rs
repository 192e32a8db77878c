//! The ordered classification rule table.
//!
//! Tier order is a safety contract: the self-harm tier is evaluated before
//! everything else and short-circuits the walk. Both the server-side
//! classifier and the fallback responder consume this one table, so the two
//! can never drift apart. Bump `RULESET_VERSION` whenever a phrase list or
//! tier ordering changes.

use super::{RiskLevel, Sentiment};

/// Version of the rule table, reported by the status endpoint.
pub const RULESET_VERSION: &str = "2025.08.1";

/// One tier of the ordered classification walk.
pub struct RuleTier {
    pub name: &'static str,
    /// Case-insensitive substrings; any hit matches the tier.
    pub phrases: &'static [&'static str],
    /// Sentiment this tier assigns, if any.
    pub sentiment: Option<Sentiment>,
    /// Risk level this tier assigns, if any (never lowers an earlier tier).
    pub risk: Option<RiskLevel>,
    /// A match here ends the walk immediately.
    pub short_circuit: bool,
}

/// Phrases indicating intent to self-harm. Kept as its own constant so the
/// fallback responder can check it without walking the full table.
pub const SELF_HARM_PHRASES: &[&str] = &[
    "hurt myself",
    "harm myself",
    "kill myself",
    "suicide",
    "suicidal",
    "end my life",
    "end it all",
    "want to die",
    "better off dead",
    "better off without me",
    "no reason to live",
];

pub const RELAPSE_PHRASES: &[&str] = &[
    "relapse",
    "give up",
    "giving up",
    "gave up",
    "can't do this",
    "cannot do this",
    "hopeless",
    "worthless",
    "no point",
];

pub const URGENT_PHRASES: &[&str] = &[
    "strong craving",
    "intense craving",
    "about to smoke",
    "about to vape",
    "about to give in",
    "buying cigarettes",
    "bought a pack",
    "lighting up",
];

pub const STRUGGLE_PHRASES: &[&str] = &[
    "struggle",
    "struggling",
    "hard",
    "craving",
    "difficult",
    "stress",
    "anxious",
    "anxiety",
    "depressed",
    "overwhelmed",
    "tempted",
];

pub const POSITIVE_PHRASES: &[&str] = &[
    "proud",
    "good",
    "better",
    "success",
    "happy",
    "great",
    "clean",
    "smoke-free",
    "smoke free",
    "milestone",
    "grateful",
];

/// The ordered tiers. Walked top to bottom; see [`super::classify`].
pub static RULE_TIERS: &[RuleTier] = &[
    RuleTier {
        name: "self-harm",
        phrases: SELF_HARM_PHRASES,
        sentiment: Some(Sentiment::Crisis),
        risk: Some(RiskLevel::Critical),
        short_circuit: true,
    },
    RuleTier {
        name: "relapse",
        phrases: RELAPSE_PHRASES,
        sentiment: Some(Sentiment::Crisis),
        risk: Some(RiskLevel::Critical),
        short_circuit: true,
    },
    RuleTier {
        name: "urgent",
        phrases: URGENT_PHRASES,
        sentiment: None,
        risk: Some(RiskLevel::High),
        short_circuit: false,
    },
    RuleTier {
        name: "struggle",
        phrases: STRUGGLE_PHRASES,
        sentiment: Some(Sentiment::Negative),
        risk: Some(RiskLevel::Medium),
        short_circuit: false,
    },
    RuleTier {
        name: "positive",
        phrases: POSITIVE_PHRASES,
        sentiment: Some(Sentiment::Positive),
        risk: None,
        short_circuit: false,
    },
];

/// One topic with its trigger phrases. Topic extraction is independent of the
/// tier walk and never affects sentiment or risk.
pub struct TopicRule {
    pub topic: &'static str,
    pub phrases: &'static [&'static str],
}

pub static TOPIC_RULES: &[TopicRule] = &[
    TopicRule {
        topic: "cravings",
        phrases: &["craving", "urge", "want to smoke", "want to vape", "want a cigarette"],
    },
    TopicRule {
        topic: "triggers",
        phrases: &["trigger", "around smokers", "drinking", "after meals", "with coffee"],
    },
    TopicRule {
        topic: "stress",
        phrases: &["stress", "anxious", "anxiety", "overwhelmed", "pressure"],
    },
    TopicRule {
        topic: "withdrawal",
        phrases: &["withdrawal", "headache", "irritable", "restless", "brain fog", "can't focus"],
    },
    TopicRule {
        topic: "relapse",
        phrases: &["relapse", "slipped", "smoked again", "gave in", "messed up"],
    },
    TopicRule {
        topic: "sleep",
        phrases: &["sleep", "insomnia", "tired", "exhausted", "lying awake"],
    },
    TopicRule {
        topic: "motivation",
        phrases: &["motivat", "why am i doing", "worth it", "give up", "keep going"],
    },
    TopicRule {
        topic: "support",
        phrases: &["family", "friend", "partner", "support", "alone", "lonely"],
    },
];
