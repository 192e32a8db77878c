//! Degraded-mode reply generation
//!
//! Deterministic canned replies keyed off the same phrase tables the
//! classifier uses, so the offline path can never disagree with the safety
//! classification. Replies must read like any other coach message: the
//! completion backend being down is never mentioned to the user.

use crate::classifier::rules;

const CRISIS_REPLY: &str = "I'm really glad you told me. What you're feeling right now matters, \
     and you don't have to carry it alone. If you are thinking about hurting \
     yourself, please reach out right now: call or text 988 (Suicide & Crisis \
     Lifeline) or talk to someone you trust. Your safety comes first, before \
     anything about quitting. I'm here with you.";

const RELAPSE_REPLY: &str = "A slip doesn't erase the progress you've made, and it doesn't mean \
     you can't do this. Recovery almost never runs in a straight line. What \
     matters is the next choice, not the last one. What was happening right \
     before it got hard?";

const CRAVING_REPLY: &str = "Cravings feel enormous in the moment, but they crest and pass, \
     usually within a few minutes. Try this right now: breathe in slowly for \
     four counts, hold for four, out for four. Drink some water, change \
     rooms, move your hands. You've outlasted every craving so far.";

const FIRST_DAY_REPLY: &str = "Day one is the hardest day there is, and you're doing it. Don't \
     think about forever right now; just get through the next hour, then the \
     one after that. Every hour is your body starting to heal.";

const PRIDE_REPLY: &str = "That's genuinely worth celebrating. Take a second to notice how you \
     got here, because that's the same strength you'll draw on next time it \
     gets hard. What's felt different this time?";

const STRUGGLE_REPLY: &str = "It makes sense that this feels heavy. Hard days are part of it, and \
     feeling the struggle doesn't mean you're failing - it means you're still \
     in the fight. What's weighing on you most right now?";

const DEFAULT_REPLY: &str = "I'm here with you. Tell me more about how today is going - the good \
     parts or the hard parts, whatever is on your mind.";

const FIRST_DAY_PHRASES: &[&str] = &["first day", "day 1", "day one", "just quit", "quitting today"];

/// Pick a canned reply for the message. Tier order mirrors the classifier:
/// safety first, then relapse, situation-specific tiers, generic default.
pub fn fallback_reply(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    let matches = |phrases: &[&str]| phrases.iter().any(|p| lowered.contains(p));

    if matches(rules::SELF_HARM_PHRASES) {
        CRISIS_REPLY
    } else if matches(rules::RELAPSE_PHRASES) {
        RELAPSE_REPLY
    } else if matches(FIRST_DAY_PHRASES) {
        FIRST_DAY_REPLY
    } else if lowered.contains("craving") || lowered.contains("urge") {
        CRAVING_REPLY
    } else if matches(rules::POSITIVE_PHRASES) {
        PRIDE_REPLY
    } else if matches(rules::STRUGGLE_PHRASES) {
        STRUGGLE_REPLY
    } else {
        DEFAULT_REPLY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REPLIES: &[&str] = &[
        CRISIS_REPLY,
        RELAPSE_REPLY,
        CRAVING_REPLY,
        FIRST_DAY_REPLY,
        PRIDE_REPLY,
        STRUGGLE_REPLY,
        DEFAULT_REPLY,
    ];

    #[test]
    fn self_harm_gets_the_crisis_reply() {
        assert_eq!(fallback_reply("I want to hurt myself"), CRISIS_REPLY);
    }

    #[test]
    fn craving_gets_a_grounding_reply() {
        assert_eq!(fallback_reply("this craving is awful"), CRAVING_REPLY);
    }

    #[test]
    fn first_day_is_recognized() {
        assert_eq!(fallback_reply("today is my first day without smoking"), FIRST_DAY_REPLY);
    }

    #[test]
    fn unmatched_input_gets_the_open_ended_default() {
        assert_eq!(fallback_reply("hello"), DEFAULT_REPLY);
        assert_eq!(fallback_reply(""), DEFAULT_REPLY);
    }

    #[test]
    fn replies_never_mention_the_backend() {
        for reply in ALL_REPLIES {
            let lowered = reply.to_lowercase();
            for word in ["unavailable", "offline", "backend", "error", "model", "ai "] {
                assert!(!lowered.contains(word), "reply leaks degraded mode: {reply}");
            }
            assert!(!reply.is_empty());
        }
    }
}
