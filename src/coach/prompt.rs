//! System prompt and bounded prompt assembly.

use serde::{Deserialize, Serialize};

use crate::llm::PromptMessage;

/// One prior turn as supplied by the client, validated at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTurn {
    pub text: String,
    pub is_user: bool,
}

/// How many prior turns are included in the prompt. Older turns are dropped;
/// the context snapshot carries the durable state instead.
pub const HISTORY_TURN_CAP: usize = 10;

pub const SYSTEM_PROMPT: &str = "You are a warm, grounded recovery coach helping someone quit smoking or \
     vaping. Keep replies short (2-4 sentences), concrete, and free of \
     judgment. Celebrate progress without exaggeration. Never prescribe \
     medication or diagnose. If the user expresses any intent to harm \
     themselves, set everything else aside: acknowledge their pain, tell them \
     they deserve support right now, and point them to the 988 Suicide & \
     Crisis Lifeline (call or text 988). Use the snapshot below to calibrate \
     tone; never quote it back verbatim or mention that it exists.";

/// Assemble the bounded prompt: system prompt + context snapshot, then the
/// last [`HISTORY_TURN_CAP`] turns, then the new user message. A trailing
/// history turn identical to the new message is dropped rather than sent
/// twice (clients often echo the pending message into history); the drop
/// happens before the window is taken, so echoing clients still get the
/// full window of prior turns.
pub fn assemble_prompt(
    snapshot: &str,
    history: &[HistoryTurn],
    user_text: &str,
) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(HISTORY_TURN_CAP + 2);
    messages.push(PromptMessage::system(format!(
        "{SYSTEM_PROMPT}\n\n## User snapshot\n{snapshot}"
    )));

    let mut turns = history;
    if let Some(last) = turns.last() {
        if last.is_user && last.text == user_text {
            turns = &turns[..turns.len() - 1];
        }
    }
    let start = turns.len().saturating_sub(HISTORY_TURN_CAP);

    for turn in &turns[start..] {
        messages.push(if turn.is_user {
            PromptMessage::user(&turn.text)
        } else {
            PromptMessage::assistant(&turn.text)
        });
    }

    messages.push(PromptMessage::user(user_text));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn turn(text: &str, is_user: bool) -> HistoryTurn {
        HistoryTurn { text: text.to_string(), is_user }
    }

    #[test]
    fn system_prompt_comes_first_and_carries_the_snapshot() {
        let messages = assemble_prompt("Recovery stage: first week.", &[], "hi");
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Recovery stage: first week."));
        assert_eq!(messages.last().unwrap().content, "hi");
    }

    #[test]
    fn history_is_capped_to_the_most_recent_turns() {
        let history: Vec<HistoryTurn> =
            (0..25).map(|i| turn(&format!("turn {i}"), i % 2 == 0)).collect();
        let messages = assemble_prompt("snap", &history, "new message");

        // system + 10 turns + new user message
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[1].content, "turn 15");
    }

    #[test]
    fn trailing_echo_of_the_new_message_is_dropped() {
        let history = vec![turn("earlier", false), turn("hello", true)];
        let messages = assemble_prompt("snap", &history, "hello");

        let hellos = messages.iter().filter(|m| m.content == "hello").count();
        assert_eq!(hellos, 1);
    }

    #[test]
    fn echo_drop_does_not_shrink_the_history_window() {
        let mut history: Vec<HistoryTurn> = (0..HISTORY_TURN_CAP)
            .map(|i| turn(&format!("turn {i}"), i % 2 == 0))
            .collect();
        history.push(turn("new message", true));
        let messages = assemble_prompt("snap", &history, "new message");

        // system + the full window of prior turns + new user message
        assert_eq!(messages.len(), HISTORY_TURN_CAP + 2);
        assert_eq!(messages[1].content, "turn 0");
    }
}
