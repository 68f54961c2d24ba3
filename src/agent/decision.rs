//! Parsing of the model's tool-selection replies.
//!
//! The agent prompt asks for one of two shapes:
//!
//! ```text
//! Thought: Do I need to use a tool? Yes
//! Action: hospital_directory
//! Action Input: What is the contact number of Bharatpur Hospital?
//! ```
//!
//! ```text
//! Thought: Do I need to use a tool? No
//! Final Answer: Drink plenty of fluids and rest.
//! ```
//!
//! Parsing is deliberately tolerant: a reply with no recognizable Action
//! block is treated as the final answer rather than an error, so a model
//! that drifts off-format degrades to a plain chat reply instead of
//! failing the turn.

/// The agent's next move, as parsed from one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Invoke `tool` with `input`, then continue the loop.
    Action { tool: String, input: String },
    /// Reply to the user with this text.
    Final(String),
}

const ACTION_MARKER: &str = "Action:";
const INPUT_MARKER: &str = "Action Input:";
const FINAL_MARKER: &str = "Final Answer:";

/// Parse one model reply into a [`Decision`].
pub fn parse_decision(reply: &str) -> Decision {
    // An explicit Action wins even if the reply also rambles on.
    if let Some(action) = parse_action(reply) {
        return action;
    }

    // "Final Answer:" strips the scaffolding; keep everything after it.
    if let Some(pos) = reply.find(FINAL_MARKER) {
        let text = reply[pos + FINAL_MARKER.len()..].trim();
        if !text.is_empty() {
            return Decision::Final(text.to_string());
        }
    }

    Decision::Final(reply.trim().to_string())
}

fn parse_action(reply: &str) -> Option<Decision> {
    let mut tool: Option<String> = None;
    let mut input_lines: Vec<String> = Vec::new();
    let mut in_input = false;

    for line in reply.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(INPUT_MARKER) {
            input_lines.push(rest.trim().to_string());
            in_input = true;
        } else if let Some(rest) = trimmed.strip_prefix(ACTION_MARKER) {
            // only the first Action block counts
            if tool.is_none() {
                tool = Some(clean_tool_name(rest));
            }
            in_input = false;
        } else if in_input {
            if trimmed.is_empty() || trimmed.starts_with("Thought:") {
                in_input = false;
            } else {
                input_lines.push(trimmed.to_string());
            }
        }
    }

    let tool = tool.filter(|t| !t.is_empty())?;
    Some(Decision::Action {
        tool,
        input: input_lines.join("\n").trim().to_string(),
    })
}

/// Models sometimes wrap the tool name in quotes, backticks or brackets.
fn clean_tool_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '[' | ']'))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_with_input() {
        let reply = "Thought: Do I need to use a tool? Yes\n\
                     Action: hospital_directory\n\
                     Action Input: What is the contact of Bharatpur Hospital?";
        assert_eq!(
            parse_decision(reply),
            Decision::Action {
                tool: "hospital_directory".into(),
                input: "What is the contact of Bharatpur Hospital?".into(),
            }
        );
    }

    #[test]
    fn parses_final_answer() {
        let reply = "Thought: Do I need to use a tool? No\n\
                     Final Answer: Rest and drink fluids.";
        assert_eq!(parse_decision(reply), Decision::Final("Rest and drink fluids.".into()));
    }

    #[test]
    fn freeform_reply_is_final() {
        let reply = "Drink plenty of water and see how you feel tomorrow.";
        assert_eq!(parse_decision(reply), Decision::Final(reply.into()));
    }

    #[test]
    fn action_wins_over_final_answer() {
        let reply = "Action: web_search\nAction Input: dengue outbreak\n\
                     Final Answer: placeholder";
        assert!(matches!(parse_decision(reply), Decision::Action { .. }));
    }

    #[test]
    fn multiline_action_input() {
        let reply = "Action: web_search\nAction Input: dengue symptoms\nin children";
        assert_eq!(
            parse_decision(reply),
            Decision::Action {
                tool: "web_search".into(),
                input: "dengue symptoms\nin children".into(),
            }
        );
    }

    #[test]
    fn decorated_tool_name_cleaned() {
        let reply = "Action: \"web_search\"\nAction Input: x";
        assert_eq!(
            parse_decision(reply),
            Decision::Action { tool: "web_search".into(), input: "x".into() }
        );
    }

    #[test]
    fn action_without_input_has_empty_input() {
        let reply = "Action: web_search";
        assert_eq!(
            parse_decision(reply),
            Decision::Action { tool: "web_search".into(), input: String::new() }
        );
    }

    #[test]
    fn empty_action_name_falls_back_to_final() {
        let reply = "Action:\nsome text";
        assert_eq!(parse_decision(reply), Decision::Final(reply.trim().into()));
    }

    #[test]
    fn final_answer_keeps_trailing_lines() {
        let reply = "Final Answer: First line.\nSecond line.";
        assert_eq!(
            parse_decision(reply),
            Decision::Final("First line.\nSecond line.".into())
        );
    }
}
