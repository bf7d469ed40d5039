//! Shell transcript model.

use serde::{Deserialize, Serialize};

/// Role of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Synthetic output produced by the simulator (login banner).
    System,
    /// A command typed by the user.
    User,
    /// Output returned by the text generator.
    Assistant,
    /// A failed shell request.
    Error,
}

/// One entry in the shell scrollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced the content.
    pub role: TurnRole,
    /// Text shown verbatim.
    pub content: String,
}

impl Turn {
    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }

    /// Create an error turn.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Error,
            content: content.into(),
        }
    }
}

/// Ordered turn history of the running machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Turns in order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the transcript has no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `max_chars` characters of the transcript content, one turn
    /// per line.
    pub fn tail(&self, max_chars: usize) -> String {
        let joined = self
            .turns
            .iter()
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let total = joined.chars().count();
        if total <= max_chars {
            return joined;
        }
        joined.chars().skip(total - max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_short_transcript_is_whole() {
        let mut t = Transcript::new();
        t.push(Turn::system("banner"));
        t.push(Turn::user("ls"));
        assert_eq!(t.tail(800), "banner\nls");
    }

    #[test]
    fn test_tail_keeps_last_chars() {
        let mut t = Transcript::new();
        t.push(Turn::assistant("abcdefghij"));
        assert_eq!(t.tail(4), "ghij");
        assert_eq!(t.tail(0), "");
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        let mut t = Transcript::new();
        t.push(Turn::assistant("héllo wörld"));
        assert_eq!(t.tail(5), "wörld");
    }

    #[test]
    fn test_serializes_as_turn_array() {
        let mut t = Transcript::new();
        t.push(Turn::error("boom"));
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json[0]["role"], "error");
        assert_eq!(json[0]["content"], "boom");
    }
}
