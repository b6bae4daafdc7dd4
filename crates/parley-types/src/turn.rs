//! One user-utterance/reply pair in the conversation transcript.

use serde::{Deserialize, Serialize};

/// A single conversation turn.
///
/// A turn is *pending* while its reply is empty and *answered* once the
/// assistant's reply has been recorded. On the wire and on disk a turn
/// is a two-element JSON array `[user, reply]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Turn {
    pub user: String,
    pub reply: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            reply: reply.into(),
        }
    }

    /// A turn that has user speech but no reply yet.
    pub fn pending(user: impl Into<String>) -> Self {
        Self::new(user, "")
    }

    pub fn is_pending(&self) -> bool {
        self.reply.is_empty()
    }
}

impl From<(String, String)> for Turn {
    fn from((user, reply): (String, String)) -> Self {
        Self { user, reply }
    }
}

impl From<Turn> for (String, String) {
    fn from(turn: Turn) -> Self {
        (turn.user, turn.reply)
    }
}
