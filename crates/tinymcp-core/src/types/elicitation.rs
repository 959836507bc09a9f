//! Elicitation: the reversed call asking the client's user to choose.
//!
//! When a tool cannot proceed without disambiguation (the workshop example:
//! "p53" matches both the human and the mouse protein), it asks the client
//! to put the question to its user via `elicitation/create`.

use serde::{Deserialize, Serialize};

/// Parameters of `elicitation/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElicitRequest {
    /// The question to put to the user.
    pub message: String,
    /// The choices offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl ElicitRequest {
    /// Create an elicitation request.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            choices: Vec::new(),
        }
    }

    /// Add a choice.
    #[must_use]
    pub fn choice(mut self, choice: impl Into<String>) -> Self {
        self.choices.push(choice.into());
        self
    }

    /// Set all choices at once.
    #[must_use]
    pub fn choices(mut self, choices: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }
}

/// How the user responded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElicitAction {
    /// The user picked a choice.
    Accept,
    /// The user declined to answer.
    Decline,
    /// The user dismissed the question.
    Cancel,
}

/// Result of `elicitation/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElicitResult {
    /// What the user did.
    pub action: ElicitAction,
    /// The selected choice, present when the action is `accept`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
}

impl ElicitResult {
    /// The user accepted with a choice.
    #[must_use]
    pub fn accept(choice: impl Into<String>) -> Self {
        Self {
            action: ElicitAction::Accept,
            choice: Some(choice.into()),
        }
    }

    /// The user declined.
    #[must_use]
    pub const fn decline() -> Self {
        Self {
            action: ElicitAction::Decline,
            choice: None,
        }
    }

    /// The user dismissed the question.
    #[must_use]
    pub const fn cancel() -> Self {
        Self {
            action: ElicitAction::Cancel,
            choice: None,
        }
    }
}
