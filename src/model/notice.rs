//! Notifications: the transient messages every outcome surfaces to the user.

use serde::{Deserialize, Serialize};

/// How a notification should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Failure,
}

/// A transient, user-visible message: a title and a one-line description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub tone: Tone,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tone: Tone::Success,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tone: Tone::Failure,
        }
    }
}
