// SPDX-License-Identifier: MIT

//! Message - the immutable unit of data routed between executors

use serde::{Deserialize, Serialize};

/// Author name used for messages lifted from the run's initial input
pub const USER_AUTHOR: &str = "user";

/// An author identity plus a text payload, immutable once constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: String,
    pub text: String,
}

impl Message {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Lift a raw input value into a message attributed to the user
    pub fn from_user(text: impl Into<String>) -> Self {
        Self::new(USER_AUTHOR, text)
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.author, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let msg = Message::new("Physicist", "Temperature is average kinetic energy.");
        assert_eq!(
            msg.to_string(),
            "Physicist: Temperature is average kinetic energy."
        );
    }

    #[test]
    fn test_from_user() {
        let msg = Message::from_user("What is temperature?");
        assert_eq!(msg.author, USER_AUTHOR);
        assert_eq!(msg.text, "What is temperature?");
    }
}
