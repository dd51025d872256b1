//! Common types for the BodyTrace environment abstraction.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};

/// Remote topic that sets the collect flag of the body trace.
pub const COLLECT_TOPIC: &str = "ambf/trace_plugin/set_body_trace_collect";

/// Remote topic that sets the visibility flag of the body traces.
pub const VISIBLE_TOPIC: &str = "ambf/trace_plugin/set_body_trace_visible";

/// A command that changes the trace controller's toggles.
///
/// Keyboard input produces the flipping variants, remote channels produce
/// the `Set*` variants which only act when the state actually differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToggleCommand {
    /// Flip the collect flag
    ToggleCollect,

    /// Flip the show flag
    ToggleShow,

    /// Drive the collect flag to a given state
    SetCollect(bool),

    /// Drive the show flag to a given state
    SetShow(bool),

    /// Clear and rebuild the static trace from its source file
    ReloadStatic,
}

impl ToggleCommand {
    /// Maps a remote boolean message onto a command.
    ///
    /// Returns `None` for topics the trace controller does not listen on.
    pub fn from_topic(topic: &str, value: bool) -> Option<Self> {
        match topic {
            COLLECT_TOPIC => Some(Self::SetCollect(value)),
            VISIBLE_TOPIC => Some(Self::SetShow(value)),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToggleCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToggleCollect => write!(f, "toggle-collect"),
            Self::ToggleShow => write!(f, "toggle-show"),
            Self::SetCollect(v) => write!(f, "set-collect({})", v),
            Self::SetShow(v) => write!(f, "set-show({})", v),
            Self::ReloadStatic => write!(f, "reload-static"),
        }
    }
}

/// A boolean message received on a remote topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteToggle {
    /// Topic the message arrived on
    pub topic: String,

    /// Message payload
    pub value: bool,
}

impl RemoteToggle {
    /// Creates a new remote message.
    pub fn new(topic: impl Into<String>, value: bool) -> Self {
        Self {
            topic: topic.into(),
            value,
        }
    }

    /// Converts the message into a command.
    ///
    /// # Errors
    /// `EnvError::UnknownTopic` if nothing listens on the message's topic.
    pub fn command(&self) -> Result<ToggleCommand, EnvError> {
        ToggleCommand::from_topic(&self.topic, self.value)
            .ok_or_else(|| EnvError::unknown_topic(&self.topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_topics_map_to_set_commands() {
        assert_eq!(
            ToggleCommand::from_topic(COLLECT_TOPIC, true),
            Some(ToggleCommand::SetCollect(true))
        );
        assert_eq!(
            ToggleCommand::from_topic(VISIBLE_TOPIC, false),
            Some(ToggleCommand::SetShow(false))
        );
    }

    #[test]
    fn test_unknown_topic_is_ignored() {
        let msg = RemoteToggle::new("ambf/trace_plugin/unknown", true);
        assert_eq!(
            msg.command(),
            Err(EnvError::UnknownTopic("ambf/trace_plugin/unknown".into()))
        );
        assert_eq!(
            RemoteToggle::new(COLLECT_TOPIC, false).command(),
            Ok(ToggleCommand::SetCollect(false))
        );
    }
}
