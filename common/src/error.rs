//! Error handling for the herd workspace.

use thiserror::Error;

/// Error type shared by every herd crate.
///
/// Failures inside a worker group fall into two buckets: local faults that
/// still need a group-wide verdict before anyone acts on them
/// (`ConfigurationError`, `ResourceError`), and faults in the group machinery
/// itself, which are fatal on the spot (`ChannelError`, `ProtocolError`).
/// `Aborted` is the verdict every member receives once the group has agreed
/// to stop.
#[derive(Error, Debug)]
pub enum HerdError {
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Resource exhausted: {message}")]
    ResourceError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Channel failure: {message}")]
    ChannelError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Collective protocol violation: {message}")]
    ProtocolError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Proc {rank} > In {context}, {message}")]
    Aborted {
        rank: usize,
        context: String,
        message: String,
    },
}

impl HerdError {
    /// Create a configuration error with a custom message.
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a resource error with a custom message.
    pub fn resource_error<S: Into<String>>(message: S) -> Self {
        Self::ResourceError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a channel error with a custom message.
    pub fn channel_error<S: Into<String>>(message: S) -> Self {
        Self::ChannelError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a channel error with a custom message and source error.
    pub fn channel_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::ChannelError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a protocol error with a custom message.
    pub fn protocol_error<S: Into<String>>(message: S) -> Self {
        Self::ProtocolError {
            message: message.into(),
            source: None,
        }
    }

    /// True when this error is the synchronized group-wide abort, as opposed
    /// to a fault local to one member.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Result type alias for herd operations.
pub type Result<T> = std::result::Result<T, HerdError>;
