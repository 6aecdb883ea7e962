//! # Command Error Handling
//!
//! This module provides the error type returned by clusterctl command
//! handlers, and uses the handled crate to turn any of them into a message
//! plus an optional hint for the terminal.

use handled::Handle;
use thiserror::Error;

use crate::ClientError;

/// User-friendly error information that can be extracted from various error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserError {
    /// The main error message to display to the user
    pub message: String,
    /// Optional usage hint to help the user correct the error
    pub usage_hint: Option<String>,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Implements Handle<UserError> for itself to allow extraction
impl Handle<UserError> for UserError {
    fn handle(&self) -> Option<UserError> {
        Some(self.clone())
    }
}

/// Failure of a single command invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A failure reported to the user as-is, e.g. an unresolvable node.
    #[error("{0}")]
    User(String),
    /// The command line could not be understood.
    #[error("{message}")]
    Usage {
        /// What was wrong.
        message: String,
        /// The usage text for the command.
        usage: String,
    },
    /// A service failure passed through untouched.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// A multi-node command that failed after doing some of its work.
    ///
    /// The lines in `output` belong on stdout and those in `failures` on
    /// stderr, both ahead of the error itself.
    #[error("{error}")]
    Partial {
        /// Results for the nodes that succeeded.
        output: Vec<String>,
        /// One line per node that failed.
        failures: Vec<String>,
        /// The error that ends the command.
        error: Box<CommandError>,
    },
}

impl CommandError {
    /// Creates a user-facing error with the given message.
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    /// Creates a usage error.
    pub fn usage(message: impl Into<String>, usage: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            usage: usage.into(),
        }
    }

    /// The error raised when `identifier` does not name a node.
    pub fn node_not_found(identifier: &str) -> Self {
        Self::user(format!("Node not found: {}", identifier))
    }

    /// Attaches the lines a command produced before failing.
    ///
    /// Returns the error unchanged when there is nothing to attach.
    pub fn with_progress(self, output: Vec<String>, failures: Vec<String>) -> Self {
        if output.is_empty() && failures.is_empty() {
            return self;
        }
        Self::Partial {
            output,
            failures,
            error: Box::new(self),
        }
    }

    /// Lines produced for stdout before the command failed.
    pub fn output(&self) -> &[String] {
        match self {
            Self::Partial { output, .. } => output,
            _ => &[],
        }
    }

    /// Per-node failures to report on stderr.
    pub fn failures(&self) -> &[String] {
        match self {
            Self::Partial { failures, .. } => failures,
            _ => &[],
        }
    }
}

impl Handle<UserError> for CommandError {
    fn handle(&self) -> Option<UserError> {
        match self {
            Self::User(message) => Some(UserError {
                message: message.clone(),
                usage_hint: None,
            }),
            Self::Usage { message, usage } => Some(UserError {
                message: message.clone(),
                usage_hint: Some(usage.clone()),
            }),
            Self::Client(e) => e.handle(),
            Self::Partial { error, .. } => error.handle(),
        }
    }
}

/// Helper function to extract user-friendly error messages
pub fn extract_user_error<E>(error: &E) -> Option<UserError>
where
    E: Handle<UserError>,
{
    error.handle()
}

/// Enhanced error formatting for CLI output
pub fn format_cli_error<E>(error: &E) -> String
where
    E: Handle<UserError> + std::fmt::Display,
{
    if let Some(user_error) = error.handle() {
        let mut output = format!("Error: {}", user_error.message);
        if let Some(hint) = user_error.usage_hint {
            output.push_str(&format!("\nHint: {}", hint));
        }
        output
    } else {
        format!("Error: {}", error)
    }
}
