//! # Command Handlers
//!
//! This module contains the command handlers for the clusterctl CLI
//! application. Handlers parse their own flags, call the clustering service
//! through [`crate::ClusteringService`], and hand back a [`CommandOutput`] for
//! the binary to render.
//!
//! ## Structure
//!
//! - `node` - Node commands (list, show, create, update, delete, check, recover)
//! - `prompt` - Interactive confirmation
//! - `errors` - Command error type and user-facing error extraction
//! - `shared` - Shared parsing utilities and the dispatcher macro

use crate::Node;

pub mod error_extensions;
pub mod errors;
pub mod node;
pub mod prompt;
pub mod shared;

pub use errors::{CommandError, UserError, format_cli_error};
pub use node::{DeleteOutcome, handle_node_command};
pub use prompt::{Confirm, StdinConfirm};
pub use shared::CommandContext;

/// What a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// A node listing.
    Nodes {
        /// The listed nodes.
        nodes: Vec<Node>,
        /// Show IDs untruncated.
        full_id: bool,
    },
    /// A single node.
    Node {
        /// The node.
        node: Node,
        /// Include physical resource details.
        details: bool,
    },
    /// Plain status lines.
    Messages(Vec<String>),
    /// Nothing to print.
    Nothing,
}
