//! # clusterctl: Node Lifecycle from the Command Line
//!
//! clusterctl drives the node API of a clustering service. Each command turns
//! its arguments into one or more service requests and renders the answer as
//! a table, JSON, or YAML.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Binary (global options, logging, exit)  │
//! ├─────────────────────────────────────────┤
//! │ Command handlers (flag parsing, shaping)│
//! ├─────────────────────────────────────────┤
//! │ ClusteringService trait                 │
//! ├─────────────────────────────────────────┤
//! │ ClusteringClient (reqwest, REST /v1)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Handlers receive the service and the confirmation source through a
//! [`commands::CommandContext`], so they can be exercised without a network
//! or a terminal.
//!
//! ## Request Shaping
//!
//! - Listing always sends every query field, defaulted when not given.
//! - Creation always sends `name`, `profile_id`, `cluster_id`, `role` and
//!   `metadata`.
//! - Updates send only the fields given on the command line.
//!
//! ```rust
//! # use clusterctl::{NodeSpec, NodeUpdateSpec};
//! # use std::collections::BTreeMap;
//! let spec = NodeSpec {
//!     name: "my_node".to_string(),
//!     profile_id: "mystack".to_string(),
//!     cluster_id: None,
//!     role: None,
//!     metadata: BTreeMap::new(),
//! };
//! let body = serde_json::to_value(&spec).unwrap();
//! assert!(body["cluster_id"].is_null());
//!
//! let update = NodeUpdateSpec {
//!     role: Some("master".to_string()),
//!     ..Default::default()
//! };
//! let body = serde_json::to_value(&update).unwrap();
//! assert_eq!(body.as_object().unwrap().len(), 1);
//! ```
//!
//! ## Batch Deletion
//!
//! `node delete` attempts every node it is given, in order, and only then
//! reports how many failed:
//!
//! ```text
//! $ clusterctl node delete node1 node2 node3
//! Failed to delete node node2: node node2 could not be found
//! Error: Failed to delete 1 of the 3 specified node(s).
//! ```

#![deny(missing_docs)]
mod config;
mod errors;
mod node;
mod service;

/// Command-line interface utilities for program termination and output formatting.
///
/// This module renders command results as tables, JSON, or YAML and provides
/// the helpers the binary uses to exit with an error.
pub mod cli_utils;

/// Command-line interface command handlers.
///
/// This module contains the command handlers for the clusterctl CLI
/// application, along with their error type and shared parsing helpers.
pub mod commands;

/// HTTP client for the clustering service.
///
/// This module provides the reqwest-based implementation of
/// [`ClusteringService`].
pub mod http_utils;

pub use config::{
    ClientConfig, ConfigError, ConfigOverrides, DEFAULT_BASE_URL, ENV_BASE_URL, ENV_PROJECT,
    ENV_TIMEOUT, ENV_TOKEN,
};
pub use errors::ClientError;
pub use node::{
    ActionAccepted, NODE_LIST_COLUMNS, Node, NodeDetailsArgs, NodeEnvelope, NodeListQuery,
    NodeListResponse, NodeSpec, NodeUpdateSpec, Parameters, SHORT_ID_LENGTH, format_timestamp,
    short_id,
};
pub use service::ClusteringService;
