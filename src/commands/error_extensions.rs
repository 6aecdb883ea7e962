//! # Error Extensions for Handled
//!
//! This module extends existing error types in the codebase to implement
//! Handle<UserError> for consistent error property extraction.

use super::errors::UserError;
use crate::{ClientError, ConfigError};
use handled::Handle;

/// Implement Handle<UserError> for ClientError
impl Handle<UserError> for ClientError {
    fn handle(&self) -> Option<UserError> {
        let usage_hint = match self {
            ClientError::Ambiguous { .. } => {
                Some("Several nodes share that name. Pass the node ID instead.".to_string())
            }
            ClientError::Transport(_) => Some(
                "Could not reach the clustering service. Check --base-url or CLUSTERCTL_URL."
                    .to_string(),
            ),
            ClientError::InvalidRequest(_) => {
                Some("Check the configured token and project values.".to_string())
            }
            _ => match self.status() {
                Some(404) => Some(
                    "The requested resource was not found. Check the ID and try again."
                        .to_string(),
                ),
                Some(400) => {
                    Some("Invalid request. Check your input data and try again.".to_string())
                }
                Some(401) => Some("Authentication required. Check your credentials.".to_string()),
                Some(403) => Some(
                    "Access forbidden. You may not have permission for this operation."
                        .to_string(),
                ),
                Some(429) => Some("Too many requests. Wait a moment and try again.".to_string()),
                Some(500..=599) => {
                    Some("Server error. The service may be temporarily unavailable.".to_string())
                }
                _ => None,
            },
        };

        Some(UserError {
            message: self.to_string(),
            usage_hint,
        })
    }
}

/// Implement Handle<UserError> for ConfigError
impl Handle<UserError> for ConfigError {
    fn handle(&self) -> Option<UserError> {
        let hint = match self {
            ConfigError::InvalidBaseUrl(_) => "Use a URL such as http://localhost:8778",
            ConfigError::InvalidTimeout(_) => "Give the timeout in seconds, e.g. --timeout 30",
        };
        Some(UserError {
            message: self.to_string(),
            usage_hint: Some(hint.to_string()),
        })
    }
}
