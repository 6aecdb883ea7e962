//! # Shared Command Utilities
//!
//! This module provides shared parsing and validation functions used across
//! the command handlers, plus the dispatcher macro.

use crate::{ClusteringService, Parameters};
use crate::commands::errors::CommandError;
use crate::commands::prompt::Confirm;

/// Everything a command handler may talk to.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    /// The clustering service.
    pub service: &'a dyn ClusteringService,
    /// Confirmation source for destructive commands.
    pub confirm: &'a dyn Confirm,
}

impl<'a> CommandContext<'a> {
    /// Bundles a service and a confirmation source.
    pub fn new(service: &'a dyn ClusteringService, confirm: &'a dyn Confirm) -> Self {
        Self { service, confirm }
    }
}

/// Parses command flags, turning getopts failures into usage errors.
pub fn parse_flags(
    opts: &getopts::Options,
    args: &[String],
    usage: &str,
) -> Result<getopts::Matches, CommandError> {
    opts.parse(args)
        .map_err(|e| CommandError::usage(e.to_string(), opts.usage(usage)))
}

/// Validates the number of positional arguments.
///
/// # Arguments
/// * `free` - The positional arguments left after flag parsing
/// * `min_count` - The minimum number of positionals required
/// * `max_count` - The maximum allowed, or `None` for no limit
/// * `command` - The command name for error message
/// * `usage` - The usage string to display
pub fn validate_positionals(
    free: &[String],
    min_count: usize,
    max_count: Option<usize>,
    command: &str,
    usage: &str,
) -> Result<(), CommandError> {
    if free.len() < min_count {
        return Err(CommandError::usage(
            format!("{} command requires more arguments", command),
            usage,
        ));
    }
    if max_count.is_some_and(|max| free.len() > max) {
        return Err(CommandError::usage(
            format!("{} command has too many arguments", command),
            usage,
        ));
    }
    Ok(())
}

/// Parses `key=value` parameters into a map.
///
/// Each parameter may itself hold several pairs joined by `;`. Empty
/// segments are skipped. A repeated key collects all of its values in order.
pub fn parse_key_value_pairs<S>(params: &[S]) -> Result<Parameters, CommandError>
where
    S: AsRef<str>,
{
    let mut pairs = Parameters::new();
    for param in params {
        for segment in param.as_ref().split(';') {
            if segment.trim().is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    pairs
                        .entry(key.trim().to_string())
                        .or_default()
                        .push(value.to_string());
                }
                _ => {
                    return Err(CommandError::user(format!(
                        "Malformed parameter({}). Use the key=value format.",
                        segment
                    )));
                }
            }
        }
    }
    Ok(pairs)
}

/// Macro to generate command dispatcher boilerplate.
macro_rules! dispatch_command {
    ($command_name:expr, $usage:expr, $args:expr, $context:expr, {
        $($subcommand:expr => $handler:expr),* $(,)?
    }) => {
        if $args.is_empty() {
            Err(crate::commands::errors::CommandError::usage(
                format!("{} command requires a subcommand", $command_name),
                $usage,
            ))
        } else {
            match $args[0].as_str() {
                $(
                    $subcommand => $handler(&$args[1..], $context).await,
                )*
                _ => {
                    let available_subcommands = [$($subcommand),*];
                    Err(crate::commands::errors::CommandError::usage(
                        format!(
                            "Unknown {} subcommand '{}'. Available subcommands: {}",
                            $command_name,
                            $args[0],
                            available_subcommands.join(", ")
                        ),
                        $usage,
                    ))
                }
            }
        }
    };
}

pub(crate) use dispatch_command;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_joined_pairs() {
        let pairs = parse_key_value_pairs(&["key1=value1;key2=value2"]).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs["key1"], ["value1"]);
        assert_eq!(pairs["key2"], ["value2"]);
    }

    #[test]
    fn repeated_parameters_merge() {
        let pairs = parse_key_value_pairs(&["a=1", "b=2;c=3"]).unwrap();
        assert_eq!(pairs.keys().cloned().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn value_may_contain_equals() {
        let pairs = parse_key_value_pairs(&["expr=a=b"]).unwrap();
        assert_eq!(pairs["expr"], ["a=b"]);
    }

    #[test]
    fn repeated_keys_keep_every_value() {
        let pairs = parse_key_value_pairs(&["status=ACTIVE;status=ERROR", "status=INIT"]).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs["status"], ["ACTIVE", "ERROR", "INIT"]);
    }

    #[test]
    fn trailing_semicolon_is_ignored() {
        let pairs = parse_key_value_pairs(&["a=1;"]).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn malformed_parameter_is_rejected() {
        let err = parse_key_value_pairs(&["novalue"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed parameter(novalue). Use the key=value format."
        );
        assert!(parse_key_value_pairs(&["=v"]).is_err());
    }

    #[test]
    fn unknown_flags_are_usage_errors() {
        let mut opts = getopts::Options::new();
        opts.optflag("", "details", "Include details");
        let args = vec!["--bogus".to_string()];
        match parse_flags(&opts, &args, "Usage: clusterctl node show") {
            Err(CommandError::Usage { message, usage }) => {
                assert!(message.contains("bogus"));
                assert!(usage.contains("--details"));
            }
            other => panic!("expected a usage error, got {:?}", other.map(|m| m.free)),
        }
    }

    #[test]
    fn positional_bounds() {
        let free = vec!["a".to_string(), "b".to_string()];
        assert!(validate_positionals(&free, 1, None, "delete", "usage").is_ok());
        assert!(validate_positionals(&free, 1, Some(1), "show", "usage").is_err());
        assert!(validate_positionals(&[], 1, Some(1), "show", "usage").is_err());
    }
}
