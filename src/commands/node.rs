//! # Node Command Handler
//!
//! This module handles node-related CLI commands: listing, showing, creating,
//! updating and deleting nodes, and queuing check/recover actions.

use getopts::Options;
use tracing::{debug, info, warn};

use crate::commands::CommandOutput;
use crate::commands::errors::CommandError;
use crate::commands::prompt::is_affirmative;
use crate::commands::shared::{
    CommandContext, dispatch_command, parse_flags, parse_key_value_pairs, validate_positionals,
};
use crate::{
    ClientError, ClusteringService, NodeDetailsArgs, NodeListQuery, NodeSpec, NodeUpdateSpec,
};

const NODE_USAGE: &str =
    "Usage: clusterctl node <list|show|create|update|delete|check|recover> [args...]";
const LIST_USAGE: &str = "Usage: clusterctl node list [options]";
const SHOW_USAGE: &str = "Usage: clusterctl node show [--details] <node>";
const CREATE_USAGE: &str = "Usage: clusterctl node create --profile <profile> [options] <name>";
const UPDATE_USAGE: &str = "Usage: clusterctl node update [options] <node>";
const DELETE_USAGE: &str = "Usage: clusterctl node delete [--force] <node> [<node>...]";
const CHECK_USAGE: &str = "Usage: clusterctl node check <node> [<node>...]";
const RECOVER_USAGE: &str = "Usage: clusterctl node recover [--check] <node> [<node>...]";

/// Prompt shown before deleting nodes interactively.
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this node(s) [y/N]?";

/// Handles all node-related commands.
///
/// # Arguments
/// * `args` - Command arguments (first element is the subcommand)
/// * `context` - Service client and confirmation source
pub async fn handle_node_command(
    args: &[String],
    context: CommandContext<'_>,
) -> Result<CommandOutput, CommandError> {
    dispatch_command!("node", NODE_USAGE, args, context, {
        "list" => handle_node_list,
        "show" => handle_node_show,
        "create" => handle_node_create,
        "update" => handle_node_update,
        "delete" => handle_node_delete,
        "check" => handle_node_check,
        "recover" => handle_node_recover,
    })
}

/// Handles node listing.
///
/// Every field of the query is always handed to the service; the sort key is
/// not checked locally.
async fn handle_node_list(
    args: &[String],
    context: CommandContext<'_>,
) -> Result<CommandOutput, CommandError> {
    let mut opts = Options::new();
    opts.optopt("", "cluster", "Only list nodes belonging to this cluster", "CLUSTER");
    opts.optflag("", "global-project", "List nodes from all projects");
    opts.optopt("", "marker", "ID of the last node seen in a previous page", "ID");
    opts.optopt("", "limit", "Maximum number of nodes to return", "N");
    opts.optopt("", "sort", "Sort keys and directions, e.g. name:asc", "KEY[:DIR]");
    opts.optmulti("", "filter", "Filter nodes; repeatable or ';'-joined", "KEY=VALUE");
    opts.optflag("", "full-id", "Print IDs without truncation");

    let matches = parse_flags(&opts, args, LIST_USAGE)?;
    validate_positionals(&matches.free, 0, Some(0), "list", LIST_USAGE)?;

    let limit = match matches.opt_str("limit") {
        Some(raw) => Some(
            raw.parse::<u32>()
                .map_err(|_| CommandError::user(format!("Invalid limit: {}", raw)))?,
        ),
        None => None,
    };
    let query = NodeListQuery {
        cluster_id: matches.opt_str("cluster"),
        global_project: matches.opt_present("global-project"),
        marker: matches.opt_str("marker"),
        limit,
        sort: matches.opt_str("sort"),
        filters: parse_key_value_pairs(&matches.opt_strs("filter"))?,
    };

    debug!(?query, "listing nodes");
    let nodes = context.service.list_nodes(&query).await?;
    Ok(CommandOutput::Nodes {
        nodes,
        full_id: matches.opt_present("full-id"),
    })
}

/// Handles showing a single node.
async fn handle_node_show(
    args: &[String],
    context: CommandContext<'_>,
) -> Result<CommandOutput, CommandError> {
    let mut opts = Options::new();
    opts.optflag("", "details", "Include physical resource details");

    let matches = parse_flags(&opts, args, SHOW_USAGE)?;
    validate_positionals(&matches.free, 1, Some(1), "show", SHOW_USAGE)?;

    let details = matches
        .opt_present("details")
        .then_some(NodeDetailsArgs { show_details: true });
    show_node(context.service, &matches.free[0], details).await
}

/// Handles node creation.
async fn handle_node_create(
    args: &[String],
    context: CommandContext<'_>,
) -> Result<CommandOutput, CommandError> {
    let mut opts = Options::new();
    opts.reqopt("", "profile", "Profile name or ID used to build the node", "PROFILE");
    opts.optopt("", "cluster", "Cluster the node joins", "CLUSTER");
    opts.optopt("", "role", "Role of the node within its cluster", "ROLE");
    opts.optmulti("", "metadata", "Node metadata; repeatable or ';'-joined", "KEY=VALUE");

    let matches = parse_flags(&opts, args, CREATE_USAGE)?;
    validate_positionals(&matches.free, 1, Some(1), "create", CREATE_USAGE)?;

    let spec = NodeSpec {
        name: matches.free[0].clone(),
        profile_id: matches.opt_str("profile").unwrap_or_default(),
        cluster_id: matches.opt_str("cluster"),
        role: matches.opt_str("role"),
        metadata: parse_key_value_pairs(&matches.opt_strs("metadata"))?,
    };

    let node = context.service.create_node(&spec).await?;
    info!(node = %node.id, name = %spec.name, "node creation accepted");
    show_node(context.service, &node.id, None).await
}

/// Handles node update. Only flags given on the command line are sent.
async fn handle_node_update(
    args: &[String],
    context: CommandContext<'_>,
) -> Result<CommandOutput, CommandError> {
    let mut opts = Options::new();
    opts.optopt("", "name", "New name for the node", "NAME");
    opts.optopt("", "profile", "New profile name or ID", "PROFILE");
    opts.optopt("", "role", "New role for the node", "ROLE");
    opts.optmulti("", "metadata", "Replacement metadata; repeatable or ';'-joined", "KEY=VALUE");

    let matches = parse_flags(&opts, args, UPDATE_USAGE)?;
    validate_positionals(&matches.free, 1, Some(1), "update", UPDATE_USAGE)?;
    let identifier = &matches.free[0];

    let metadata = matches.opt_strs("metadata");
    let spec = NodeUpdateSpec {
        name: matches.opt_str("name"),
        profile_id: matches.opt_str("profile"),
        role: matches.opt_str("role"),
        metadata: if metadata.is_empty() {
            None
        } else {
            Some(parse_key_value_pairs(&metadata)?)
        },
    };

    let node = match context.service.find_node(identifier).await {
        Ok(Some(node)) => node,
        Ok(None) => return Err(CommandError::node_not_found(identifier)),
        Err(e) if e.is_not_found() => return Err(CommandError::node_not_found(identifier)),
        Err(e) => return Err(e.into()),
    };

    debug!(node = %node.id, ?spec, "updating node");
    context.service.update_node(&node.id, &spec).await?;
    show_node(context.service, &node.id, None).await
}

/// Handles deletion of one or more nodes.
///
/// `--force` only skips the confirmation prompt; it is never forwarded to
/// the service.
async fn handle_node_delete(
    args: &[String],
    context: CommandContext<'_>,
) -> Result<CommandOutput, CommandError> {
    let mut opts = Options::new();
    opts.optflag("", "force", "Skip the confirmation prompt");

    let matches = parse_flags(&opts, args, DELETE_USAGE)?;
    validate_positionals(&matches.free, 1, None, "delete", DELETE_USAGE)?;

    if !matches.opt_present("force") && context.confirm.is_interactive() {
        let response = context
            .confirm
            .read_response(DELETE_PROMPT)
            .map_err(|e| CommandError::user(format!("Failed to read confirmation: {}", e)))?;
        if !is_affirmative(&response) {
            info!("node deletion cancelled");
            return Ok(CommandOutput::Nothing);
        }
    }

    let outcomes = delete_nodes(context.service, &matches.free).await;
    let failures: Vec<String> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            DeleteOutcome::Failed { node, error } => {
                Some(format!("Failed to delete node {}: {}", node, error))
            }
            DeleteOutcome::Deleted { .. } => None,
        })
        .collect();
    if !failures.is_empty() {
        let summary = CommandError::user(format!(
            "Failed to delete {} of the {} specified node(s).",
            failures.len(),
            outcomes.len()
        ));
        return Err(summary.with_progress(Vec::new(), failures));
    }
    Ok(CommandOutput::Messages(vec!["Request accepted".to_string()]))
}

/// Handles queuing health checks for one or more nodes.
///
/// Stops at the first node that cannot be checked; lines for the nodes
/// already accepted travel with the error.
async fn handle_node_check(
    args: &[String],
    context: CommandContext<'_>,
) -> Result<CommandOutput, CommandError> {
    let opts = Options::new();
    let matches = parse_flags(&opts, args, CHECK_USAGE)?;
    validate_positionals(&matches.free, 1, None, "check", CHECK_USAGE)?;

    let mut lines = Vec::with_capacity(matches.free.len());
    for node in &matches.free {
        match context.service.check_node(node).await {
            Ok(accepted) => lines.push(format!(
                "Node check request on node {} is accepted by action {}.",
                node, accepted.action
            )),
            Err(e) => return Err(resolve_error(e, node).with_progress(lines, Vec::new())),
        }
    }
    Ok(CommandOutput::Messages(lines))
}

/// Handles queuing recovery for one or more nodes.
async fn handle_node_recover(
    args: &[String],
    context: CommandContext<'_>,
) -> Result<CommandOutput, CommandError> {
    let mut opts = Options::new();
    opts.optflag("", "check", "Check node health before recovering");
    let matches = parse_flags(&opts, args, RECOVER_USAGE)?;
    validate_positionals(&matches.free, 1, None, "recover", RECOVER_USAGE)?;

    let check = matches.opt_present("check");
    let mut lines = Vec::with_capacity(matches.free.len());
    for node in &matches.free {
        match context.service.recover_node(node, check).await {
            Ok(accepted) => lines.push(format!(
                "Node recover request on node {} is accepted by action {}.",
                node, accepted.action
            )),
            Err(e) => return Err(resolve_error(e, node).with_progress(lines, Vec::new())),
        }
    }
    Ok(CommandOutput::Messages(lines))
}

/////////////////////////////////////////////// Helpers ///////////////////////////////////////////////

/// Result of deleting one node of a batch.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The service accepted the deletion.
    Deleted {
        /// The identifier as given.
        node: String,
    },
    /// The deletion failed.
    Failed {
        /// The identifier as given.
        node: String,
        /// Why it failed.
        error: ClientError,
    },
}

impl DeleteOutcome {
    /// True for [`DeleteOutcome::Failed`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Deletes each node in order, continuing past failures.
pub async fn delete_nodes(
    service: &dyn ClusteringService,
    nodes: &[String],
) -> Vec<DeleteOutcome> {
    let mut outcomes = Vec::with_capacity(nodes.len());
    for node in nodes {
        match service.delete_node(node, false).await {
            Ok(()) => {
                info!(node = %node, "node deletion accepted");
                outcomes.push(DeleteOutcome::Deleted { node: node.clone() });
            }
            Err(error) => {
                warn!(node = %node, %error, "failed to delete node");
                outcomes.push(DeleteOutcome::Failed {
                    node: node.clone(),
                    error,
                });
            }
        }
    }
    outcomes
}

/// Fetches a node for display, translating a missing node into a user error.
async fn show_node(
    service: &dyn ClusteringService,
    identifier: &str,
    details: Option<NodeDetailsArgs>,
) -> Result<CommandOutput, CommandError> {
    let node = service
        .get_node(identifier, details)
        .await
        .map_err(|e| resolve_error(e, identifier))?;
    Ok(CommandOutput::Node {
        node,
        details: details.is_some_and(|d| d.show_details),
    })
}

fn resolve_error(error: ClientError, identifier: &str) -> CommandError {
    if error.is_not_found() {
        CommandError::node_not_found(identifier)
    } else {
        error.into()
    }
}
