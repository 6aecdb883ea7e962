//! The clustering-service operations the command layer depends on.

use async_trait::async_trait;

use crate::{
    ActionAccepted, ClientError, Node, NodeDetailsArgs, NodeListQuery, NodeSpec, NodeUpdateSpec,
};

/// Node operations offered by the clustering service.
///
/// Command handlers only ever talk to the service through this trait, so the
/// HTTP client can be swapped for a fake in tests.
#[async_trait]
pub trait ClusteringService: Send + Sync {
    /// Lists nodes matching `query`.
    async fn list_nodes(&self, query: &NodeListQuery) -> Result<Vec<Node>, ClientError>;

    /// Fetches one node by name or ID.
    ///
    /// `details` is `None` unless the caller explicitly asked for details.
    async fn get_node(
        &self,
        node: &str,
        details: Option<NodeDetailsArgs>,
    ) -> Result<Node, ClientError>;

    /// Creates a node.
    async fn create_node(&self, spec: &NodeSpec) -> Result<Node, ClientError>;

    /// Applies a partial update to the node with canonical ID `node_id`.
    async fn update_node(&self, node_id: &str, spec: &NodeUpdateSpec)
    -> Result<Node, ClientError>;

    /// Resolves a name or ID to a node, or `None` if nothing matches.
    async fn find_node(&self, name_or_id: &str) -> Result<Option<Node>, ClientError>;

    /// Deletes a node. With `force` set, a node that is already gone is not an
    /// error.
    async fn delete_node(&self, node: &str, force: bool) -> Result<(), ClientError>;

    /// Asks the service to check the health of a node.
    async fn check_node(&self, node: &str) -> Result<ActionAccepted, ClientError>;

    /// Asks the service to recover a node, optionally checking it first.
    async fn recover_node(&self, node: &str, check: bool) -> Result<ActionAccepted, ClientError>;
}
