use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::{
    ActionAccepted, ClientConfig, ClientError, ClusteringService, Node, NodeDetailsArgs,
    NodeEnvelope, NodeListQuery, NodeListResponse, NodeSpec, NodeUpdateSpec,
};

const API_VERSION_PREFIX: &str = "v1";

/// HTTP implementation of [`ClusteringService`].
pub struct ClusteringClient {
    client: Client,
    base_url: String,
}

impl ClusteringClient {
    /// Builds a client from connection settings.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            headers.insert(
                HeaderName::from_static("x-auth-token"),
                header_value("X-Auth-Token", token)?,
            );
        }
        if let Some(project) = &config.project {
            headers.insert(
                HeaderName::from_static("x-project-id"),
                header_value("X-Project-Id", project)?,
            );
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Constructs a full API URL from a path
    pub fn api_url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}/{}", self.base_url, API_VERSION_PREFIX, path)
    }

    /// Builds `<base>/v1/nodes[/<segment>...]`, escaping each segment.
    fn nodes_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.api_url("nodes"))
            .map_err(|e| ClientError::InvalidRequest(format!("bad service URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidRequest("service URL cannot take a path".into()))?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "sending request");
        self.client.request(method, url)
    }

    async fn send_json<T>(&self, request: RequestBuilder, resource: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        let body = self.handle_response(response, resource).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_with_body<B, T>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        resource: &str,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(method, url).json(body), resource)
            .await
    }

    /// Maps non-success statuses to errors and returns the body text otherwise.
    async fn handle_response(
        &self,
        response: Response,
        resource: &str,
    ) -> Result<String, ClientError> {
        let status = response.status();
        debug!(status = status.as_u16(), resource, "received response");
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                resource: resource.to_string(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::Http {
                status: status.as_u16(),
                details: if body.is_empty() {
                    "No error details".to_string()
                } else {
                    body
                },
            })
        }
    }

    async fn node_action(
        &self,
        node: &str,
        action: serde_json::Value,
    ) -> Result<ActionAccepted, ClientError> {
        let url = self.nodes_url(&[node, "actions"])?;
        self.send_with_body(Method::POST, url, &action, &format!("node {}", node))
            .await
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::InvalidRequest(format!("{} header: {}", name, e)))
}

#[async_trait]
impl ClusteringService for ClusteringClient {
    async fn list_nodes(&self, query: &NodeListQuery) -> Result<Vec<Node>, ClientError> {
        let url = self.nodes_url(&[])?;
        let request = self.request(Method::GET, url).query(&query.query_pairs());
        let response: NodeListResponse = self.send_json(request, "nodes").await?;
        Ok(response.nodes)
    }

    async fn get_node(
        &self,
        node: &str,
        details: Option<NodeDetailsArgs>,
    ) -> Result<Node, ClientError> {
        let url = self.nodes_url(&[node])?;
        let mut request = self.request(Method::GET, url);
        if let Some(args) = details {
            request = request.query(&[("show_details", args.show_details)]);
        }
        let response: NodeEnvelope<Node> =
            self.send_json(request, &format!("node {}", node)).await?;
        Ok(response.node)
    }

    async fn create_node(&self, spec: &NodeSpec) -> Result<Node, ClientError> {
        let url = self.nodes_url(&[])?;
        let response: NodeEnvelope<Node> = self
            .send_with_body(Method::POST, url, &NodeEnvelope { node: spec }, "nodes")
            .await?;
        Ok(response.node)
    }

    async fn update_node(
        &self,
        node_id: &str,
        spec: &NodeUpdateSpec,
    ) -> Result<Node, ClientError> {
        let url = self.nodes_url(&[node_id])?;
        let response: NodeEnvelope<Node> = self
            .send_with_body(
                Method::PATCH,
                url,
                &NodeEnvelope { node: spec },
                &format!("node {}", node_id),
            )
            .await?;
        Ok(response.node)
    }

    async fn find_node(&self, name_or_id: &str) -> Result<Option<Node>, ClientError> {
        match self.get_node(name_or_id, None).await {
            Ok(node) => return Ok(Some(node)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let mut query = NodeListQuery::default();
        query
            .filters
            .insert("name".to_string(), vec![name_or_id.to_string()]);
        let mut matches = self.list_nodes(&query).await?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(ClientError::Ambiguous {
                identifier: name_or_id.to_string(),
                count,
            }),
        }
    }

    async fn delete_node(&self, node: &str, force: bool) -> Result<(), ClientError> {
        let url = self.nodes_url(&[node])?;
        let response = self.request(Method::DELETE, url).send().await?;
        match self.handle_response(response, &format!("node {}", node)).await {
            Ok(_) => Ok(()),
            Err(e) if force && e.is_not_found() => {
                debug!(node, "node already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn check_node(&self, node: &str) -> Result<ActionAccepted, ClientError> {
        self.node_action(node, json!({ "check": {} })).await
    }

    async fn recover_node(&self, node: &str, check: bool) -> Result<ActionAccepted, ClientError> {
        self.node_action(node, json!({ "recover": { "check": check } }))
            .await
    }
}
