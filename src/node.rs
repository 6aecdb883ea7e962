use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Columns rendered by `node list`, in order.
pub const NODE_LIST_COLUMNS: [&str; 9] = [
    "id",
    "name",
    "index",
    "status",
    "cluster_id",
    "physical_id",
    "profile_name",
    "created_at",
    "updated_at",
];

/// Number of leading characters kept when IDs are shortened for display.
pub const SHORT_ID_LENGTH: usize = 8;

/// `key=value` parameters from the command line. A key given more than once
/// keeps every value, in the order given.
pub type Parameters = BTreeMap<String, Vec<String>>;

//////////////////////////////////////////////// Node /////////////////////////////////////////////////

/// A node as reported by the clustering service.
///
/// The service is loose about which keys it sends and whether absent values
/// are `null` or missing; both deserialize to `None`, an empty string or
/// map, or `-1` for `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Canonical node ID.
    pub id: String,
    /// Human-assigned name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Index of the node within its cluster, `-1` for orphans.
    #[serde(default = "orphan_index", deserialize_with = "null_as_orphan")]
    pub index: i64,
    /// Lifecycle status, e.g. `ACTIVE` or `INIT`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    /// Explanation of the current status.
    #[serde(default)]
    pub status_reason: Option<String>,
    /// Owning cluster, if any.
    #[serde(default)]
    pub cluster_id: Option<String>,
    /// ID of the backing physical resource.
    #[serde(default)]
    pub physical_id: Option<String>,
    /// Profile the node was built from.
    #[serde(default)]
    pub profile_id: Option<String>,
    /// Name of the profile the node was built from.
    #[serde(default)]
    pub profile_name: Option<String>,
    /// Owning project.
    #[serde(default)]
    pub project: Option<String>,
    /// Owning user.
    #[serde(default)]
    pub user: Option<String>,
    /// Owning domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Role of the node within its cluster.
    #[serde(default)]
    pub role: Option<String>,
    /// When the node record was initialized.
    #[serde(default, with = "timestamp")]
    pub init_at: Option<DateTime<Utc>>,
    /// When the node was created.
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the node was last updated.
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// User supplied key/value metadata.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
    /// Service maintained data.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Map<String, Value>,
    /// Physical resource details; only populated when explicitly requested.
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: Map<String, Value>,
}

fn orphan_index() -> i64 {
    -1
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_orphan<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or_else(orphan_index))
}

/// Timestamps arrive either as RFC 3339 or as naive ISO 8601 in UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(time) => serializer.serialize_str(&super::format_timestamp(time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(time) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(time.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Some(naive.and_utc()))
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

/// Formats a timestamp the way the service reports it.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Shortens an ID for display.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LENGTH) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

impl Node {
    /// Renders the `node list` row for this node.
    ///
    /// Unless `full_id` is set, the `id`, `cluster_id` and `physical_id`
    /// columns are shortened; the node itself is untouched.
    pub fn list_row(&self, full_id: bool) -> Vec<String> {
        let id = |value: &str| {
            if full_id {
                value.to_string()
            } else {
                short_id(value).to_string()
            }
        };
        vec![
            id(&self.id),
            self.name.clone(),
            self.index.to_string(),
            self.status.clone(),
            id(self.cluster_id.as_deref().unwrap_or_default()),
            id(self.physical_id.as_deref().unwrap_or_default()),
            self.profile_name.clone().unwrap_or_default(),
            optional_timestamp(self.created_at.as_ref()),
            optional_timestamp(self.updated_at.as_ref()),
        ]
    }

    /// Renders every field of the node as sorted `(field, value)` pairs.
    ///
    /// `details` is only included when `with_details` is set, since the
    /// service leaves it empty unless asked for it.
    pub fn field_rows(&self, with_details: bool) -> Vec<(String, String)> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        let mut rows = vec![
            ("cluster_id".to_string(), text(&self.cluster_id)),
            ("created_at".to_string(), optional_timestamp(self.created_at.as_ref())),
            ("data".to_string(), json_map(&self.data)),
            ("domain".to_string(), text(&self.domain)),
            ("id".to_string(), self.id.clone()),
            ("index".to_string(), self.index.to_string()),
            ("init_at".to_string(), optional_timestamp(self.init_at.as_ref())),
            ("metadata".to_string(), json_map(&self.metadata)),
            ("name".to_string(), self.name.clone()),
            ("physical_id".to_string(), text(&self.physical_id)),
            ("profile_id".to_string(), text(&self.profile_id)),
            ("profile_name".to_string(), text(&self.profile_name)),
            ("project".to_string(), text(&self.project)),
            ("role".to_string(), text(&self.role)),
            ("status".to_string(), self.status.clone()),
            ("status_reason".to_string(), text(&self.status_reason)),
            ("updated_at".to_string(), optional_timestamp(self.updated_at.as_ref())),
            ("user".to_string(), text(&self.user)),
        ];
        if with_details {
            rows.push(("details".to_string(), details_block(&self.details)));
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

fn optional_timestamp(time: Option<&DateTime<Utc>>) -> String {
    time.map(format_timestamp).unwrap_or_default()
}

fn json_map(map: &Map<String, Value>) -> String {
    Value::Object(map.clone()).to_string()
}

/// One `property: value` line per detail, sorted by property.
fn details_block(details: &Map<String, Value>) -> String {
    let mut lines: Vec<String> = details
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect();
    lines.sort();
    lines.join("\n")
}

////////////////////////////////////////////// Requests ///////////////////////////////////////////////

/// Filters and paging for `list_nodes`.
///
/// Every declared field is always present; unset options carry their
/// defaults rather than being dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeListQuery {
    /// Only list nodes of this cluster.
    pub cluster_id: Option<String>,
    /// List nodes from all projects.
    pub global_project: bool,
    /// ID of the last node seen; listing starts after it.
    pub marker: Option<String>,
    /// Maximum number of nodes to return.
    pub limit: Option<u32>,
    /// Sort keys, `key[:dir][,key[:dir]...]`. Validated by the service.
    pub sort: Option<String>,
    /// Additional `key=value` filters; a repeated key matches any of its values.
    pub filters: Parameters,
}

impl NodeListQuery {
    /// Renders the query as URL query pairs.
    ///
    /// `global_project` is always sent; unset optional fields are left out of
    /// the URL since the service treats a missing key as its default.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(cluster_id) = &self.cluster_id {
            pairs.push(("cluster_id".to_string(), cluster_id.clone()));
        }
        pairs.push((
            "global_project".to_string(),
            self.global_project.to_string(),
        ));
        if let Some(marker) = &self.marker {
            pairs.push(("marker".to_string(), marker.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.clone()));
        }
        for (key, values) in &self.filters {
            for value in values {
                pairs.push((key.clone(), value.clone()));
            }
        }
        pairs
    }
}

/// Optional arguments for `get_node`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetailsArgs {
    /// Ask the service to include physical resource details.
    pub show_details: bool,
}

/// Body of a node creation request. All fields are always serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Name of the new node.
    pub name: String,
    /// Profile name or ID; resolved by the service.
    pub profile_id: String,
    /// Cluster to join, if any.
    pub cluster_id: Option<String>,
    /// Role within the cluster, if any.
    pub role: Option<String>,
    /// Key/value metadata.
    #[serde(with = "parameters")]
    pub metadata: Parameters,
}

/// Body of a node update request.
///
/// Only fields that are `Some` are serialized, so the service keeps its
/// current value for everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdateSpec {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New profile name or ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    /// New role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Replacement metadata.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "parameters::optional"
    )]
    pub metadata: Option<Parameters>,
}

impl NodeUpdateSpec {
    /// True when no field would be sent.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.profile_id.is_none()
            && self.role.is_none()
            && self.metadata.is_none()
    }
}

/// Parameter values are sent as a string, or as a list for a repeated key.
mod parameters {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Parameters;

    #[derive(Serialize)]
    #[serde(untagged)]
    enum WireRef<'a> {
        One(&'a str),
        Many(&'a [String]),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        One(String),
        Many(Vec<String>),
    }

    fn to_wire(values: &[String]) -> WireRef<'_> {
        match values {
            [one] => WireRef::One(one),
            many => WireRef::Many(many),
        }
    }

    fn from_wire(wire: BTreeMap<String, Wire>) -> Parameters {
        wire.into_iter()
            .map(|(key, value)| match value {
                Wire::One(one) => (key, vec![one]),
                Wire::Many(many) => (key, many),
            })
            .collect()
    }

    pub fn serialize<S>(params: &Parameters, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(params.iter().map(|(key, values)| (key, to_wire(values))))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Parameters, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(from_wire(BTreeMap::deserialize(deserializer)?))
    }

    pub mod optional {
        use std::collections::BTreeMap;

        use serde::{Deserialize, Deserializer, Serializer};

        use super::{Parameters, Wire, from_wire};

        pub fn serialize<S>(params: &Option<Parameters>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match params {
                Some(params) => super::serialize(params, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Parameters>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<BTreeMap<String, Wire>>::deserialize(deserializer)?.map(from_wire))
        }
    }
}

/// The action the service queued in response to a node operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAccepted {
    /// ID of the queued action.
    pub action: String,
}

///////////////////////////////////////////// Envelopes ///////////////////////////////////////////////

/// Wrapper the service puts around single-node bodies.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeEnvelope<T> {
    /// The wrapped value.
    pub node: T,
}

/// Body of a node listing response.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeListResponse {
    /// The listed nodes, in service order.
    pub nodes: Vec<Node>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listed_node() -> Value {
        json!({
            "cluster_id": null,
            "created_at": "2015-02-27T04:39:21",
            "data": {},
            "details": {},
            "domain": null,
            "id": "573aa1ba-bf45-49fd-907d-6b5d6e6adfd3",
            "index": -1,
            "init_at": "2015-02-27T04:39:18",
            "metadata": {},
            "name": "node00a",
            "physical_id": "cc028275-d078-4729-bf3e-154b7359814b",
            "profile_id": "edc63d0a-2ca4-48fa-9854-27926da76a4a",
            "profile_name": "mystack",
            "project": "6e18cc2bdbeb48a5b3cad2dc499f6804",
            "role": null,
            "status": "ACTIVE",
            "status_reason": "Creation succeeded",
            "updated_at": null,
            "user": "5e5bf8027826429c96af157f68dc9072"
        })
    }

    #[test]
    fn node_deserializes_service_record() {
        let node: Node = serde_json::from_value(listed_node()).unwrap();
        assert_eq!(node.name, "node00a");
        assert_eq!(node.index, -1);
        assert_eq!(node.cluster_id, None);
        assert_eq!(node.profile_name.as_deref(), Some("mystack"));
        assert_eq!(
            node.created_at.map(|t| format_timestamp(&t)).as_deref(),
            Some("2015-02-27T04:39:21Z")
        );
        assert_eq!(node.updated_at, None);
    }

    #[test]
    fn node_tolerates_null_maps_and_missing_keys() {
        let node: Node = serde_json::from_value(json!({
            "id": "abc",
            "metadata": null,
            "details": null,
            "created_at": "2016-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(node.index, -1);
        assert!(node.metadata.is_empty());
        assert!(node.details.is_empty());
        assert!(node.created_at.is_some());
    }

    #[test]
    fn node_tolerates_null_scalars() {
        let mut raw = listed_node();
        raw["name"] = Value::Null;
        raw["status"] = Value::Null;
        raw["index"] = Value::Null;
        let node: Node = serde_json::from_value(raw).unwrap();
        assert_eq!(node.name, "");
        assert_eq!(node.status, "");
        assert_eq!(node.index, -1);

        let listing: NodeListResponse = serde_json::from_value(json!({
            "nodes": [listed_node(), {"id": "n-2", "name": null, "index": null}]
        }))
        .unwrap();
        assert_eq!(listing.nodes.len(), 2);
    }

    #[test]
    fn node_rejects_garbage_timestamp() {
        let mut raw = listed_node();
        raw["created_at"] = json!("yesterday");
        assert!(serde_json::from_value::<Node>(raw).is_err());
    }

    #[test]
    fn list_row_shortens_ids_unless_full() {
        let node: Node = serde_json::from_value(listed_node()).unwrap();
        let short = node.list_row(false);
        assert_eq!(short.len(), NODE_LIST_COLUMNS.len());
        assert_eq!(short[0], "573aa1ba");
        assert_eq!(short[4], "");
        assert_eq!(short[5], "cc028275");
        let full = node.list_row(true);
        assert_eq!(full[0], "573aa1ba-bf45-49fd-907d-6b5d6e6adfd3");
        assert_eq!(full[8], "");
    }

    #[test]
    fn short_id_keeps_short_values() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id(""), "");
        assert_eq!(short_id("0123456789"), "01234567");
    }

    #[test]
    fn field_rows_are_sorted_and_hide_details() {
        let mut raw = listed_node();
        raw["details"] = json!({"OS-DCF:diskConfig": "MANUAL"});
        let node: Node = serde_json::from_value(raw).unwrap();

        let rows = node.field_rows(false);
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert!(!keys.contains(&"details"));

        let rows = node.field_rows(true);
        let details = rows.iter().find(|(k, _)| k == "details").unwrap();
        assert_eq!(details.1, "OS-DCF:diskConfig: MANUAL");
    }

    #[test]
    fn default_query_always_sends_global_project() {
        let pairs = NodeListQuery::default().query_pairs();
        assert_eq!(
            pairs,
            vec![("global_project".to_string(), "false".to_string())]
        );
    }

    #[test]
    fn query_pairs_include_filters() {
        let mut query = NodeListQuery {
            cluster_id: Some("c1".to_string()),
            limit: Some(3),
            sort: Some("name:asc".to_string()),
            ..Default::default()
        };
        query
            .filters
            .insert("status".to_string(), vec!["ACTIVE".to_string()]);
        let pairs = query.query_pairs();
        assert!(pairs.contains(&("cluster_id".to_string(), "c1".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "3".to_string())));
        assert!(pairs.contains(&("sort".to_string(), "name:asc".to_string())));
        assert!(pairs.contains(&("status".to_string(), "ACTIVE".to_string())));
    }

    #[test]
    fn repeated_filter_keys_become_repeated_pairs() {
        let mut query = NodeListQuery::default();
        query.filters.insert(
            "status".to_string(),
            vec!["ACTIVE".to_string(), "ERROR".to_string()],
        );
        let pairs = query.query_pairs();
        assert_eq!(
            &pairs[1..],
            &[
                ("status".to_string(), "ACTIVE".to_string()),
                ("status".to_string(), "ERROR".to_string()),
            ]
        );
    }

    #[test]
    fn repeated_metadata_keys_serialize_as_lists() {
        let mut metadata = Parameters::new();
        metadata.insert("k1".to_string(), vec!["v1".to_string()]);
        metadata.insert("k2".to_string(), vec!["a".to_string(), "b".to_string()]);
        let update = NodeUpdateSpec {
            metadata: Some(metadata.clone()),
            ..Default::default()
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, json!({"metadata": {"k1": "v1", "k2": ["a", "b"]}}));
        let back: NodeUpdateSpec = serde_json::from_value(body).unwrap();
        assert_eq!(back.metadata, Some(metadata));
    }

    #[test]
    fn create_spec_serializes_every_field() {
        let spec = NodeSpec {
            name: "my_node".to_string(),
            profile_id: "mystack".to_string(),
            cluster_id: None,
            role: None,
            metadata: BTreeMap::new(),
        };
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "cluster_id": null,
                "metadata": {},
                "name": "my_node",
                "profile_id": "mystack",
                "role": null
            })
        );
    }

    #[test]
    fn update_spec_serializes_only_supplied_fields() {
        let spec = NodeUpdateSpec {
            role: Some("master".to_string()),
            ..Default::default()
        };
        assert!(!spec.is_empty());
        assert_eq!(serde_json::to_value(&spec).unwrap(), json!({"role": "master"}));
        assert!(NodeUpdateSpec::default().is_empty());
    }
}
