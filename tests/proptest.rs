use std::collections::BTreeSet;
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use proptest::prelude::*;

use clusterctl::commands::shared::parse_key_value_pairs;
use clusterctl::commands::{CommandContext, CommandOutput, Confirm, handle_node_command};
use clusterctl::{
    ActionAccepted, ClientError, ClusteringService, Node, NodeDetailsArgs, NodeListQuery,
    NodeSpec, NodeUpdateSpec, Parameters,
};

/// Service double that only knows how to delete.
#[derive(Default)]
struct DeleteOnlyService {
    failing: BTreeSet<String>,
    attempted: Mutex<Vec<(String, bool)>>,
}

impl DeleteOnlyService {
    fn unsupported<T>() -> Result<T, ClientError> {
        Err(ClientError::InvalidRequest("not supported by this double".into()))
    }
}

#[async_trait]
impl ClusteringService for DeleteOnlyService {
    async fn list_nodes(&self, _: &NodeListQuery) -> Result<Vec<Node>, ClientError> {
        Self::unsupported()
    }

    async fn get_node(&self, _: &str, _: Option<NodeDetailsArgs>) -> Result<Node, ClientError> {
        Self::unsupported()
    }

    async fn create_node(&self, _: &NodeSpec) -> Result<Node, ClientError> {
        Self::unsupported()
    }

    async fn update_node(&self, _: &str, _: &NodeUpdateSpec) -> Result<Node, ClientError> {
        Self::unsupported()
    }

    async fn find_node(&self, _: &str) -> Result<Option<Node>, ClientError> {
        Self::unsupported()
    }

    async fn delete_node(&self, node: &str, force: bool) -> Result<(), ClientError> {
        self.attempted
            .lock()
            .unwrap()
            .push((node.to_string(), force));
        if self.failing.contains(node) {
            Err(ClientError::NotFound {
                resource: format!("node {}", node),
            })
        } else {
            Ok(())
        }
    }

    async fn check_node(&self, _: &str) -> Result<ActionAccepted, ClientError> {
        Self::unsupported()
    }

    async fn recover_node(&self, _: &str, _: bool) -> Result<ActionAccepted, ClientError> {
        Self::unsupported()
    }
}

struct NoTerminal;

impl Confirm for NoTerminal {
    fn is_interactive(&self) -> bool {
        false
    }

    fn read_response(&self, _: &str) -> io::Result<String> {
        Ok(String::new())
    }
}

mod strategies {
    use super::*;

    pub fn key_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,11}"
    }

    pub fn value_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_.:-]{0,12}"
    }

    pub fn pairs_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec((key_strategy(), value_strategy()), 0..8)
    }

    /// Distinct node names, each paired with whether its deletion fails.
    pub fn batch_strategy() -> impl Strategy<Value = Vec<(String, bool)>> {
        prop::collection::btree_set("node[0-9a-f]{4}", 1..10).prop_flat_map(|names| {
            let names: Vec<String> = names.into_iter().collect();
            let len = names.len();
            (Just(names), prop::collection::vec(any::<bool>(), len))
                .prop_map(|(names, fails)| names.into_iter().zip(fails).collect::<Vec<_>>())
        })
    }
}

fn expected_map(pairs: &[(String, String)]) -> Parameters {
    let mut params = Parameters::new();
    for (key, value) in pairs {
        params.entry(key.clone()).or_default().push(value.clone());
    }
    params
}

proptest! {
    #[test]
    fn joined_pairs_keep_every_value_in_order(pairs in strategies::pairs_strategy()) {
        let joined = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";");
        let parsed = parse_key_value_pairs(&[joined]).unwrap();
        prop_assert_eq!(parsed, expected_map(&pairs));
    }

    #[test]
    fn repeated_flags_match_a_single_joined_flag(pairs in strategies::pairs_strategy()) {
        let separate: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        let joined = separate.join(";");
        prop_assert_eq!(
            parse_key_value_pairs(&separate).unwrap(),
            parse_key_value_pairs(&[joined]).unwrap()
        );
    }

    #[test]
    fn segments_without_separator_are_rejected(
        pairs in strategies::pairs_strategy(),
        bare in strategies::key_strategy(),
    ) {
        let mut params: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        params.push(bare.clone());
        let err = parse_key_value_pairs(&params).unwrap_err();
        prop_assert_eq!(
            err.to_string(),
            format!("Malformed parameter({}). Use the key=value format.", bare)
        );
    }

    #[test]
    fn list_query_always_carries_global_project(
        global_project in any::<bool>(),
        limit in prop::option::of(1u32..1000),
        filters in strategies::pairs_strategy(),
    ) {
        const RESERVED: [&str; 5] = ["cluster_id", "global_project", "marker", "limit", "sort"];
        prop_assume!(filters.iter().all(|(k, _)| !RESERVED.contains(&k.as_str())));
        let query = NodeListQuery {
            global_project,
            limit,
            filters: expected_map(&filters),
            ..Default::default()
        };
        let pairs = query.query_pairs();

        let global: Vec<&(String, String)> =
            pairs.iter().filter(|(k, _)| k == "global_project").collect();
        prop_assert_eq!(global.len(), 1);
        prop_assert_eq!(&global[0].1, &global_project.to_string());
        prop_assert_eq!(
            pairs.iter().any(|(k, _)| k == "limit"),
            limit.is_some()
        );
        let filter_pairs: Vec<(String, String)> = pairs
            .iter()
            .filter(|(k, _)| query.filters.contains_key(k))
            .cloned()
            .collect();
        prop_assert_eq!(filter_pairs.len(), filters.len());
        for (key, values) in &query.filters {
            let sent: Vec<&String> = filter_pairs
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v)
                .collect();
            prop_assert_eq!(sent, values.iter().collect::<Vec<_>>());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn batch_delete_attempts_every_node_and_counts_failures(
        batch in strategies::batch_strategy()
    ) {
        tokio::runtime::Runtime::new().unwrap().block_on(async {
            let service = DeleteOnlyService {
                failing: batch
                    .iter()
                    .filter(|(_, fails)| *fails)
                    .map(|(name, _)| name.clone())
                    .collect(),
                ..Default::default()
            };
            let confirm = NoTerminal;
            let context = CommandContext::new(&service, &confirm);

            let mut args = vec!["delete".to_string(), "--force".to_string()];
            args.extend(batch.iter().map(|(name, _)| name.clone()));
            let result = handle_node_command(&args, context).await;

            let attempted = service.attempted.lock().unwrap().clone();
            let expected: Vec<(String, bool)> =
                batch.iter().map(|(name, _)| (name.clone(), false)).collect();
            prop_assert_eq!(attempted, expected);

            let failures = batch.iter().filter(|(_, fails)| *fails).count();
            if let Err(err) = &result {
                prop_assert_eq!(err.failures().len(), failures);
            }
            if failures == 0 {
                prop_assert_eq!(
                    result.unwrap(),
                    CommandOutput::Messages(vec!["Request accepted".to_string()])
                );
            } else {
                prop_assert_eq!(
                    result.unwrap_err().to_string(),
                    format!(
                        "Failed to delete {} of the {} specified node(s).",
                        failures,
                        batch.len()
                    )
                );
            }
            Ok(())
        }).unwrap()
    }
}
