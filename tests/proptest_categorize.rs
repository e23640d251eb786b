//! Property-based tests using proptest
//!
//! These tests verify that categorization is total and deterministic, that
//! rule order breaks ties, and that a snapshot partitions its input exactly.

use discovery_agent::discovery::{categorize, CategorizedSnapshot, Category, ResourceEntry};
use discovery_agent::inventory::ResourceRecord;
use proptest::prelude::*;
use serde_json::{json, Map};

/// Generate Azure-looking resource types, mixing known providers with noise
fn arb_resource_type() -> impl Strategy<Value = String> {
    prop_oneof![
        (
            prop_oneof![
                Just("Microsoft.Compute"),
                Just("Microsoft.Network"),
                Just("Microsoft.Storage"),
                Just("Microsoft.Security"),
                Just("Microsoft.Sql"),
                Just("Microsoft.Web"),
                Just("Microsoft.KeyVault"),
                Just("Microsoft.ContainerService"),
                Just("Microsoft.ManagedIdentity"),
            ],
            "[a-zA-Z]{1,20}",
        )
            .prop_map(|(provider, kind)| format!("{}/{}", provider, kind)),
        "[a-zA-Z./-]{0,40}",
    ]
}

fn arb_record() -> impl Strategy<Value = ResourceRecord> {
    (
        "[a-z][a-z0-9-]{0,30}",
        arb_resource_type(),
        "rg-[a-z0-9]{1,10}",
        prop_oneof!["eastus", "westeurope", "japaneast"],
        proptest::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(name, resource_type, resource_group, location, tag)| {
            let mut properties = Map::new();
            if let Some(tag) = tag {
                properties.insert("tag".to_string(), json!(tag));
            }
            ResourceRecord {
                name,
                resource_type,
                resource_group,
                location: location.to_string(),
                properties,
            }
        })
}

proptest! {
    /// Categorization always yields one of the fixed labels and is stable
    #[test]
    fn categorize_is_total_and_deterministic(resource_type in ".{0,60}") {
        let first = categorize(&resource_type);
        prop_assert!(Category::ALL.contains(&first));
        prop_assert_eq!(first, categorize(&resource_type));
    }

    /// Case never changes the category
    #[test]
    fn categorize_ignores_case(resource_type in "[a-zA-Z./]{0,40}") {
        prop_assert_eq!(
            categorize(&resource_type.to_uppercase()),
            categorize(&resource_type.to_lowercase())
        );
    }

    /// Anything mentioning both storage and network is networking, unless compute matched first
    #[test]
    fn storage_and_network_resolve_to_networking(
        prefix in "[a-bd-z]{0,5}",
        middle in "[a-bd-z]{0,5}",
        suffix in "[a-bd-z]{0,5}",
        network_first in any::<bool>(),
    ) {
        // No 'c' in the filler, so the compute rule cannot fire
        let resource_type = if network_first {
            format!("{}Network{}Storage{}", prefix, middle, suffix)
        } else {
            format!("{}storage{}NETWORK{}", prefix, middle, suffix)
        };
        prop_assert_eq!(categorize(&resource_type), Category::Networking);
    }

    /// Every record appears exactly once, in its own category, in input order
    #[test]
    fn snapshot_partitions_input(records in prop::collection::vec(arb_record(), 0..60)) {
        let snapshot = CategorizedSnapshot::from_records(&records);
        prop_assert_eq!(snapshot.len(), records.len());

        for category in Category::ALL {
            let expected: Vec<ResourceEntry> = records
                .iter()
                .filter(|r| categorize(&r.resource_type) == category)
                .map(ResourceEntry::from)
                .collect();
            prop_assert_eq!(snapshot.bucket(category), expected.as_slice());
        }
    }

    /// The persisted JSON form parses back to the same snapshot
    #[test]
    fn snapshot_json_round_trip(records in prop::collection::vec(arb_record(), 0..30)) {
        let snapshot = CategorizedSnapshot::from_records(&records);
        let text = serde_json::to_string_pretty(&snapshot).unwrap();
        let parsed: CategorizedSnapshot = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(parsed, snapshot);
    }
}
