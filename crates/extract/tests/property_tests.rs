//! Property-based tests for entity resolution.
//!
//! - ids are a pure function of the input
//! - one entity per (category, normalized label)
//! - every resolved relationship points at a resolved entity

use extract::{normalize_label, Category, RawEntity, RawRelationship, Resolver};
use proptest::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

fn arb_category() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

fn arb_label() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Albert Einstein",
        "albert einstein",
        " ALBERT  EINSTEIN ",
        "Ulm",
        "ulm",
        "Paris",
        "Nobel Prize",
        "1879",
    ])
    .prop_map(str::to_string)
}

fn arb_entities() -> impl Strategy<Value = Vec<RawEntity>> {
    prop::collection::vec((0u8..12, arb_category(), arb_label()), 0..16).prop_map(|items| {
        items
            .into_iter()
            .map(|(n, category, label)| RawEntity::new(format!("ref_{}", n), category, label))
            .collect()
    })
}

fn arb_relationships() -> impl Strategy<Value = Vec<RawRelationship>> {
    prop::collection::vec((0u8..16, 0u8..16), 0..16).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(s, t)| {
                RawRelationship::new(format!("ref_{}", s), format!("ref_{}", t), "P11", "had participant")
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn resolution_is_deterministic(
        entities in arb_entities(),
        relationships in arb_relationships(),
    ) {
        let first = Resolver::default().resolve(&entities, &relationships).unwrap();
        let second = Resolver::default().resolve(&entities, &relationships).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn one_entity_per_normalized_key(entities in arb_entities()) {
        let resolution = Resolver::default().resolve(&entities, &[]).unwrap();

        let keys: HashSet<(Category, String)> = entities
            .iter()
            .map(|e| (e.category.parse().unwrap(), normalize_label(&e.label)))
            .collect();
        prop_assert_eq!(resolution.entities.len(), keys.len());

        let ids: HashSet<Uuid> = resolution.entities.iter().map(|e| e.id).collect();
        prop_assert_eq!(ids.len(), resolution.entities.len());
    }

    #[test]
    fn no_dangling_relationships(
        entities in arb_entities(),
        relationships in arb_relationships(),
    ) {
        let resolution = Resolver::default().resolve(&entities, &relationships).unwrap();
        let ids: HashSet<Uuid> = resolution.entities.iter().map(|e| e.id).collect();

        for rel in &resolution.relationships {
            prop_assert!(ids.contains(&rel.source_id));
            prop_assert!(ids.contains(&rel.target_id));
        }
        prop_assert_eq!(
            resolution.relationships.len() + resolution.report.broken_links.len(),
            relationships.len()
        );
    }

    #[test]
    fn namespace_is_the_only_hidden_input(
        entities in arb_entities(),
        seed in any::<u128>(),
    ) {
        let namespace = Uuid::from_u128(seed);
        let a = Resolver::new(namespace).resolve(&entities, &[]).unwrap();
        let b = Resolver::new(namespace).resolve(&entities, &[]).unwrap();
        let ids_a: Vec<Uuid> = a.entities.iter().map(|e| e.id).collect();
        let ids_b: Vec<Uuid> = b.entities.iter().map(|e| e.id).collect();
        prop_assert_eq!(ids_a, ids_b);
    }
}

#[test]
fn dedup_marie_curie() {
    let entities = vec![
        RawEntity::new("p1", Category::Person, "Marie Curie"),
        RawEntity::new("p2", Category::Person, "marie curie"),
    ];
    let resolution = Resolver::default().resolve(&entities, &[]).unwrap();
    assert_eq!(resolution.entities.len(), 1);
}

#[test]
fn dedup_is_category_scoped() {
    let entities = vec![
        RawEntity::new("p1", Category::Person, "Paris"),
        RawEntity::new("pl1", Category::Place, "Paris"),
    ];
    let resolution = Resolver::default().resolve(&entities, &[]).unwrap();
    assert_eq!(resolution.entities.len(), 2);
    assert_ne!(resolution.entities[0].id, resolution.entities[1].id);
}

#[test]
fn broken_link_rejection() {
    let entities = vec![RawEntity::new("p1", Category::Person, "Albert Einstein")];
    let relationships = vec![RawRelationship::new("p1", "missing", "P98", "was born")];

    let resolution = Resolver::default().resolve(&entities, &relationships).unwrap();
    assert!(resolution.relationships.is_empty());
    assert_eq!(resolution.report.broken_links.len(), 1);
}
