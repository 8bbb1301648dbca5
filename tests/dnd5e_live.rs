//! Integration tests against the public D&D 5e SRD API.
//!
//! These tests make real HTTP calls.
//! Run with: cargo test --test dnd5e_live -- --ignored

use std::sync::Arc;

use monster_forge::collectors::{CatalogLister, CatalogSource, Dnd5eClient};
use monster_forge::error::SourceError;
use monster_forge::validation::validate;

#[tokio::test]
#[ignore] // Run with: cargo test --test dnd5e_live -- --ignored
async fn test_lists_full_monster_catalog() {
    let client = Arc::new(Dnd5eClient::new().expect("client should build"));
    let catalog = CatalogLister::new(client)
        .list_all()
        .await
        .expect("listing should succeed");

    assert!(catalog.len() > 300, "expected the SRD bestiary, got {}", catalog.len());
    assert!(catalog.iter().any(|e| e.identifier == "aboleth"));
}

#[tokio::test]
#[ignore]
async fn test_fetches_and_validates_known_monster() {
    let client = Dnd5eClient::new().expect("client should build");
    let raw = client
        .fetch_detail("adult-black-dragon")
        .await
        .expect("detail should be fetched");

    let monster = validate(&raw).expect("record should validate");
    assert_eq!(monster.index, "adult-black-dragon");
    assert!(monster.hit_points > 0);
    assert!(monster.armor_class.is_some());
    assert!(!monster.actions.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_unknown_monster_is_not_found() {
    let client = Dnd5eClient::new().expect("client should build");
    let err = client
        .fetch_detail("definitely-not-a-monster")
        .await
        .expect_err("lookup should fail");

    assert!(matches!(err, SourceError::NotFound(_)));
}
