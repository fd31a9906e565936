//! Integration tests for the vault lifecycle.
//!
//! Covers the complete path of an entity through the vault:
//! 1. Mapping registration and publication
//! 2. Storing samples with and without authoritative timestamps
//! 3. Sweeping against a pinned clock
//! 4. Exposition of what survived

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use event_vault::{
    EntryKey, ExpositionRegistry, IdentitySource, ManualClock, Mapping, MetricsVault, Sample,
    VaultError,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn setup(mappings: Vec<Mapping>) -> (MetricsVault, Arc<ManualClock>, ExpositionRegistry) {
    let clock = Arc::new(ManualClock::new(start()));
    let registry = ExpositionRegistry::new();
    let mut vault = MetricsVault::with_clock(clock.clone());
    vault.register_mappings(mappings, &registry).unwrap();
    (vault, clock, registry)
}

fn single_label(name: &str) -> Mapping {
    Mapping::new(name, "Test", Duration::from_secs(3600)).with_labels(["l"])
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn entity_lives_until_ttl_then_disappears_from_exposition() {
    let (vault, clock, registry) = setup(vec![single_label("m")]);
    let now = start();

    vault
        .store("m", Sample::new(["x"], 5.0).with_id("1").with_timestamp(now))
        .unwrap();

    clock.set(now + TimeDelta::minutes(59));
    vault.remove_stale_metrics();
    let stored = vault
        .collector("m")
        .unwrap()
        .get(&EntryKey::Id("1".to_string()))
        .unwrap();
    assert!((stored.value - 5.0).abs() < f64::EPSILON);
    assert!(registry.encode().unwrap().contains("m{l=\"x\"}"));

    clock.set(now + TimeDelta::minutes(61));
    vault.remove_stale_metrics();
    assert!(vault.collector("m").unwrap().is_empty());
    assert!(!registry.encode().unwrap().contains("m{l=\"x\"}"));
    assert!(registry.encode().unwrap().contains("# TYPE m gauge"));
}

#[test]
fn changing_value_keeps_untimed_entity_alive() {
    let (vault, clock, _) = setup(vec![single_label("m")]);

    for minute in 0..5 {
        vault
            .store("m", Sample::new(["x"], f64::from(minute)).with_id("1"))
            .unwrap();
        clock.advance(TimeDelta::minutes(50));
        vault.remove_stale_metrics();
    }

    assert_eq!(vault.collector("m").unwrap().len(), 1);
}

#[test]
fn idle_reemission_does_not_keep_entity_alive() {
    let (vault, clock, _) = setup(vec![single_label("m")]);

    for _ in 0..3 {
        vault.store("m", Sample::new(["x"], 1.0).with_id("1")).unwrap();
        clock.advance(TimeDelta::minutes(40));
    }
    vault.remove_stale_metrics();

    assert!(vault.collector("m").unwrap().is_empty());
}

#[test]
fn legacy_label_identity_dedups_without_ids() {
    let (vault, _, registry) =
        setup(vec![single_label("legacy").with_identity(IdentitySource::LabelHash)]);

    for value in [1.0, 2.0, 3.0] {
        vault.store("legacy", Sample::new(["same"], value)).unwrap();
    }
    vault.store("legacy", Sample::new(["other"], 1.0)).unwrap();

    assert_eq!(vault.collector("legacy").unwrap().len(), 2);
    assert!(registry.encode().unwrap().contains("legacy{l=\"same\"} 3"));
}

#[test]
fn unregistered_and_malformed_stores_fail_loudly() {
    let (vault, _, _) = setup(vec![single_label("m")]);

    assert!(matches!(
        vault.store("nope", Sample::new(["x"], 1.0).with_id("1")),
        Err(VaultError::MetricNotFound { .. })
    ));
    assert!(matches!(
        vault.store("m", Sample::new(["x", "y"], 1.0).with_id("1")),
        Err(VaultError::LabelCardinality { .. })
    ));
    assert!(vault.collector("m").unwrap().is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn ingest_scrape_and_sweep_concurrently() {
    let (vault, _, registry) = setup(vec![single_label("a"), single_label("b")]);
    let vault = Arc::new(vault);
    let mut handles = vec![];

    for metric in ["a", "b"] {
        for worker in 0..4 {
            let vault = Arc::clone(&vault);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    vault
                        .store(metric, Sample::new([format!("{worker}")], 1.0).with_id(format!("{worker}-{i}")))
                        .unwrap();
                }
            }));
        }
    }

    for _ in 0..2 {
        let vault = Arc::clone(&vault);
        let registry = registry.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                vault.remove_stale_metrics();
                let _ = registry.encode().unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(vault.collector("a").unwrap().len(), 400);
    assert_eq!(vault.collector("b").unwrap().len(), 400);
}
