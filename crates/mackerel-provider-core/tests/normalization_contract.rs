//! Architectural Contract Test: Association Normalization
//!
//! This test verifies that relationship collections behave as sets keyed by
//! their identity fields.
//!
//! Constraints verified:
//! - Normalizing twice equals normalizing once
//! - Input order never changes the set of identities kept
//! - A duplicate always collapses to its first occurrence, for every ordering
//! - Planning applies the same rule to set blocks
//!
//! If this test fails, plans will show spurious diffs on association sets.

use mackerel_provider_core::normalize::{normalize, normalize_values};
use mackerel_provider_core::resources::notification_group::MonitorRef;
use mackerel_provider_core::resources::notification_group::NotificationGroupResource;
use mackerel_provider_core::schema::plan;
use mackerel_provider_core::traits::ResourceMapper;
use mackerel_provider_core::value::Value;
use std::collections::BTreeSet;

fn monitor(id: &str, skip_default: bool) -> MonitorRef {
    MonitorRef {
        id: id.to_string(),
        skip_default: Some(skip_default),
    }
}

/// Every ordering of `items` (Heap's algorithm)
fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    fn heap<T: Clone>(k: usize, items: &mut Vec<T>, out: &mut Vec<Vec<T>>) {
        if k <= 1 {
            out.push(items.clone());
            return;
        }
        for i in 0..k - 1 {
            heap(k - 1, items, out);
            if k % 2 == 0 {
                items.swap(i, k - 1);
            } else {
                items.swap(0, k - 1);
            }
        }
        heap(k - 1, items, out);
    }
    let mut out = Vec::new();
    heap(items.len(), &mut items.to_vec(), &mut out);
    out
}

fn sample() -> Vec<MonitorRef> {
    vec![
        monitor("m1", true),
        monitor("m2", false),
        monitor("m1", false),
        monitor("m3", true),
        monitor("m2", true),
    ]
}

#[test]
fn normalization_is_idempotent() {
    for ordering in permutations(&sample()) {
        let once = normalize(ordering);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }
}

#[test]
fn identity_set_is_order_independent() {
    let expected: BTreeSet<String> = ["m1", "m2", "m3"].iter().map(|s| s.to_string()).collect();
    for ordering in permutations(&sample()) {
        let ids: BTreeSet<String> = normalize(ordering).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, expected);
    }
}

#[test]
fn duplicates_collapse_to_first_occurrence_for_every_ordering() {
    let orderings = permutations(&sample());
    assert_eq!(orderings.len(), 120);

    for ordering in orderings {
        let normalized = normalize(ordering.clone());
        for kept in &normalized {
            let first = ordering
                .iter()
                .find(|m| m.id == kept.id)
                .expect("kept element comes from the input");
            assert_eq!(kept, first, "ordering {ordering:?} kept a later duplicate");
        }
    }
}

#[test]
fn value_sets_without_identity_fields_dedupe_whole_elements() {
    let value = Value::string_list(["a", "b", "a", "c", "b"]);
    assert_eq!(normalize_values(&value, &[]), Value::string_list(["a", "b", "c"]));
}

#[test]
fn planning_normalizes_set_blocks() {
    let schema = NotificationGroupResource.schema();
    let block = |id: &str, skip: bool| Value::object([("id", Value::string(id)), ("skip_default", Value::Bool(skip))]);
    let config = Value::object([
        ("name", Value::string("ops")),
        ("monitor", Value::List(vec![block("m1", true), block("m1", false)])),
    ]);

    let change = plan(&schema, None, Some(&config)).unwrap();
    let planned = change.planned.unwrap();
    let monitors = planned.get("monitor").as_list().unwrap();
    assert_eq!(monitors.len(), 1);
    assert_eq!(monitors[0].get("skip_default"), &Value::Bool(true));
}
