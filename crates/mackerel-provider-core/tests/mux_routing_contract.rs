//! Architectural Contract Test: Protocol Multiplexing
//!
//! This test verifies that the composed server routes every type to exactly
//! one engine generation.
//!
//! Constraints verified:
//! - Legacy {X,Y,Z} composed with current {Y} serves Y from current, X and Z
//!   from legacy, with a single routing entry for Y
//! - A type served by both generations is a construction error
//! - With the toggle off, only the legacy generation is built
//! - The toggle is read from the environment once, into the server options
//! - Configure reaches both generations and reports every distinct diagnostic
//!
//! If this test fails, a type could be managed by two implementations.

mod common;

use common::*;
use mackerel_provider_core::config::{ENV_EXPERIMENTAL_FRAMEWORK, ServerOptions};
use mackerel_provider_core::error::Error;
use mackerel_provider_core::memory::MemoryClient;
use mackerel_provider_core::mux::{MuxServer, build_mux, build_server, compose};
use mackerel_provider_core::registry::TypeFilter;
use mackerel_provider_core::traits::{Generation, Kind, ProviderServer};
use mackerel_provider_core::value::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn current_generation_overrides_legacy() {
    let current = Arc::new(StubServer::new("current", &["Y"], &[]));
    let legacy_built = Arc::new(std::sync::Mutex::new(None::<Arc<StubServer>>));

    let captured = legacy_built.clone();
    let mux = assert_ok!(compose(current.clone(), move |resources: &TypeFilter, _data_sources: &TypeFilter| {
        // Legacy knows X, Y and Z but must drop what current serves
        let names: Vec<&str> = ["X", "Y", "Z"].into_iter().filter(|n| resources.allows(n)).collect();
        let legacy = Arc::new(StubServer::new("legacy", &names, &[]));
        *captured.lock().unwrap() = Some(legacy.clone());
        Ok(legacy as Arc<dyn ProviderServer>)
    }));

    assert_eq!(mux.resource_types(), vec!["X", "Y", "Z"]);
    assert_eq!(mux.generation_of(Kind::Resource, "Y"), Some(Generation::Current));
    assert_eq!(mux.generation_of(Kind::Resource, "X"), Some(Generation::Legacy));
    assert_eq!(mux.generation_of(Kind::Resource, "Z"), Some(Generation::Legacy));

    let state = Value::object([("id", Value::string("1"))]);
    let served = assert_ok!(mux.read_resource("Y", &state).await).unwrap_or_default();
    assert_eq!(served_by(&served), "current");
    let served = assert_ok!(mux.read_resource("Z", &state).await).unwrap_or_default();
    assert_eq!(served_by(&served), "legacy");

    let legacy = legacy_built.lock().unwrap().clone().unwrap();
    assert_eq!(current.call_count(), 1);
    assert_eq!(legacy.call_count(), 1);

    // Configure reaches both generations
    assert_ok!(mux.configure(&provider_config()).await);
    assert_eq!(current.configure_count(), 1);
    assert_eq!(legacy.configure_count(), 1);
}

#[tokio::test]
async fn configure_reaches_legacy_when_current_fails() {
    let current = Arc::new(StubServer::new("current", &["Y"], &[]).failing_configure("Invalid API Base"));
    let legacy = Arc::new(StubServer::new("legacy", &["X"], &[]));
    let mux = assert_ok!(MuxServer::new(current.clone(), legacy.clone()));

    let err = assert_err!(mux.configure(&provider_config()).await);
    assert_eq!(current.configure_count(), 1);
    assert_eq!(legacy.configure_count(), 1);
    let diagnostics = err.into_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].summary, "Invalid API Base");
}

#[tokio::test]
async fn configure_merges_diagnostics_of_both_generations() {
    let current = Arc::new(StubServer::new("current", &["Y"], &[]).failing_configure("No API Key"));
    let legacy = Arc::new(StubServer::new("legacy", &["X"], &[]).failing_configure("Invalid API Base"));
    let mux = assert_ok!(MuxServer::new(current, legacy));

    let err = assert_err!(mux.configure(&provider_config()).await);
    let summaries: Vec<String> = err.into_diagnostics().into_iter().map(|d| d.summary).collect();
    assert_eq!(summaries, vec!["No API Key", "Invalid API Base"]);
}

#[tokio::test]
async fn identical_configure_diagnostics_are_reported_once() {
    let options = ServerOptions {
        framework_enabled: true,
        ..ServerOptions::default()
    };
    let unconfigured = assert_ok!(build_server(&options, Arc::new(MemoryClient::new())));
    let err = assert_err!(unconfigured.configure(&Value::object([("api_key", Value::Null)])).await);
    let diagnostics = err.into_diagnostics();
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    assert_eq!(diagnostics[0].summary, "No API Key");
}

#[test]
fn all_current_options_route_every_typed_implementation_to_current() {
    let mux = assert_ok!(build_mux(&all_current_options(), Arc::new(MemoryClient::new())));
    for name in CURRENT_TYPES {
        assert_eq!(mux.generation_of(Kind::Resource, name), Some(Generation::Current), "{name}");
        assert_eq!(mux.generation_of(Kind::DataSource, name), Some(Generation::Current), "{name}");
    }
    assert_eq!(mux.generation_of(Kind::Resource, "mackerel_channel"), Some(Generation::Legacy));
    assert_eq!(
        mux.generation_of(Kind::DataSource, "mackerel_service_metric_names"),
        Some(Generation::Legacy)
    );
}

#[test]
fn duplicate_route_is_rejected() {
    let current = Arc::new(StubServer::new("current", &["Y"], &[]));
    let legacy = Arc::new(StubServer::new("legacy", &["X", "Y"], &[]));
    let err = assert_err!(MuxServer::new(current, legacy).map(|_| ()));
    assert!(matches!(err, Error::DuplicateType { ref name, .. } if name == "Y"), "{err:?}");
}

#[test]
fn same_name_may_be_a_resource_in_one_generation_and_data_source_in_another() {
    let current = Arc::new(StubServer::new("current", &[], &["Y"]));
    let legacy = Arc::new(StubServer::new("legacy", &["Y"], &[]));
    let mux = assert_ok!(MuxServer::new(current, legacy));
    assert_eq!(mux.generation_of(Kind::DataSource, "Y"), Some(Generation::Current));
    assert_eq!(mux.generation_of(Kind::Resource, "Y"), Some(Generation::Legacy));
}

#[tokio::test]
async fn unknown_type_is_not_routed() {
    let mux = assert_ok!(MuxServer::new(
        Arc::new(StubServer::new("current", &["Y"], &[])),
        Arc::new(StubServer::new("legacy", &["X"], &[])),
    ));
    let err = assert_err!(mux.read_data_source("X", &Value::Null).await);
    assert!(matches!(err, Error::UnknownType { kind: "data source", .. }), "{err:?}");
}

#[test]
fn toggle_is_read_once_into_options() {
    let env = HashMap::from([(ENV_EXPERIMENTAL_FRAMEWORK, "true")]);
    let options = ServerOptions::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    assert!(options.framework_enabled);

    let env = HashMap::from([(ENV_EXPERIMENTAL_FRAMEWORK, "1")]);
    assert!(ServerOptions::from_lookup(|key| env.get(key).map(|v| v.to_string())).framework_enabled);

    let env = HashMap::from([(ENV_EXPERIMENTAL_FRAMEWORK, "yes")]);
    assert!(!ServerOptions::from_lookup(|key| env.get(key).map(|v| v.to_string())).framework_enabled);

    assert!(!ServerOptions::from_lookup(|_| None).framework_enabled);
}

#[tokio::test]
async fn toggle_off_builds_legacy_only() {
    let (server, _remote) = configured_server(false).await;
    let types = server.resource_types();
    assert_eq!(
        types,
        vec!["mackerel_channel", "mackerel_notification_group", "mackerel_role", "mackerel_service"]
    );
}

#[tokio::test]
async fn toggle_on_serves_every_type_once() {
    let (off, _) = configured_server(false).await;
    let (on, _) = configured_server(true).await;

    let mut expected = off.resource_types();
    expected.sort();
    assert_eq!(on.resource_types(), expected);

    let mut expected = off.data_source_types();
    expected.sort();
    assert_eq!(on.data_source_types(), expected);
}

#[test]
fn framework_inclusion_list_moves_types_to_current() {
    let env = HashMap::from([
        (ENV_EXPERIMENTAL_FRAMEWORK, "true"),
        ("MACKEREL_TFFRAMEWORK_RESOURCES", "mackerel_service,mackerel_role"),
    ]);
    let options = ServerOptions::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    let server = assert_ok!(build_server(&options, Arc::new(MemoryClient::new())));

    let schema = assert_ok!(server.resource_schema("mackerel_role"));
    assert!(schema.attributes.contains_key("service"));
    assert!(server.resource_types().contains(&"mackerel_channel".to_string()));
}
