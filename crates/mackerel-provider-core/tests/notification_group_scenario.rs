//! Architectural Contract Test: Notification Group End-to-End
//!
//! Drives `mackerel_notification_group` through plan, create and read on
//! both engine generations.
//!
//! Constraints verified:
//! - Two identical monitor blocks yield one monitor association
//! - Service blocks {a, b, a} yield two service associations
//! - The remote never receives a duplicate reference
//! - Unset child id sets read back as null
//! - Re-planning the same configuration is a no-op
//!
//! If this test fails, association sets drift between plan and state.

mod common;

use common::*;
use mackerel_provider_core::schema::PlanAction;
use mackerel_provider_core::traits::MackerelClient;
use mackerel_provider_core::value::Value;
use tokio_test::assert_ok;

fn monitor(id: &str) -> Value {
    Value::object([("id", Value::string(id)), ("skip_default", Value::Bool(false))])
}

fn service(name: &str) -> Value {
    Value::object([("name", Value::string(name))])
}

fn config() -> Value {
    Value::object([
        ("name", Value::string("on-call")),
        ("monitor", Value::List(vec![monitor("2f6bd8XnzK9"), monitor("2f6bd8XnzK9")])),
        (
            "service",
            Value::List(vec![service("web"), service("batch"), service("web")]),
        ),
    ])
}

#[tokio::test]
async fn duplicate_associations_collapse_after_create_and_read() {
    for routing in ROUTINGS {
        let (server, remote) = routed_server(routing).await;

        let created = assert_ok!(create(server.as_ref(), "mackerel_notification_group", &config()).await);
        let state = assert_ok!(server.read_resource("mackerel_notification_group", &created).await)
            .expect("group exists after create");

        assert_eq!(state.get("monitor").as_list().map(<[Value]>::len), Some(1), "{routing:?}");
        assert_eq!(state.get("service").as_list().map(<[Value]>::len), Some(2), "{routing:?}");
        assert_eq!(state.get("child_notification_group_ids"), &Value::Null);
        assert_eq!(state.get("child_channel_ids"), &Value::Null);
        assert_eq!(state, created);

        let id = state.get("id").as_str().unwrap_or_default().to_string();
        let remote_group = assert_ok!(remote.find_notification_group(&id).await);
        assert_eq!(remote_group.monitors.len(), 1);
        let names: Vec<&str> = remote_group.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["web", "batch"]);

        let replan = assert_ok!(
            server
                .plan_resource_change("mackerel_notification_group", Some(&state), Some(&config()))
                .await
        );
        assert_eq!(replan.action, PlanAction::NoOp, "{routing:?}");
    }
}

#[tokio::test]
async fn duplicates_are_dropped_even_when_plan_is_bypassed() {
    for routing in ROUTINGS {
        let (server, remote) = routed_server(routing).await;

        let mut planned = config();
        if let Some(object) = planned.as_object_mut() {
            object.insert("id".to_string(), Value::Unknown);
            object.insert("notification_level".to_string(), Value::string("all"));
        }
        let state = assert_ok!(
            server
                .apply_resource_change("mackerel_notification_group", None, Some(&planned))
                .await
        )
        .expect("create returns a state");

        let id = state.get("id").as_str().unwrap_or_default().to_string();
        let remote_group = assert_ok!(remote.find_notification_group(&id).await);
        assert_eq!(remote_group.monitors.len(), 1, "{routing:?}");
        assert_eq!(remote_group.services.len(), 2, "{routing:?}");
    }
}

#[tokio::test]
async fn data_source_reads_the_same_associations() {
    for routing in ROUTINGS {
        let (server, _remote) = routed_server(routing).await;
        let created = assert_ok!(create(server.as_ref(), "mackerel_notification_group", &config()).await);

        let lookup = Value::object([("id", created.get("id").clone())]);
        let read = assert_ok!(server.read_data_source("mackerel_notification_group", &lookup).await);
        assert_eq!(read.get("name"), &Value::string("on-call"));
        assert_eq!(read.get("monitor").as_list().map(<[Value]>::len), Some(1));
        assert_eq!(read.get("service").as_list().map(<[Value]>::len), Some(2));
    }
}
