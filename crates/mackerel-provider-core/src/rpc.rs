//! JSON request surface
//!
//! One request per line, one response per request:
//!
//! ```text
//! {"method":"read_resource","type_name":"mackerel_service","state":{"id":"web",...}}
//! {"result":{"state":{...}},"diagnostics":[]}
//! ```
//!
//! Values travel in wire form, with unknowns encoded as `{"$unknown":true}`.
//! Failures never abort the loop; they come back as diagnostics.

use crate::error::{Diagnostic, Result};
use crate::traits::server::ProviderServer;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A request from the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    GetSchema,
    Configure {
        config: serde_json::Value,
    },
    ValidateResourceConfig {
        type_name: String,
        config: serde_json::Value,
    },
    ValidateDataSourceConfig {
        type_name: String,
        config: serde_json::Value,
    },
    PlanResourceChange {
        type_name: String,
        #[serde(default)]
        prior: Option<serde_json::Value>,
        #[serde(default)]
        config: Option<serde_json::Value>,
    },
    ApplyResourceChange {
        type_name: String,
        #[serde(default)]
        prior: Option<serde_json::Value>,
        #[serde(default)]
        planned: Option<serde_json::Value>,
    },
    ReadResource {
        type_name: String,
        state: serde_json::Value,
    },
    ImportResourceState {
        type_name: String,
        id: String,
    },
    ReadDataSource {
        type_name: String,
        config: serde_json::Value,
    },
}

/// Response to one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Response {
    fn ok(result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            diagnostics: Vec::new(),
        }
    }

    /// Whether the request failed
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

fn wire(value: Option<Value>) -> serde_json::Value {
    value.map(|v| v.to_wire()).unwrap_or(serde_json::Value::Null)
}

fn local(value: Option<serde_json::Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).map(Value::from_wire)
}

fn get_schema(server: &dyn ProviderServer) -> Result<serde_json::Value> {
    let mut resources = serde_json::Map::new();
    for name in server.resource_types() {
        let schema = server.resource_schema(&name)?.describe();
        resources.insert(name, schema);
    }
    let mut data_sources = serde_json::Map::new();
    for name in server.data_source_types() {
        let schema = server.data_source_schema(&name)?.describe();
        data_sources.insert(name, schema);
    }
    Ok(json!({
        "provider": server.provider_schema().describe(),
        "resources": resources,
        "data_sources": data_sources,
    }))
}

async fn handle(server: &dyn ProviderServer, request: Request) -> Result<serde_json::Value> {
    match request {
        Request::GetSchema => get_schema(server),
        Request::Configure { config } => {
            server.configure(&Value::from_wire(config)).await?;
            Ok(serde_json::Value::Null)
        }
        Request::ValidateResourceConfig { type_name, config } => {
            server
                .validate_resource_config(&type_name, &Value::from_wire(config))
                .await?;
            Ok(serde_json::Value::Null)
        }
        Request::ValidateDataSourceConfig { type_name, config } => {
            server
                .validate_data_source_config(&type_name, &Value::from_wire(config))
                .await?;
            Ok(serde_json::Value::Null)
        }
        Request::PlanResourceChange {
            type_name,
            prior,
            config,
        } => {
            let (prior, config) = (local(prior), local(config));
            let change = server
                .plan_resource_change(&type_name, prior.as_ref(), config.as_ref())
                .await?;
            Ok(json!({
                "planned": wire(change.planned),
                "requires_replace": change.requires_replace.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "action": change.action,
            }))
        }
        Request::ApplyResourceChange {
            type_name,
            prior,
            planned,
        } => {
            let (prior, planned) = (local(prior), local(planned));
            let state = server
                .apply_resource_change(&type_name, prior.as_ref(), planned.as_ref())
                .await?;
            Ok(json!({ "state": wire(state) }))
        }
        Request::ReadResource { type_name, state } => {
            let state = server.read_resource(&type_name, &Value::from_wire(state)).await?;
            Ok(json!({ "state": wire(state) }))
        }
        Request::ImportResourceState { type_name, id } => {
            let state = server.import_resource_state(&type_name, &id).await?;
            Ok(json!({ "state": state.to_wire() }))
        }
        Request::ReadDataSource { type_name, config } => {
            let state = server.read_data_source(&type_name, &Value::from_wire(config)).await?;
            Ok(json!({ "state": state.to_wire() }))
        }
    }
}

/// Serve one request
pub async fn dispatch(server: &dyn ProviderServer, request: Request) -> Response {
    match handle(server, request).await {
        Ok(result) => Response::ok(result),
        Err(e) => Response {
            result: None,
            diagnostics: e.into_diagnostics(),
        },
    }
}
