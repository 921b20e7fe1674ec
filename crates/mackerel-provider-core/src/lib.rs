// # mackerel-provider-core
//
// Reconciliation engine for Mackerel resources.
//
// ## Architecture Overview
//
// - **Schema**: declared attributes, validators, planning
// - **ResourceMapper**: per-type translation between local models and the API
// - **LifecycleController**: create / read / update / delete / import state machine
// - **Registry**: name → factory maps, filtered once at construction
// - **FrameworkProvider / LegacyProvider**: the two engine generations
// - **MuxServer**: routes each type to the generation that serves it
//
// ## Design Principles
//
// 1. **One Owner Per Type**: a type name is served by exactly one generation
// 2. **Remote Is Truth**: every mutation ends with a read of the remote object
// 3. **Sets Are Sets**: associations are normalized before comparison
// 4. **Library-First**: the binary only wires options, logging and transport

pub mod config;
pub mod engine;
pub mod error;
pub mod framework;
pub mod legacy;
pub mod memory;
pub mod mux;
pub mod normalize;
pub mod registry;
pub mod resources;
pub mod rpc;
pub mod schema;
pub mod traits;
pub mod validators;
pub mod value;

// Re-export core types for convenience
pub use config::ServerOptions;
pub use engine::{DataSourceController, LifecycleController};
pub use error::{ClientError, Diagnostic, Error, Result};
pub use framework::FrameworkProvider;
pub use legacy::LegacyProvider;
pub use memory::MemoryClient;
pub use mux::{MuxServer, build_mux, build_server};
pub use registry::{Registry, TypeFilter};
pub use schema::{PlanAction, PlannedChange, Schema};
pub use traits::{ClientConfig, ClientFactory, Generation, Kind, MackerelClient, ProviderServer};
pub use value::{AttributePath, Value};
