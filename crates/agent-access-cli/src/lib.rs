//! AgentAccess CLI: configuration resolution, renderer selection and output
//! formatting behind the `agent-access` binary.

pub mod config;
pub mod output;

pub use config::{build_renderer, resolve_engine_config, EngineOverrides, RendererKind};
