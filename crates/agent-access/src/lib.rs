//! AgentAccess: scores how accessible a web page is to automated agents of
//! differing capability, and compares outcomes across capability profiles.

pub mod compare;
pub mod config;
pub mod error;
pub mod page;
pub mod pipeline;
pub mod profile;
pub mod renderer;
pub mod rules;
pub mod scoring;
pub mod tasks;
pub mod types;

pub use compare::{analyze, analyze_in_order, ComparisonAnalyzer};
pub use config::EngineConfig;
pub use error::{AccessError, AccessResult, RenderError};
pub use page::RenderedPage;
pub use pipeline::{CancelToken, Engine};
pub use profile::{CapabilityProfile, ProfileRegistry};
pub use renderer::http::HttpRenderer;
pub use renderer::{PageRenderer, PageSource, RenderConstraints, StaticRenderer};
pub use rules::{RuleCheck, RuleRegistry, WeightedCheck};
pub use scoring::ScoringAggregator;
pub use tasks::{Task, TaskCatalog};
pub use types::*;
