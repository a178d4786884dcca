//! Loading engine.
//!
//! This module is the *public entry point* for turning script text into
//! execution trees. It is split into focused submodules under `src/engine/`.
//!
//! ## How the parts work together
//!
//! ```text
//! ConstructSpec (all) ──┐
//!                       │  RegistryBuilder::register      (registry.rs)
//!                       │   - compile patterns against the TypeRegistry (types.rs)
//!                       └───────────────┬───────────────
//!                                       │ Registry (frozen, shared)
//! script ── Script::load (script.rs) ───┤
//!            - comments, headers,       │
//!              indentation              v
//!                            Loader::parse_statement (loader.rs)
//!                              - fragment gating      (trigger.rs)
//!                              - Matcher candidates   (crate::grammar)
//!                              - recurse into placeholders
//!                              - builders -> Node (folded when pure)
//!                                       │
//!                                       v
//!                            Trigger { statements } ── execute / dispatch
//! ```
//!
//! ## Responsibilities by module
//!
//! - `types.rs`: semantic types, literal parsers and converters.
//! - `registry.rs`: construct descriptors, builders, fallbacks, events, and
//!   the per-kind index.
//! - `trigger.rs`: cheap fragment scan used to skip grammars that can't match.
//! - `loader.rs`: the recursive, type-directed parser.
//! - `script.rs`: script layout, triggers and execution.
//! - `metrics.rs`: counters collected while loading.
//!
//! ## Debugging
//!
//! Every stage logs through `tracing`; the CLI reads its filter from
//! `SKRIPTUM_LOG` (for example `SKRIPTUM_LOG=skriptum=trace`).

#[path = "engine/loader.rs"]
mod loader;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/registry.rs"]
mod registry;
#[path = "engine/script.rs"]
mod script;
#[path = "engine/trigger.rs"]
mod trigger;
#[path = "engine/types.rs"]
mod types;

pub use loader::{Loader, Statement};
pub use metrics::LoadMetrics;
pub use registry::{
    Bindings, Builder, Construct, ConstructId, ConstructKind, ConstructSpec, EventInfo, Fallback, Registry,
    RegistryBuilder, Syntax,
};
pub use script::{Outcome, Script, Trigger};
pub use trigger::TriggerInfo;
pub use types::{Converter, LiteralParser, SemanticType, TypeInfo, TypeRegistry, TypeSet};
