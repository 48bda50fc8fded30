//! Cascade – a model-agnostic pipeline orchestration runtime
//!
//! This crate drives heterogeneous computation-model simulators (Turing
//! machines, lambda calculus, recursive functions, tiny instruction sets, …)
//! through a uniform create/step/inspect lifecycle:
//! - Pipeline specifications parsed into stages chained by compiler edges
//! - A validated export-table contract for machine and compiler modules
//! - A pluggable snapshot-renderer contract isolated from orchestration
//! - Automatic stepping with cancellation and live interval tuning
//! - Canonicalization of out-of-band numeric encodings (byte arrays,
//!   decimal strings, wrapper objects)
//!
//! Model semantics live entirely in registered modules; the runtime only
//! orchestrates opaque module calls and recovers from their failures.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Error taxonomy shared across the runtime
pub mod error;

/// Machine/compiler module contracts, hosts, and the registration catalog
pub mod module;

/// Pipeline orchestration: stages, edges, auto-stepping, reporting
pub mod pipeline;

/// Snapshot renderer contract and the generic block renderer
pub mod render;

/// Wire-value utilities: numeric canonicalization and variant extraction
pub mod value;

// Re-export key types for convenience
pub use module::{ModuleCatalog, ModuleRegistry};
pub use pipeline::{Pipeline, PipelineConfig};

/// Current version of the Cascade runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
