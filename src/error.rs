//! Error types for the Cascade runtime
//!
//! Domain errors use thiserror; user-visible failures are converted to
//! severity-tagged reports at the stage/edge boundary rather than escaping as
//! panics.

use thiserror::Error;

/// Top-level pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Module loading or invocation errors
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    /// Renderer loading or contract errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Compiler edge errors
    #[error("Edge error: {0}")]
    Edge(#[from] EdgeError),

    /// The pipeline was disabled by a fatal runtime-stage failure
    #[error("Pipeline is disabled")]
    Disabled,

    /// A stage index outside the pipeline
    #[error("Stage index {0} out of range")]
    StageOutOfRange(usize),

    /// An edge index outside the pipeline
    #[error("Edge index {0} out of range")]
    EdgeOutOfRange(usize),
}

/// Errors binding or invoking a machine/compiler module
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No factory registered under the requested name
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    /// Module instantiation failed
    #[error("Module '{module}' failed to instantiate: {detail}")]
    Instantiate {
        /// Module name
        module: String,
        /// Failure details
        detail: String,
    },

    /// Required exports absent from the module's export table.
    /// Every missing name is collected before failing.
    #[error("Module '{module}' is missing exports: {}", missing.join(", "))]
    MissingExports {
        /// Module name
        module: String,
        /// All absent export names
        missing: Vec<&'static str>,
    },

    /// The module's one-time init export failed
    #[error("Module '{module}' init failed: {detail}")]
    Init {
        /// Module name
        module: String,
        /// Failure details
        detail: String,
    },

    /// A forwarded export call failed inside the module
    #[error("Module call '{export}' failed: {detail}")]
    Call {
        /// Export name that was invoked
        export: &'static str,
        /// Failure details
        detail: String,
    },

    /// An export was invoked before a successful init
    #[error("Module '{0}' is not initialized")]
    NotReady(String),
}

/// Convenience result alias for module operations
pub type ModuleResult<T> = std::result::Result<T, ModuleError>;

/// Errors loading a snapshot renderer
#[derive(Debug, Error)]
pub enum RenderError {
    /// No renderer factory for the model name (and no default registered)
    #[error("No renderer registered for model '{0}'")]
    UnknownRenderer(String),

    /// Renderer construction failed (contract violation)
    #[error("Renderer for model '{model}' failed to construct: {detail}")]
    Construct {
        /// Model name
        model: String,
        /// Failure details
        detail: String,
    },
}

/// Convenience result alias for renderer operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Errors raised at a compiler edge boundary
#[derive(Debug, Error)]
pub enum EdgeError {
    /// The edge's compiler module failed to load; compile/decode are refused
    #[error("Compiler not available for edge {from} => {target}")]
    Unavailable {
        /// Source stage name
        from: String,
        /// Target stage name
        target: String,
    },

    /// A translation call failed inside the compiler module
    #[error("Edge translation failed: {0}")]
    Translate(#[from] ModuleError),
}

/// Convenience result alias for edge operations
pub type EdgeResult<T> = std::result::Result<T, EdgeError>;

/// Result type using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
