//! Compiler edge: one stage boundary
//!
//! An edge binds the compiler module named `"<source>-<target>"`. A failed
//! bind degrades only this edge: its encode/decode actions are refused, a
//! warning is surfaced, and sibling edges and the runtime stage continue to
//! initialize.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use super::report::Reporter;
use super::spec::EdgeMeta;
use crate::error::{EdgeError, EdgeResult};
use crate::module::{CompilerHost, DecodeKind, EncodeKind, InstanceAllocator, ModuleRegistry};

enum State {
    Pending,
    Available(Arc<CompilerHost>),
    Unavailable(String),
}

/// One compiler edge between adjacent pipeline stages.
pub struct CompilerEdge {
    meta: EdgeMeta,
    state: RwLock<State>,
}

impl CompilerEdge {
    /// Create an edge in the pending state.
    pub fn new(meta: EdgeMeta) -> Self {
        Self {
            meta,
            state: RwLock::new(State::Pending),
        }
    }

    /// Edge identity.
    pub fn meta(&self) -> &EdgeMeta {
        &self.meta
    }

    /// Whether the compiler module bound successfully.
    pub fn is_available(&self) -> bool {
        matches!(*self.state.read(), State::Available(_))
    }

    /// One-line status for display, mirroring the edge's lifecycle.
    pub fn status_line(&self) -> String {
        let meta = &self.meta;
        match &*self.state.read() {
            State::Available(_) => format!(
                "{} => {}: {}",
                meta.source, meta.target, meta.compiler_name
            ),
            State::Unavailable(_) => format!(
                "{} => {}: unavailable ({})",
                meta.source, meta.target, meta.compiler_name
            ),
            State::Pending => format!(
                "{} => {}: pending ({})",
                meta.source, meta.target, meta.compiler_name
            ),
        }
    }

    /// Attempt to bind the edge's compiler module.
    ///
    /// Failure is non-fatal to the pipeline: the edge is marked unavailable
    /// and a warning goes through the reporter. Returns availability.
    pub async fn init_host(
        &self,
        registry: &ModuleRegistry,
        allocator: &InstanceAllocator,
        reporter: &Reporter,
    ) -> bool {
        let mut host = CompilerHost::new(&self.meta.compiler_name, allocator.allocate());
        match host.init(registry).await {
            Ok(()) => {
                *self.state.write() = State::Available(Arc::new(host));
                true
            }
            Err(err) => {
                tracing::warn!(
                    edge = %self.meta.key,
                    compiler = %self.meta.compiler_name,
                    %err,
                    "compiler unavailable"
                );
                reporter.warning(
                    self.meta.key.clone(),
                    format!(
                        "Compiler unavailable: {} => {}",
                        self.meta.source, self.meta.target
                    ),
                );
                *self.state.write() = State::Unavailable(err.to_string());
                false
            }
        }
    }

    fn ensure_available(&self) -> EdgeResult<Arc<CompilerHost>> {
        match &*self.state.read() {
            State::Available(host) => Ok(Arc::clone(host)),
            _ => Err(EdgeError::Unavailable {
                from: self.meta.source.clone(),
                target: self.meta.target.clone(),
            }),
        }
    }

    /// Translate a boundary buffer forward across this edge.
    pub async fn encode(&self, kind: EncodeKind, text: &str) -> EdgeResult<String> {
        let host = self.ensure_available()?;
        host.encode(kind, text).await.map_err(EdgeError::from)
    }

    /// Decode an output value backward across this edge.
    pub async fn decode(&self, kind: DecodeKind, value: Value) -> EdgeResult<Value> {
        let host = self.ensure_available()?;
        host.decode(kind, value).await.map_err(EdgeError::from)
    }
}
