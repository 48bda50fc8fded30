//! Snapshot renderer contract
//!
//! Rendering is model-specific but host-driven: the orchestrator resolves a
//! renderer by model name from the registry, constructs it onto a display
//! surface, and calls `draw` with each fresh state. Renderer internals are
//! outside the orchestration core; contract violations (a factory failing to
//! construct) fail loudly at stage-init time rather than degrading silently.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

pub mod blocks;

pub use blocks::BlockRenderer;

/// Registry name of the fallback renderer used for models without a dedicated
/// registration.
pub const DEFAULT_RENDERER: &str = "default";

/// A model-supplied renderer for opaque state snapshots.
///
/// `draw` replaces all previously drawn content for its surface; calling it
/// twice with the same state is observationally identical to calling it once.
pub trait SnapshotRenderer: Send {
    /// Render `state`, replacing the surface's previous frame.
    fn draw(&mut self, state: &Value);
}

/// Display-surface handle renderers draw onto.
///
/// Line-oriented with replace-all semantics: each `draw` produces one full
/// frame. Cloning shares the underlying frame, so the orchestrator keeps a
/// handle for inspection while the renderer owns another.
#[derive(Clone, Default)]
pub struct Surface {
    frame: Arc<RwLock<Vec<String>>>,
}

impl Surface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole frame.
    pub fn replace(&self, lines: Vec<String>) {
        *self.frame.write() = lines;
    }

    /// Clear the frame.
    pub fn clear(&self) {
        self.frame.write().clear();
    }

    /// Current frame lines.
    pub fn lines(&self) -> Vec<String> {
        self.frame.read().clone()
    }

    /// Current frame as one newline-joined string.
    pub fn text(&self) -> String {
        self.frame.read().join("\n")
    }
}
