//! Computation and compiler module contracts
//!
//! A computation module is consumed through a narrow export table: `create`,
//! `step`, `current`, plus an optional one-time init. A compiler module
//! exposes five translation exports. Export functions always return futures —
//! synchronous module implementations are adapted at registration, so the
//! orchestrator never has to know which flavor it is driving.
//!
//! Export slots are optional on purpose: a module author may wire up only part
//! of the table, and the hosts validate presence after instantiation,
//! reporting every missing name at once.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModuleResult;

pub mod catalog;
pub mod compiler;
pub mod machine;

pub use catalog::{InstanceAllocator, InstanceId, ModuleCatalog, ModuleRegistry};
pub use compiler::{CompilerHost, DecodeKind, EncodeKind};
pub use machine::MachineHost;

/// Export names resolved by the hosts; used verbatim in missing-export errors.
pub mod exports {
    /// Machine: create a fresh machine from code + ahead-of-time input
    pub const CREATE: &str = "create";
    /// Machine: advance one step with runtime input
    pub const STEP: &str = "step";
    /// Machine: inspect the current state
    pub const CURRENT: &str = "current";
    /// Compiler: translate program text
    pub const COMPILE_CODE: &str = "compile_code";
    /// Compiler: translate ahead-of-time input
    pub const COMPILE_AINPUT: &str = "compile_ainput";
    /// Compiler: translate runtime input
    pub const COMPILE_RINPUT: &str = "compile_rinput";
    /// Compiler: decode a continuing-step output
    pub const DECODE_ROUTPUT: &str = "decode_routput";
    /// Compiler: decode a final output
    pub const DECODE_FOUTPUT: &str = "decode_foutput";
}

/// Tagged outcome of one machine step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepResult {
    /// The machine can keep stepping; carries the per-step output.
    Continue {
        /// Opaque per-step output value
        routput: Value,
    },
    /// The machine halted; carries the final output and a snapshot to render.
    Halt {
        /// Final output value
        foutput: Value,
        /// State snapshot taken at the halt
        snapshot: Value,
    },
}

impl StepResult {
    /// Whether this result ends the run.
    pub fn is_halt(&self) -> bool {
        matches!(self, StepResult::Halt { .. })
    }
}

/// Future returned by every export function.
pub type ExportFuture<T> = BoxFuture<'static, ModuleResult<T>>;

/// One-time module init export.
pub type InitFn = Arc<dyn Fn() -> ExportFuture<()> + Send + Sync>;
/// `create(code, ainput)` export.
pub type CreateFn = Arc<dyn Fn(String, String) -> ExportFuture<()> + Send + Sync>;
/// `step(rinput)` export.
pub type StepFn = Arc<dyn Fn(String) -> ExportFuture<StepResult> + Send + Sync>;
/// `current()` export.
pub type CurrentFn = Arc<dyn Fn() -> ExportFuture<Value> + Send + Sync>;
/// Text-to-text translation export (`compile_*`).
pub type CompileFn = Arc<dyn Fn(String) -> ExportFuture<String> + Send + Sync>;
/// Output-decoding export (`decode_*`).
pub type DecodeFn = Arc<dyn Fn(Value) -> ExportFuture<Value> + Send + Sync>;

/// Export table of one instantiated computation module.
#[derive(Default)]
pub struct MachineExports {
    /// Optional one-time init, run once after export validation
    pub init: Option<InitFn>,
    /// Required `create` export
    pub create: Option<CreateFn>,
    /// Required `step` export
    pub step: Option<StepFn>,
    /// Required `current` export
    pub current: Option<CurrentFn>,
}

/// Export table of one instantiated compiler module.
#[derive(Default)]
pub struct CompilerExports {
    /// Optional one-time init, run once after export validation
    pub init: Option<InitFn>,
    /// Required `compile_code` export
    pub compile_code: Option<CompileFn>,
    /// Required `compile_ainput` export
    pub compile_ainput: Option<CompileFn>,
    /// Required `compile_rinput` export
    pub compile_rinput: Option<CompileFn>,
    /// Required `decode_routput` export
    pub decode_routput: Option<DecodeFn>,
    /// Required `decode_foutput` export
    pub decode_foutput: Option<DecodeFn>,
}

/// Synchronous computation module, adapted into a full export table.
///
/// Most educational models are ordinary blocking state machines; implementing
/// this trait and registering through
/// [`MachineExports::from_machine`] spares them the future plumbing.
pub trait Machine: Send + 'static {
    /// Build a fresh machine from program text and ahead-of-time input.
    fn create(&mut self, code: &str, ainput: &str) -> ModuleResult<()>;

    /// Advance one step with the given runtime input.
    fn step(&mut self, rinput: &str) -> ModuleResult<StepResult>;

    /// Inspect the current state as an opaque wire value.
    fn current(&self) -> ModuleResult<Value>;
}

impl MachineExports {
    /// Wrap a synchronous [`Machine`] into a complete export table.
    pub fn from_machine<M: Machine>(machine: M) -> Self {
        let shared = Arc::new(Mutex::new(machine));

        let create: CreateFn = {
            let shared = Arc::clone(&shared);
            Arc::new(move |code: String, ainput: String| {
                let result = shared.lock().create(&code, &ainput);
                futures::future::ready(result).boxed()
            })
        };
        let step: StepFn = {
            let shared = Arc::clone(&shared);
            Arc::new(move |rinput: String| {
                let result = shared.lock().step(&rinput);
                futures::future::ready(result).boxed()
            })
        };
        let current: CurrentFn = {
            let shared = Arc::clone(&shared);
            Arc::new(move || {
                let result = shared.lock().current();
                futures::future::ready(result).boxed()
            })
        };

        Self {
            init: None,
            create: Some(create),
            step: Some(step),
            current: Some(current),
        }
    }
}

/// Synchronous compiler module, adapted into a full export table.
pub trait Compiler: Send + 'static {
    /// Translate program text into the target stage encoding.
    fn compile_code(&mut self, code: &str) -> ModuleResult<String>;

    /// Translate ahead-of-time input.
    fn compile_ainput(&mut self, ainput: &str) -> ModuleResult<String>;

    /// Translate runtime input.
    fn compile_rinput(&mut self, rinput: &str) -> ModuleResult<String>;

    /// Decode a continuing-step output back across the stage boundary.
    fn decode_routput(&mut self, value: Value) -> ModuleResult<Value>;

    /// Decode a final output back across the stage boundary.
    fn decode_foutput(&mut self, value: Value) -> ModuleResult<Value>;
}

impl CompilerExports {
    /// Wrap a synchronous [`Compiler`] into a complete export table.
    pub fn from_compiler<C: Compiler>(compiler: C) -> Self {
        let shared = Arc::new(Mutex::new(compiler));

        fn compile_slot<C: Compiler>(
            shared: &Arc<Mutex<C>>,
            call: fn(&mut C, &str) -> ModuleResult<String>,
        ) -> CompileFn {
            let shared = Arc::clone(shared);
            Arc::new(move |text: String| {
                let result = call(&mut shared.lock(), &text);
                futures::future::ready(result).boxed()
            })
        }

        fn decode_slot<C: Compiler>(
            shared: &Arc<Mutex<C>>,
            call: fn(&mut C, Value) -> ModuleResult<Value>,
        ) -> DecodeFn {
            let shared = Arc::clone(shared);
            Arc::new(move |value: Value| {
                let result = call(&mut shared.lock(), value);
                futures::future::ready(result).boxed()
            })
        }

        Self {
            init: None,
            compile_code: Some(compile_slot(&shared, C::compile_code)),
            compile_ainput: Some(compile_slot(&shared, C::compile_ainput)),
            compile_rinput: Some(compile_slot(&shared, C::compile_rinput)),
            decode_routput: Some(decode_slot(&shared, C::decode_routput)),
            decode_foutput: Some(decode_slot(&shared, C::decode_foutput)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_result_wire_shape() {
        let cont: StepResult = serde_json::from_value(json!({
            "kind": "continue",
            "routput": "r1",
        }))
        .unwrap();
        assert_eq!(
            cont,
            StepResult::Continue {
                routput: json!("r1")
            }
        );
        assert!(!cont.is_halt());

        let halt: StepResult = serde_json::from_value(json!({
            "kind": "halt",
            "foutput": "done",
            "snapshot": { "pc": 3 },
        }))
        .unwrap();
        assert!(halt.is_halt());
    }
}
