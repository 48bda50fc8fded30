//! Stage node: per-stage buffers, lifecycle, and machine driving
//!
//! Every stage holds the code/ainput/rinput boundary buffers. The runtime
//! stage additionally owns a machine host, a renderer, and the authoritative
//! lifecycle state machine:
//!
//! ```text
//! Uninitialized -> Ready -> MachineSet
//!       Ready | MachineSet -> InitFailed   (terminal)
//! ```
//!
//! Lifecycle guards never throw: an illegal operation produces a report and a
//! neutral outcome. Module failures are converted to reports here — a failed
//! Create is terminal (partial module state is untrusted), a failed Step
//! leaves the machine intact for a retry.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use super::autostep::AutoStep;
use super::report::Reporter;
use super::spec::StageMeta;
use crate::error::{EdgeResult, PipelineError};
use crate::module::{DecodeKind, InstanceAllocator, MachineHost, ModuleRegistry, StepResult};
use crate::render::{SnapshotRenderer, Surface};

/// Lifecycle of a stage's machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineLifecycle {
    /// No runtime loaded (all stages start here; non-runtime stages stay)
    Uninitialized,
    /// Module and renderer bound; no machine created yet
    Ready,
    /// `create` succeeded at least once; stepping is legal
    MachineSet,
    /// Terminal failure; controls are disabled until the pipeline is rebuilt
    InitFailed,
}

/// What initiated a step request. Manual and automatic triggers are
/// orthogonal: a failed manual step never stops a running auto loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTrigger {
    /// User-initiated step
    Manual,
    /// Auto-step timer tick
    Auto,
}

/// Outcome of one step request.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Decoded output (routput or foutput), when the step produced one
    pub output: Option<Value>,
    /// Whether the machine actually advanced
    pub stepped: bool,
    /// Whether the machine halted on this step
    pub halted: bool,
}

impl StepOutcome {
    /// The neutral result for guarded-away or failed steps.
    pub fn failure() -> Self {
        Self {
            output: None,
            stepped: false,
            halted: false,
        }
    }
}

/// Transform applied to runtime outputs before display — the pipeline installs
/// the chained reverse decode here.
pub type OutputTransform =
    Arc<dyn Fn(DecodeKind, Value) -> BoxFuture<'static, EdgeResult<Value>> + Send + Sync>;

fn identity_transform() -> OutputTransform {
    Arc::new(|_kind, value| futures::future::ready(Ok(value)).boxed())
}

/// One pipeline stage.
pub struct StageNode {
    meta: StageMeta,
    code: String,
    ainput: String,
    rinput: String,
    lifecycle: MachineLifecycle,
    host: Option<MachineHost>,
    renderer: Option<Box<dyn SnapshotRenderer>>,
    surface: Surface,
    routput: Option<Value>,
    foutput: Option<Value>,
    transform: OutputTransform,
    reporter: Reporter,
    auto: AutoStep,
}

impl StageNode {
    /// Create a stage with the given default buffer contents.
    pub fn new(
        meta: StageMeta,
        defaults: super::StageDefaults,
        reporter: Reporter,
        auto: AutoStep,
    ) -> Self {
        Self {
            meta,
            code: defaults.code,
            ainput: defaults.ainput,
            rinput: defaults.rinput,
            lifecycle: MachineLifecycle::Uninitialized,
            host: None,
            renderer: None,
            surface: Surface::new(),
            routput: None,
            foutput: None,
            transform: identity_transform(),
            reporter,
            auto,
        }
    }

    /// Stage identity.
    pub fn meta(&self) -> &StageMeta {
        &self.meta
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> MachineLifecycle {
        self.lifecycle
    }

    /// Code buffer.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replace the code buffer.
    pub fn set_code(&mut self, value: impl Into<String>) {
        self.code = value.into();
    }

    /// Ahead-of-time input buffer.
    pub fn ainput(&self) -> &str {
        &self.ainput
    }

    /// Replace the ahead-of-time input buffer.
    pub fn set_ainput(&mut self, value: impl Into<String>) {
        self.ainput = value.into();
    }

    /// Runtime input buffer.
    pub fn rinput(&self) -> &str {
        &self.rinput
    }

    /// Replace the runtime input buffer.
    pub fn set_rinput(&mut self, value: impl Into<String>) {
        self.rinput = value.into();
    }

    /// Last decoded continuing output, if any.
    pub fn routput(&self) -> Option<&Value> {
        self.routput.as_ref()
    }

    /// Last decoded final output, if any.
    pub fn foutput(&self) -> Option<&Value> {
        self.foutput.as_ref()
    }

    /// The rendered snapshot frame.
    pub fn frame(&self) -> String {
        self.surface.text()
    }

    /// Install the output transform (the pipeline's reverse-decode chain).
    pub fn set_output_transform(&mut self, transform: OutputTransform) {
        self.transform = transform;
    }

    /// This stage's auto-step scheduler.
    pub fn auto(&self) -> &AutoStep {
        &self.auto
    }

    /// Load renderer and machine module for this stage.
    ///
    /// On any failure the stage transitions to [`MachineLifecycle::InitFailed`]
    /// (terminal), the error is reported, and `false` is returned; nothing
    /// propagates to the caller.
    pub async fn init_runtime(
        &mut self,
        registry: &ModuleRegistry,
        allocator: &InstanceAllocator,
    ) -> bool {
        let loaded = self.load_runtime(registry, allocator).await;
        match loaded {
            Ok(()) => {
                self.lifecycle = MachineLifecycle::Ready;
                self.reporter.clear();
                true
            }
            Err(err) => {
                self.lifecycle = MachineLifecycle::InitFailed;
                self.reporter.error(
                    self.meta.title(),
                    format!("Init error ({}): {err}", self.meta.name),
                );
                false
            }
        }
    }

    async fn load_runtime(
        &mut self,
        registry: &ModuleRegistry,
        allocator: &InstanceAllocator,
    ) -> Result<(), PipelineError> {
        // renderer binds first so a broken renderer surfaces before any
        // machine state exists
        let renderer = registry.instantiate_renderer(&self.meta.name, self.surface.clone())?;
        self.renderer = Some(renderer);

        let mut host = MachineHost::new(&self.meta.name, allocator.allocate());
        host.init(registry).await?;
        self.host = Some(host);
        Ok(())
    }

    /// Create (or re-create) the machine from the current buffers.
    ///
    /// Cancels auto-stepping, clears prior outputs, and on success renders the
    /// fresh state. A create-time module failure is terminal for this stage.
    pub async fn create_from_inputs(&mut self) -> bool {
        match self.lifecycle {
            MachineLifecycle::InitFailed => {
                self.reporter
                    .error(self.meta.title(), "(init failed; reload required)");
                return false;
            }
            MachineLifecycle::Uninitialized => {
                self.reporter
                    .error(self.meta.title(), "(runtime machine not initialized)");
                return false;
            }
            MachineLifecycle::Ready | MachineLifecycle::MachineSet => {}
        }

        // creation and automatic stepping are mutually exclusive
        self.auto.stop();
        self.clear_outputs();
        self.reporter.clear();

        let created = self.run_create().await;
        match created {
            Ok(()) => {
                self.lifecycle = MachineLifecycle::MachineSet;
                true
            }
            Err(err) => {
                self.lifecycle = MachineLifecycle::InitFailed;
                self.reporter
                    .error(self.meta.title(), format!("init_fail: {err}"));
                false
            }
        }
    }

    async fn run_create(&mut self) -> Result<(), PipelineError> {
        let host = self
            .host
            .as_ref()
            .expect("lifecycle guard admits only bound stages");
        host.create(&self.code, &self.ainput).await?;
        let state = host.current().await?;
        self.draw(&state);
        Ok(())
    }

    /// Advance one step with the current runtime input.
    ///
    /// Only legal in [`MachineLifecycle::MachineSet`]; otherwise a report is
    /// written and the neutral outcome returned. A step-time failure leaves
    /// the lifecycle unchanged — the user may retry — but stops the auto loop
    /// when the failing step was auto-triggered.
    pub async fn step_from_input(&mut self, trigger: StepTrigger) -> StepOutcome {
        // a tick that lost the race against stop/create is dropped silently
        if trigger == StepTrigger::Auto && !self.auto.is_running() {
            return StepOutcome::failure();
        }
        if !self.validate_step_ready() {
            return StepOutcome::failure();
        }

        let stepped = self.run_step().await;
        match stepped {
            Ok(outcome) => outcome,
            Err(err) => {
                self.reporter.error(self.meta.title(), err.to_string());
                if trigger == StepTrigger::Auto && self.auto.is_running() {
                    self.auto.stop();
                }
                StepOutcome::failure()
            }
        }
    }

    fn validate_step_ready(&self) -> bool {
        match self.lifecycle {
            MachineLifecycle::MachineSet => true,
            MachineLifecycle::InitFailed => {
                self.reporter
                    .error(self.meta.title(), "(init failed; reload required)");
                false
            }
            _ => {
                self.reporter
                    .error(self.meta.title(), "(machine not created; run Create first)");
                false
            }
        }
    }

    async fn run_step(&mut self) -> Result<StepOutcome, PipelineError> {
        let host = self
            .host
            .as_ref()
            .expect("lifecycle guard admits only bound stages");
        let result = host.step(&self.rinput).await?;
        match result {
            StepResult::Continue { routput } => {
                let state = host.current().await?;
                self.draw(&state);
                let output = (self.transform)(DecodeKind::ROutput, routput).await?;
                self.routput = Some(output.clone());
                self.reporter.clear();
                Ok(StepOutcome {
                    output: Some(output),
                    stepped: true,
                    halted: false,
                })
            }
            StepResult::Halt { foutput, snapshot } => {
                // the halt result carries its own snapshot; the machine is
                // not inspected again
                self.draw(&snapshot);
                let output = (self.transform)(DecodeKind::FOutput, foutput).await?;
                self.foutput = Some(output.clone());
                self.reporter.clear();
                Ok(StepOutcome {
                    output: Some(output),
                    stepped: true,
                    halted: true,
                })
            }
        }
    }

    /// Clear displayed outputs (runs on every Create).
    pub fn clear_outputs(&mut self) {
        self.routput = None;
        self.foutput = None;
    }

    fn draw(&mut self, state: &Value) {
        if let Some(renderer) = &mut self.renderer {
            renderer.draw(state);
        }
    }
}
