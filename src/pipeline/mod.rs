//! Pipeline orchestration
//!
//! The [`Pipeline`] is the top-level coordinator: it parses a specification
//! into stages and compiler edges, owns the create/step lifecycle of the
//! runtime stage, wires compile-forward actions across edges, and chains the
//! reverse decode that turns a runtime output back into the source stage's
//! encoding.
//!
//! Initialization order matters: every compiler edge binds first (failures
//! degrade just that edge), then the runtime stage binds its renderer and
//! machine module. A runtime failure disables the whole pipeline — it is
//! useless without an executable final stage — while edge failures are not
//! fatal because raw end-to-end input can still be entered manually.

use futures::FutureExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

pub mod autostep;
pub mod edge;
pub mod node;
pub mod report;
pub mod spec;

pub use autostep::AutoStep;
pub use edge::CompilerEdge;
pub use node::{MachineLifecycle, StageNode, StepOutcome, StepTrigger};
pub use report::{Report, Reporter, Severity};
pub use spec::{EdgeMeta, MISSING_MODEL, PipelineSpec, StageMeta, StageRole};

use crate::error::{PipelineError, Result};
use crate::module::{EncodeKind, InstanceAllocator, ModuleRegistry};

/// Default text seeded into the source stage's buffers.
#[derive(Debug, Clone, Default)]
pub struct StageDefaults {
    /// Program text
    pub code: String,
    /// Ahead-of-time input
    pub ainput: String,
    /// Runtime input
    pub rinput: String,
}

/// Pipeline construction parameters.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Specification string, e.g. `"a => b => c"`
    pub spec: String,
    /// Defaults for the source stage (later stages start empty)
    pub defaults: StageDefaults,
}

impl PipelineConfig {
    /// Config for a spec string with empty defaults.
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            defaults: StageDefaults::default(),
        }
    }

    /// Attach source-stage defaults.
    pub fn with_defaults(mut self, defaults: StageDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Top-level pipeline orchestrator.
pub struct Pipeline {
    spec: PipelineSpec,
    stages: Vec<Arc<Mutex<StageNode>>>,
    edges: Vec<Arc<CompilerEdge>>,
    registry: ModuleRegistry,
    allocator: InstanceAllocator,
    reporter: Reporter,
    auto: AutoStep,
    disabled: AtomicBool,
}

impl Pipeline {
    /// Build a pipeline from a configuration and a registry snapshot.
    ///
    /// Construction only assembles the graph; call [`Pipeline::init`] to bind
    /// modules.
    pub fn new(config: PipelineConfig, registry: ModuleRegistry) -> Self {
        let spec = PipelineSpec::parse(&config.spec);
        let reporter = Reporter::new();
        let allocator = InstanceAllocator::new();

        tracing::info!(
            spec = %config.spec,
            pipeline = %spec
                .stages()
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(" => "),
            "pipeline parsed"
        );

        let edges: Vec<Arc<CompilerEdge>> = spec
            .edges()
            .iter()
            .cloned()
            .map(|meta| Arc::new(CompilerEdge::new(meta)))
            .collect();

        let runtime_index = spec.runtime_index();
        let mut stages = Vec::with_capacity(spec.len());
        let mut runtime_auto = None;

        for meta in spec.stages() {
            let defaults = if meta.index == 0 {
                config.defaults.clone()
            } else {
                StageDefaults::default()
            };
            let auto = AutoStep::new();
            let mut node = StageNode::new(meta.clone(), defaults, reporter.clone(), auto.clone());

            if meta.index == runtime_index {
                // runtime outputs decode through every edge in reverse
                // creation order before becoming the pipeline's output
                let chain = edges.clone();
                node.set_output_transform(Arc::new(move |kind, value| {
                    let chain = chain.clone();
                    async move {
                        let mut current = value;
                        for edge in chain.iter().rev() {
                            current = edge.decode(kind, current).await?;
                        }
                        Ok(current)
                    }
                    .boxed()
                }));
                runtime_auto = Some(auto);
            }

            stages.push(Arc::new(Mutex::new(node)));
        }

        Self {
            spec,
            stages,
            edges,
            registry,
            allocator,
            reporter,
            auto: runtime_auto.expect("spec always has a runtime stage"),
            disabled: AtomicBool::new(false),
        }
    }

    /// Bind all modules: every edge first (degraded edges tolerated), then
    /// the runtime stage. Returns whether the runtime stage is usable; when
    /// it is not, the whole pipeline is disabled.
    pub async fn init(&self) -> bool {
        for edge in &self.edges {
            edge.init_host(&self.registry, &self.allocator, &self.reporter)
                .await;
        }

        let runtime = &self.stages[self.spec.runtime_index()];
        let ready = {
            let mut node = runtime.lock().await;
            node.init_runtime(&self.registry, &self.allocator).await
        };
        if !ready {
            self.disable();
            return false;
        }

        runtime.lock().await.clear_outputs();
        self.reporter.clear();
        true
    }

    /// The parsed specification.
    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    /// This pipeline's reporting channel.
    pub fn reporter(&self) -> Reporter {
        self.reporter.clone()
    }

    /// Whether the pipeline has been disabled by a fatal runtime failure.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
        self.auto.stop();
    }

    fn guard_enabled(&self) -> bool {
        if self.is_disabled() {
            self.reporter.error("pipeline", "(pipeline disabled)");
            return false;
        }
        true
    }

    fn stage(&self, index: usize) -> Result<&Arc<Mutex<StageNode>>> {
        self.stages
            .get(index)
            .ok_or(PipelineError::StageOutOfRange(index))
    }

    /// Lifecycle of the runtime stage's machine.
    pub async fn runtime_lifecycle(&self) -> MachineLifecycle {
        self.stages[self.spec.runtime_index()].lock().await.lifecycle()
    }

    /// Read a stage's code buffer.
    pub async fn code(&self, stage: usize) -> Result<String> {
        Ok(self.stage(stage)?.lock().await.code().to_string())
    }

    /// Write a stage's code buffer.
    pub async fn set_code(&self, stage: usize, text: impl Into<String>) -> Result<()> {
        self.stage(stage)?.lock().await.set_code(text);
        Ok(())
    }

    /// Read a stage's ahead-of-time input buffer.
    pub async fn ainput(&self, stage: usize) -> Result<String> {
        Ok(self.stage(stage)?.lock().await.ainput().to_string())
    }

    /// Write a stage's ahead-of-time input buffer.
    pub async fn set_ainput(&self, stage: usize, text: impl Into<String>) -> Result<()> {
        self.stage(stage)?.lock().await.set_ainput(text);
        Ok(())
    }

    /// Read a stage's runtime input buffer.
    pub async fn rinput(&self, stage: usize) -> Result<String> {
        Ok(self.stage(stage)?.lock().await.rinput().to_string())
    }

    /// Write a stage's runtime input buffer.
    pub async fn set_rinput(&self, stage: usize, text: impl Into<String>) -> Result<()> {
        self.stage(stage)?.lock().await.set_rinput(text);
        Ok(())
    }

    /// Last decoded continuing output of the runtime stage.
    pub async fn routput(&self) -> Option<serde_json::Value> {
        self.stages[self.spec.runtime_index()]
            .lock()
            .await
            .routput()
            .cloned()
    }

    /// Last decoded final output of the runtime stage.
    pub async fn foutput(&self) -> Option<serde_json::Value> {
        self.stages[self.spec.runtime_index()]
            .lock()
            .await
            .foutput()
            .cloned()
    }

    /// The runtime stage's rendered snapshot frame.
    pub async fn frame(&self) -> String {
        self.stages[self.spec.runtime_index()].lock().await.frame()
    }

    /// One status line per edge, in pipeline order.
    pub fn edge_status(&self) -> Vec<String> {
        self.edges.iter().map(|edge| edge.status_line()).collect()
    }

    /// Translate one boundary buffer across an edge: read the source stage's
    /// buffer, encode it through the edge's compiler, write the target
    /// stage's buffer. The three buffer kinds are independent actions — they
    /// are never chained to each other.
    pub async fn compile_forward(&self, edge_index: usize, kind: EncodeKind) -> Result<()> {
        if !self.guard_enabled() {
            return Err(PipelineError::Disabled);
        }
        let edge = self
            .edges
            .get(edge_index)
            .ok_or(PipelineError::EdgeOutOfRange(edge_index))?;
        let source_index = edge.meta().source_index;
        let target_index = source_index + 1;

        let text = {
            let node = self.stage(source_index)?.lock().await;
            match kind {
                EncodeKind::Code => node.code().to_string(),
                EncodeKind::AInput => node.ainput().to_string(),
                EncodeKind::RInput => node.rinput().to_string(),
            }
        };

        match edge.encode(kind, &text).await {
            Ok(encoded) => {
                let mut node = self.stage(target_index)?.lock().await;
                match kind {
                    EncodeKind::Code => node.set_code(encoded),
                    EncodeKind::AInput => node.set_ainput(encoded),
                    EncodeKind::RInput => node.set_rinput(encoded),
                }
                self.reporter.clear();
                Ok(())
            }
            Err(err) => {
                self.reporter
                    .error("pipeline", format!("Compile error: {err}"));
                Err(err.into())
            }
        }
    }

    /// Create (or re-create) the runtime machine from its current buffers.
    pub async fn create(&self) -> bool {
        if !self.guard_enabled() {
            return false;
        }
        let runtime = &self.stages[self.spec.runtime_index()];
        let mut node = runtime.lock().await;
        node.create_from_inputs().await
    }

    /// Advance the runtime machine one step (manual trigger).
    pub async fn step(&self) -> StepOutcome {
        if !self.guard_enabled() {
            return StepOutcome::failure();
        }
        let runtime = &self.stages[self.spec.runtime_index()];
        let mut node = runtime.lock().await;
        node.step_from_input(StepTrigger::Manual).await
    }

    /// Arm the auto-step loop at the configured interval.
    ///
    /// No-op returning `false` when disabled, already running, or no positive
    /// interval is set.
    pub fn start_auto(&self) -> bool {
        if !self.guard_enabled() {
            return false;
        }
        let stage = Arc::clone(&self.stages[self.spec.runtime_index()]);
        self.auto.start(move || {
            let stage = Arc::clone(&stage);
            async move {
                stage
                    .lock()
                    .await
                    .step_from_input(StepTrigger::Auto)
                    .await
            }
        })
    }

    /// Stop the auto-step loop. Idempotent.
    pub fn stop_auto(&self) {
        self.auto.stop();
    }

    /// Toggle the auto-step loop; returns whether it is running afterwards.
    pub fn toggle_auto(&self) -> bool {
        if self.auto.is_running() {
            self.auto.stop();
            false
        } else {
            self.start_auto()
        }
    }

    /// Whether the auto-step loop is running.
    pub fn auto_running(&self) -> bool {
        self.auto.is_running()
    }

    /// Configure the auto-step interval in seconds (`> 0` required to arm).
    ///
    /// A running loop restarts so the pending timer picks up the new cadence
    /// immediately instead of firing once more on the old one.
    pub fn set_auto_interval(&self, secs: f64) {
        let was_running = self.auto.is_running();
        self.auto.set_interval_secs(secs);
        if was_running {
            self.auto.stop();
            self.start_auto();
        }
    }
}
