//! Machine host: binds one computation module instance
//!
//! Mirrors the module boundary of the playground hosts: instantiate the
//! module, validate the export table (collecting every missing name), run the
//! optional one-time init, then forward create/step/current through the bound
//! exports. Failures are not converted here — the owning stage decides what a
//! failure means for its lifecycle.

use serde_json::Value;

use super::catalog::{InstanceId, ModuleRegistry};
use super::{CreateFn, CurrentFn, StepFn, StepResult, exports};
use crate::error::{ModuleError, ModuleResult};

/// Host for one instance of a named computation module.
pub struct MachineHost {
    model: String,
    instance: InstanceId,
    bound: Option<Bound>,
}

struct Bound {
    create: CreateFn,
    step: StepFn,
    current: CurrentFn,
}

impl MachineHost {
    /// Create an unbound host for `model` with a distinguishing instance key.
    pub fn new(model: impl Into<String>, instance: InstanceId) -> Self {
        Self {
            model: model.into(),
            instance,
            bound: None,
        }
    }

    /// Model name this host binds.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether `init` has completed successfully.
    pub fn is_ready(&self) -> bool {
        self.bound.is_some()
    }

    /// Instantiate and validate the module. Idempotent: a second call on a
    /// bound host is a no-op.
    ///
    /// Required exports are resolved together so the error names every absent
    /// one, not just the first. The module's own init export runs after
    /// validation.
    pub async fn init(&mut self, registry: &ModuleRegistry) -> ModuleResult<()> {
        if self.bound.is_some() {
            return Ok(());
        }

        let table = registry.instantiate_machine(&self.model, &self.instance)?;

        let mut missing = Vec::new();
        if table.create.is_none() {
            missing.push(exports::CREATE);
        }
        if table.step.is_none() {
            missing.push(exports::STEP);
        }
        if table.current.is_none() {
            missing.push(exports::CURRENT);
        }
        if !missing.is_empty() {
            return Err(ModuleError::MissingExports {
                module: self.model.clone(),
                missing,
            });
        }

        if let Some(init) = &table.init {
            init().await?;
        }

        tracing::debug!(model = %self.model, instance = %self.instance, "machine module bound");

        self.bound = Some(Bound {
            create: table.create.expect("validated above"),
            step: table.step.expect("validated above"),
            current: table.current.expect("validated above"),
        });
        Ok(())
    }

    fn bound(&self) -> ModuleResult<&Bound> {
        self.bound
            .as_ref()
            .ok_or_else(|| ModuleError::NotReady(self.model.clone()))
    }

    /// Forward to the module's `create` export.
    pub async fn create(&self, code: &str, ainput: &str) -> ModuleResult<()> {
        let bound = self.bound()?;
        (bound.create)(code.to_string(), ainput.to_string()).await
    }

    /// Forward to the module's `step` export.
    pub async fn step(&self, rinput: &str) -> ModuleResult<StepResult> {
        let bound = self.bound()?;
        (bound.step)(rinput.to_string()).await
    }

    /// Forward to the module's `current` export.
    pub async fn current(&self) -> ModuleResult<Value> {
        let bound = self.bound()?;
        (bound.current)().await
    }
}
