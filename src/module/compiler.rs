//! Compiler host: binds one compiler module instance
//!
//! Same load/validate/idempotent-init discipline as the machine host, over the
//! five translation exports. Dispatch is by closed kind enums, so an unknown
//! kind is unrepresentable rather than a runtime check.

use std::fmt;

use serde_json::Value;

use super::catalog::{InstanceId, ModuleRegistry};
use super::{CompileFn, DecodeFn, exports};
use crate::error::{ModuleError, ModuleResult};

/// Which boundary buffer an encode translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeKind {
    /// Program text
    Code,
    /// Ahead-of-time input
    AInput,
    /// Runtime input
    RInput,
}

impl fmt::Display for EncodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodeKind::Code => "code",
            EncodeKind::AInput => "ainput",
            EncodeKind::RInput => "rinput",
        };
        write!(f, "{name}")
    }
}

/// Which output kind a decode translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    /// Continuing-step output
    ROutput,
    /// Final output
    FOutput,
}

impl fmt::Display for DecodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecodeKind::ROutput => "routput",
            DecodeKind::FOutput => "foutput",
        };
        write!(f, "{name}")
    }
}

/// Host for one instance of a named compiler module.
pub struct CompilerHost {
    name: String,
    instance: InstanceId,
    bound: Option<Bound>,
}

struct Bound {
    compile_code: CompileFn,
    compile_ainput: CompileFn,
    compile_rinput: CompileFn,
    decode_routput: DecodeFn,
    decode_foutput: DecodeFn,
}

impl CompilerHost {
    /// Create an unbound host for the compiler named `name`.
    pub fn new(name: impl Into<String>, instance: InstanceId) -> Self {
        Self {
            name: name.into(),
            instance,
            bound: None,
        }
    }

    /// Compiler name this host binds.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `init` has completed successfully.
    pub fn is_ready(&self) -> bool {
        self.bound.is_some()
    }

    /// Instantiate and validate the module; idempotent. Missing exports are
    /// aggregated into a single error.
    pub async fn init(&mut self, registry: &ModuleRegistry) -> ModuleResult<()> {
        if self.bound.is_some() {
            return Ok(());
        }

        let table = registry.instantiate_compiler(&self.name, &self.instance)?;

        let mut missing = Vec::new();
        if table.compile_code.is_none() {
            missing.push(exports::COMPILE_CODE);
        }
        if table.compile_ainput.is_none() {
            missing.push(exports::COMPILE_AINPUT);
        }
        if table.compile_rinput.is_none() {
            missing.push(exports::COMPILE_RINPUT);
        }
        if table.decode_routput.is_none() {
            missing.push(exports::DECODE_ROUTPUT);
        }
        if table.decode_foutput.is_none() {
            missing.push(exports::DECODE_FOUTPUT);
        }
        if !missing.is_empty() {
            return Err(ModuleError::MissingExports {
                module: self.name.clone(),
                missing,
            });
        }

        if let Some(init) = &table.init {
            init().await?;
        }

        tracing::debug!(compiler = %self.name, instance = %self.instance, "compiler module bound");

        self.bound = Some(Bound {
            compile_code: table.compile_code.expect("validated above"),
            compile_ainput: table.compile_ainput.expect("validated above"),
            compile_rinput: table.compile_rinput.expect("validated above"),
            decode_routput: table.decode_routput.expect("validated above"),
            decode_foutput: table.decode_foutput.expect("validated above"),
        });
        Ok(())
    }

    fn bound(&self) -> ModuleResult<&Bound> {
        self.bound
            .as_ref()
            .ok_or_else(|| ModuleError::NotReady(self.name.clone()))
    }

    /// Translate a boundary buffer forward through this compiler.
    pub async fn encode(&self, kind: EncodeKind, text: &str) -> ModuleResult<String> {
        let bound = self.bound()?;
        let export = match kind {
            EncodeKind::Code => &bound.compile_code,
            EncodeKind::AInput => &bound.compile_ainput,
            EncodeKind::RInput => &bound.compile_rinput,
        };
        export(text.to_string()).await
    }

    /// Decode an output value backward through this compiler.
    pub async fn decode(&self, kind: DecodeKind, value: Value) -> ModuleResult<Value> {
        let bound = self.bound()?;
        let export = match kind {
            DecodeKind::ROutput => &bound.decode_routput,
            DecodeKind::FOutput => &bound.decode_foutput,
        };
        export(value).await
    }
}
