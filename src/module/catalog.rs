//! Module catalog and factory system
//!
//! Machine, compiler, and renderer factories are registered by name prior to
//! building pipelines. Each pipeline takes an immutable snapshot of the
//! catalog, so late registrations never change a running pipeline and tests
//! stay isolated. There is deliberately no process-global catalog: the
//! embedding host owns one (or several) and passes snapshots down.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use super::{Compiler, CompilerExports, Machine, MachineExports};
use crate::error::{ModuleError, ModuleResult, RenderError, RenderResult};
use crate::render::{DEFAULT_RENDERER, SnapshotRenderer, Surface};

/// Factory producing one machine module instance.
pub type MachineFactory = Arc<dyn Fn(&InstanceId) -> ModuleResult<MachineExports> + Send + Sync>;

/// Factory producing one compiler module instance.
pub type CompilerFactory = Arc<dyn Fn(&InstanceId) -> ModuleResult<CompilerExports> + Send + Sync>;

/// Factory constructing a renderer onto a display surface.
pub type RendererFactory =
    Arc<dyn Fn(Surface) -> RenderResult<Box<dyn SnapshotRenderer>> + Send + Sync>;

/// Distinguishing key for one module instantiation.
///
/// Two stages referencing the same model name must not share module-level
/// mutable state, so every host gets its own key; factories that cache must
/// key on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId {
    pipeline: Uuid,
    seq: u64,
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.pipeline, self.seq)
    }
}

/// Per-pipeline allocator of [`InstanceId`]s.
///
/// Injected rather than global so that unrelated pipelines (and test runs)
/// never observe each other's sequence numbers.
pub struct InstanceAllocator {
    pipeline: Uuid,
    next: AtomicU64,
}

impl InstanceAllocator {
    /// Create an allocator for a fresh pipeline identity.
    pub fn new() -> Self {
        Self {
            pipeline: Uuid::new_v4(),
            next: AtomicU64::new(0),
        }
    }

    /// Allocate the next instance key.
    pub fn allocate(&self) -> InstanceId {
        InstanceId {
            pipeline: self.pipeline,
            seq: self.next.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for InstanceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable catalog of module definitions.
pub struct ModuleCatalog {
    machines: RwLock<HashMap<String, MachineFactory>>,
    compilers: RwLock<HashMap<String, CompilerFactory>>,
    renderers: RwLock<HashMap<String, RendererFactory>>,
}

impl ModuleCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            machines: RwLock::new(HashMap::new()),
            compilers: RwLock::new(HashMap::new()),
            renderers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a machine module factory under a model name.
    pub fn register_machine<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&InstanceId) -> ModuleResult<MachineExports> + Send + Sync + 'static,
    {
        self.machines.write().insert(name.into(), Arc::new(factory));
    }

    /// Register a synchronous [`Machine`] implementation; each instantiation
    /// gets a fresh value from `make`.
    pub fn register_machine_sync<M, F>(&self, name: impl Into<String>, make: F)
    where
        M: Machine,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.register_machine(name, move |_instance| {
            Ok(MachineExports::from_machine(make()))
        });
    }

    /// Register a compiler module factory under a compiler name
    /// (conventionally `"<from>-<to>"`).
    pub fn register_compiler<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&InstanceId) -> ModuleResult<CompilerExports> + Send + Sync + 'static,
    {
        self.compilers
            .write()
            .insert(name.into(), Arc::new(factory));
    }

    /// Register a synchronous [`Compiler`] implementation.
    pub fn register_compiler_sync<C, F>(&self, name: impl Into<String>, make: F)
    where
        C: Compiler,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.register_compiler(name, move |_instance| {
            Ok(CompilerExports::from_compiler(make()))
        });
    }

    /// Register a renderer factory for a model name.
    ///
    /// The name [`DEFAULT_RENDERER`] serves as the fallback for models without
    /// a dedicated renderer.
    pub fn register_renderer<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(Surface) -> RenderResult<Box<dyn SnapshotRenderer>> + Send + Sync + 'static,
    {
        self.renderers
            .write()
            .insert(name.into(), Arc::new(factory));
    }

    /// Produce an immutable snapshot for a pipeline instance.
    pub fn snapshot(&self) -> ModuleRegistry {
        ModuleRegistry {
            machines: Arc::new(self.machines.read().clone()),
            compilers: Arc::new(self.compilers.read().clone()),
            renderers: Arc::new(self.renderers.read().clone()),
        }
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable registry view handed to pipelines.
#[derive(Clone)]
pub struct ModuleRegistry {
    machines: Arc<HashMap<String, MachineFactory>>,
    compilers: Arc<HashMap<String, CompilerFactory>>,
    renderers: Arc<HashMap<String, RendererFactory>>,
}

impl ModuleRegistry {
    /// Instantiate the machine module registered under `name`.
    pub fn instantiate_machine(
        &self,
        name: &str,
        instance: &InstanceId,
    ) -> ModuleResult<MachineExports> {
        let factory = self
            .machines
            .get(name)
            .ok_or_else(|| ModuleError::UnknownModule(name.to_string()))?;
        factory(instance)
    }

    /// Instantiate the compiler module registered under `name`.
    pub fn instantiate_compiler(
        &self,
        name: &str,
        instance: &InstanceId,
    ) -> ModuleResult<CompilerExports> {
        let factory = self
            .compilers
            .get(name)
            .ok_or_else(|| ModuleError::UnknownModule(name.to_string()))?;
        factory(instance)
    }

    /// Construct the renderer for `model` onto `surface`, falling back to the
    /// [`DEFAULT_RENDERER`] registration.
    pub fn instantiate_renderer(
        &self,
        model: &str,
        surface: Surface,
    ) -> RenderResult<Box<dyn SnapshotRenderer>> {
        let factory = self
            .renderers
            .get(model)
            .or_else(|| self.renderers.get(DEFAULT_RENDERER))
            .ok_or_else(|| RenderError::UnknownRenderer(model.to_string()))?;
        factory(surface)
    }

    /// Whether a machine module is registered under `name`.
    pub fn has_machine(&self, name: &str) -> bool {
        self.machines.contains_key(name)
    }

    /// Whether a compiler module is registered under `name`.
    pub fn has_compiler(&self, name: &str) -> bool {
        self.compilers.contains_key(name)
    }

    /// List registered machine model names.
    pub fn list_machines(&self) -> Vec<String> {
        self.machines.keys().cloned().collect()
    }
}
