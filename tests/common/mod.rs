//! Shared stub modules for integration tests: scripted machines with
//! observable probes, recording compilers, and a capture renderer.

// not every test binary uses every helper
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, json};

use cascade::error::{ModuleError, ModuleResult};
use cascade::module::{Compiler, Machine, ModuleCatalog, StepResult};
use cascade::render::{DEFAULT_RENDERER, SnapshotRenderer, Surface};

/// One scripted step outcome.
#[derive(Clone)]
pub enum ScriptedStep {
    Continue(Value),
    Halt(Value, Value),
    Fail(String),
}

/// Observable counters shared between a test and its scripted machine.
#[derive(Clone, Default)]
pub struct Probe {
    pub creates: Arc<Mutex<Vec<(String, String)>>>,
    pub steps: Arc<AtomicUsize>,
}

impl Probe {
    pub fn create_count(&self) -> usize {
        self.creates.lock().len()
    }

    pub fn step_count(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }
}

/// Machine that replays a fixed script of step results.
///
/// `create` fails when the code buffer is exactly `"explode"`; an exhausted
/// script fails the step so over-stepping is caught.
pub struct ScriptedMachine {
    probe: Probe,
    script: Arc<Mutex<VecDeque<ScriptedStep>>>,
}

impl Machine for ScriptedMachine {
    fn create(&mut self, code: &str, ainput: &str) -> ModuleResult<()> {
        if code == "explode" {
            return Err(ModuleError::Call {
                export: "create",
                detail: "scripted create failure".to_string(),
            });
        }
        self.probe
            .creates
            .lock()
            .push((code.to_string(), ainput.to_string()));
        Ok(())
    }

    fn step(&mut self, _rinput: &str) -> ModuleResult<StepResult> {
        self.probe.steps.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(ScriptedStep::Continue(routput)) => Ok(StepResult::Continue { routput }),
            Some(ScriptedStep::Halt(foutput, snapshot)) => {
                Ok(StepResult::Halt { foutput, snapshot })
            }
            Some(ScriptedStep::Fail(detail)) => Err(ModuleError::Call {
                export: "step",
                detail,
            }),
            None => Err(ModuleError::Call {
                export: "step",
                detail: "script exhausted".to_string(),
            }),
        }
    }

    fn current(&self) -> ModuleResult<Value> {
        Ok(json!({ "scripted": { "remaining": self.script.lock().len() } }))
    }
}

/// Register a scripted machine under `name`; returns the probe.
pub fn register_scripted(
    catalog: &ModuleCatalog,
    name: &str,
    script: Vec<ScriptedStep>,
) -> Probe {
    let probe = Probe::default();
    let shared_probe = probe.clone();
    let shared_script = Arc::new(Mutex::new(VecDeque::from(script)));
    catalog.register_machine(name, move |_instance| {
        Ok(cascade::module::MachineExports::from_machine(
            ScriptedMachine {
                probe: shared_probe.clone(),
                script: Arc::clone(&shared_script),
            },
        ))
    });
    probe
}

/// Compiler that tags everything it touches and records decode order.
///
/// Encodes prefix the text with the tag; decodes wrap the value in a
/// single-key object named after the tag, so chained decodes show their
/// composition order structurally.
pub struct RecordingCompiler {
    tag: String,
    decode_log: Arc<Mutex<Vec<String>>>,
}

impl RecordingCompiler {
    fn wrap(&self, value: Value) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(self.tag.clone(), value);
        Value::Object(map)
    }
}

impl Compiler for RecordingCompiler {
    fn compile_code(&mut self, code: &str) -> ModuleResult<String> {
        Ok(format!("{}:{}", self.tag, code))
    }

    fn compile_ainput(&mut self, ainput: &str) -> ModuleResult<String> {
        Ok(format!("{}:{}", self.tag, ainput))
    }

    fn compile_rinput(&mut self, rinput: &str) -> ModuleResult<String> {
        Ok(format!("{}:{}", self.tag, rinput))
    }

    fn decode_routput(&mut self, value: Value) -> ModuleResult<Value> {
        self.decode_log.lock().push(self.tag.clone());
        Ok(self.wrap(value))
    }

    fn decode_foutput(&mut self, value: Value) -> ModuleResult<Value> {
        self.decode_log.lock().push(self.tag.clone());
        Ok(self.wrap(value))
    }
}

/// Register a recording compiler; `tag` marks its work in buffers and logs.
pub fn register_recording_compiler(
    catalog: &ModuleCatalog,
    name: &str,
    tag: &str,
    decode_log: Arc<Mutex<Vec<String>>>,
) {
    let tag = tag.to_string();
    catalog.register_compiler(name, move |_instance| {
        Ok(cascade::module::CompilerExports::from_compiler(
            RecordingCompiler {
                tag: tag.clone(),
                decode_log: Arc::clone(&decode_log),
            },
        ))
    });
}

/// Renderer that writes each state verbatim into its surface.
pub struct CaptureRenderer {
    surface: Surface,
}

impl SnapshotRenderer for CaptureRenderer {
    fn draw(&mut self, state: &Value) {
        self.surface.replace(vec![state.to_string()]);
    }
}

/// Register the capture renderer as the default for all models.
pub fn register_capture_renderer(catalog: &ModuleCatalog) {
    catalog.register_renderer(DEFAULT_RENDERER, |surface| {
        Ok(Box::new(CaptureRenderer { surface }))
    });
}
