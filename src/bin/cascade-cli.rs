//! Cascade CLI - drive a pipeline from the command line
//!
//! Registers the built-in demo modules (a modular counter machine, an
//! identity compiler, and the generic block renderer), builds a pipeline from
//! a specification string, and exposes the same controls a playground page
//! would: create, step, auto-step.

use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use cascade::error::{ModuleError, ModuleResult};
use cascade::module::{Compiler, Machine, ModuleCatalog, StepResult};
use cascade::pipeline::{Pipeline, PipelineConfig, StageDefaults};
use cascade::render::{BlockRenderer, DEFAULT_RENDERER};

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Model-agnostic pipeline orchestration runtime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered demo models
    Models,

    /// Build a pipeline, create the machine, and run steps
    Run {
        /// Pipeline specification, e.g. "counter" or "counter => counter"
        #[arg(long, default_value = "counter")]
        spec: String,

        /// Program text for the source stage
        #[arg(long, default_value = "10")]
        code: String,

        /// Ahead-of-time input for the source stage
        #[arg(long, default_value = "0")]
        ainput: String,

        /// Runtime input fed to every step
        #[arg(long, default_value = "1")]
        rinput: String,

        /// Number of manual steps to run
        #[arg(short, long, default_value = "5")]
        steps: usize,

        /// Drive the remaining steps automatically at this interval (seconds)
        #[arg(long)]
        auto: Option<f64>,
    },
}

/// Modular counter: `code` is the modulus, `ainput` the start value, and each
/// step adds the parsed `rinput` (empty input counts 1). The machine halts
/// when the counter wraps past the modulus.
#[derive(Default)]
struct CounterMachine {
    modulus: u64,
    value: u64,
}

fn parse_number(text: &str, what: &'static str) -> ModuleResult<u64> {
    text.trim().parse().map_err(|_| ModuleError::Call {
        export: what,
        detail: format!("'{}' is not a number", text.trim()),
    })
}

impl CounterMachine {
    fn snapshot(&self) -> Value {
        json!([{
            "kind": "kv",
            "title": "Counter",
            "items": [
                { "key": "value", "value": self.value },
                { "key": "modulus", "value": self.modulus },
            ],
        }])
    }
}

impl Machine for CounterMachine {
    fn create(&mut self, code: &str, ainput: &str) -> ModuleResult<()> {
        let modulus = parse_number(code, "create")?;
        if modulus == 0 {
            return Err(ModuleError::Call {
                export: "create",
                detail: "modulus must be positive".to_string(),
            });
        }
        self.modulus = modulus;
        self.value = if ainput.trim().is_empty() {
            0
        } else {
            parse_number(ainput, "create")? % modulus
        };
        Ok(())
    }

    fn step(&mut self, rinput: &str) -> ModuleResult<StepResult> {
        let increment = if rinput.trim().is_empty() {
            1
        } else {
            parse_number(rinput, "step")?
        };
        self.value += increment;
        if self.value >= self.modulus {
            self.value %= self.modulus;
            Ok(StepResult::Halt {
                foutput: json!(self.value),
                snapshot: self.snapshot(),
            })
        } else {
            Ok(StepResult::Continue {
                routput: json!(self.value),
            })
        }
    }

    fn current(&self) -> ModuleResult<Value> {
        Ok(self.snapshot())
    }
}

/// Identity compiler: stage encodings are the same on both sides.
#[derive(Default)]
struct IdentityCompiler;

impl Compiler for IdentityCompiler {
    fn compile_code(&mut self, code: &str) -> ModuleResult<String> {
        Ok(code.to_string())
    }

    fn compile_ainput(&mut self, ainput: &str) -> ModuleResult<String> {
        Ok(ainput.to_string())
    }

    fn compile_rinput(&mut self, rinput: &str) -> ModuleResult<String> {
        Ok(rinput.to_string())
    }

    fn decode_routput(&mut self, value: Value) -> ModuleResult<Value> {
        Ok(value)
    }

    fn decode_foutput(&mut self, value: Value) -> ModuleResult<Value> {
        Ok(value)
    }
}

fn build_catalog() -> ModuleCatalog {
    let catalog = ModuleCatalog::new();
    catalog.register_machine_sync("counter", CounterMachine::default);
    catalog.register_compiler_sync("counter-counter", || IdentityCompiler);
    catalog.register_renderer(DEFAULT_RENDERER, |surface| {
        Ok(Box::new(BlockRenderer::new(surface)))
    });
    catalog
}

fn print_report(pipeline: &Pipeline) {
    if let Some(report) = pipeline.reporter().latest() {
        println!("[{:?}] {}: {}", report.severity, report.origin, report.message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Models => {
            let registry = build_catalog().snapshot();
            for name in registry.list_machines() {
                println!("{name}");
            }
        }

        Commands::Run {
            spec,
            code,
            ainput,
            rinput,
            steps,
            auto,
        } => {
            let registry = build_catalog().snapshot();
            let config = PipelineConfig::new(&spec).with_defaults(StageDefaults {
                code,
                ainput,
                rinput,
            });
            let pipeline = Pipeline::new(config, registry);

            if !pipeline.init().await {
                print_report(&pipeline);
                anyhow::bail!("pipeline failed to initialize");
            }

            // compile every buffer forward so the runtime stage sees the
            // translated encodings
            let edge_count = pipeline.spec().edges().len();
            for edge in 0..edge_count {
                use cascade::module::EncodeKind;
                pipeline.compile_forward(edge, EncodeKind::Code).await?;
                pipeline.compile_forward(edge, EncodeKind::AInput).await?;
                pipeline.compile_forward(edge, EncodeKind::RInput).await?;
            }

            if !pipeline.create().await {
                print_report(&pipeline);
                anyhow::bail!("machine creation failed");
            }
            println!("{}", pipeline.frame().await);

            for _ in 0..steps {
                let outcome = pipeline.step().await;
                if !outcome.stepped {
                    print_report(&pipeline);
                    break;
                }
                if let Some(output) = &outcome.output {
                    let label = if outcome.halted { "foutput" } else { "routput" };
                    println!("{label}: {output}");
                }
                println!("{}", pipeline.frame().await);
                if outcome.halted {
                    break;
                }
            }

            if let Some(interval) = auto {
                pipeline.set_auto_interval(interval);
                if pipeline.start_auto() {
                    while pipeline.auto_running() {
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    }
                    println!("{}", pipeline.frame().await);
                    if let Some(foutput) = pipeline.foutput().await {
                        println!("foutput: {foutput}");
                    }
                }
            }
        }
    }

    Ok(())
}
