//! Integration tests for the stage lifecycle state machine
//!
//! Covers lifecycle gating, the create/step/halt scenario, terminal create
//! failures, and retryable step failures.

mod common;

use common::{ScriptedStep, register_capture_renderer, register_scripted};
use serde_json::json;

use cascade::module::ModuleCatalog;
use cascade::pipeline::{
    MachineLifecycle, Pipeline, PipelineConfig, Severity, StageDefaults,
};

fn pipeline_for(catalog: &ModuleCatalog, spec: &str, defaults: StageDefaults) -> Pipeline {
    Pipeline::new(
        PipelineConfig::new(spec).with_defaults(defaults),
        catalog.snapshot(),
    )
}

#[tokio::test]
async fn step_before_create_is_gated_not_thrown() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let probe = register_scripted(&catalog, "solo", vec![]);

    let pipeline = pipeline_for(&catalog, "solo", StageDefaults::default());
    assert!(pipeline.init().await);
    assert_eq!(pipeline.runtime_lifecycle().await, MachineLifecycle::Ready);

    // Ready but never created: neutral outcome, no module call
    let outcome = pipeline.step().await;
    assert!(!outcome.stepped);
    assert!(outcome.output.is_none());
    assert_eq!(probe.step_count(), 0);

    let report = pipeline.reporter().latest().unwrap();
    assert_eq!(report.severity, Severity::Error);
    assert!(report.message.contains("run Create first"));
}

#[tokio::test]
async fn step_before_init_is_gated() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let probe = register_scripted(&catalog, "solo", vec![]);

    let pipeline = pipeline_for(&catalog, "solo", StageDefaults::default());
    // no init: the stage is still Uninitialized
    assert_eq!(
        pipeline.runtime_lifecycle().await,
        MachineLifecycle::Uninitialized
    );
    let outcome = pipeline.step().await;
    assert!(!outcome.stepped);
    assert_eq!(probe.step_count(), 0);
}

#[tokio::test]
async fn create_step_halt_scenario() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let probe = register_scripted(
        &catalog,
        "solo",
        vec![
            ScriptedStep::Continue(json!("r1")),
            ScriptedStep::Halt(json!("done"), json!({ "final": true })),
            ScriptedStep::Continue(json!("again")),
        ],
    );

    let pipeline = pipeline_for(
        &catalog,
        "solo",
        StageDefaults {
            code: "X".to_string(),
            ainput: "Y".to_string(),
            rinput: "1".to_string(),
        },
    );
    assert!(pipeline.init().await);

    assert!(pipeline.create().await);
    assert_eq!(
        pipeline.runtime_lifecycle().await,
        MachineLifecycle::MachineSet
    );
    assert_eq!(
        probe.creates.lock().first().cloned(),
        Some(("X".to_string(), "Y".to_string()))
    );
    // fresh state rendered immediately after create
    assert!(pipeline.frame().await.contains("scripted"));

    let outcome = pipeline.step().await;
    assert!(outcome.stepped);
    assert!(!outcome.halted);
    assert_eq!(outcome.output, Some(json!("r1")));
    assert_eq!(pipeline.routput().await, Some(json!("r1")));

    let outcome = pipeline.step().await;
    assert!(outcome.stepped);
    assert!(outcome.halted);
    assert_eq!(outcome.output, Some(json!("done")));
    assert_eq!(pipeline.foutput().await, Some(json!("done")));
    // the halt snapshot is what gets rendered
    assert!(pipeline.frame().await.contains("final"));

    // re-create resets the lifecycle and clears displayed outputs
    pipeline.set_code(0, "X2").await.unwrap();
    assert!(pipeline.create().await);
    assert_eq!(
        pipeline.runtime_lifecycle().await,
        MachineLifecycle::MachineSet
    );
    assert_eq!(pipeline.routput().await, None);
    assert_eq!(pipeline.foutput().await, None);
    assert_eq!(probe.create_count(), 2);
}

#[tokio::test]
async fn create_failure_is_terminal() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let probe = register_scripted(&catalog, "solo", vec![]);

    let pipeline = pipeline_for(
        &catalog,
        "solo",
        StageDefaults {
            code: "explode".to_string(),
            ..StageDefaults::default()
        },
    );
    assert!(pipeline.init().await);

    assert!(!pipeline.create().await);
    assert_eq!(
        pipeline.runtime_lifecycle().await,
        MachineLifecycle::InitFailed
    );
    let report = pipeline.reporter().latest().unwrap();
    assert!(report.message.starts_with("init_fail"));

    // terminal: a later create is gated away without touching the module
    assert!(!pipeline.create().await);
    assert_eq!(probe.create_count(), 0);
    let report = pipeline.reporter().latest().unwrap();
    assert!(report.message.contains("reload required"));

    let outcome = pipeline.step().await;
    assert!(!outcome.stepped);
    assert_eq!(probe.step_count(), 0);
}

#[tokio::test]
async fn step_failure_leaves_machine_intact() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let probe = register_scripted(
        &catalog,
        "solo",
        vec![
            ScriptedStep::Fail("transient".to_string()),
            ScriptedStep::Continue(json!("recovered")),
        ],
    );

    let pipeline = pipeline_for(
        &catalog,
        "solo",
        StageDefaults {
            code: "ok".to_string(),
            ..StageDefaults::default()
        },
    );
    assert!(pipeline.init().await);
    assert!(pipeline.create().await);

    let outcome = pipeline.step().await;
    assert!(!outcome.stepped);
    // a failed step does not destroy the machine
    assert_eq!(
        pipeline.runtime_lifecycle().await,
        MachineLifecycle::MachineSet
    );

    let outcome = pipeline.step().await;
    assert!(outcome.stepped);
    assert_eq!(outcome.output, Some(json!("recovered")));
    assert_eq!(probe.step_count(), 2);
}
