//! Integration tests for compile-forward and chained reverse decode
//!
//! Covers decode ordering across edges, independence of the three buffer
//! actions, edge degradation, and the fatal runtime-stage failure.

mod common;

use std::sync::Arc;

use common::{
    ScriptedStep, register_capture_renderer, register_recording_compiler, register_scripted,
};
use parking_lot::Mutex;
use serde_json::json;

use cascade::error::PipelineError;
use cascade::module::{EncodeKind, ModuleCatalog};
use cascade::pipeline::{MachineLifecycle, Pipeline, PipelineConfig, StageDefaults};

#[tokio::test]
async fn reverse_decode_applies_edges_backwards() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let decode_log = Arc::new(Mutex::new(Vec::new()));
    register_recording_compiler(&catalog, "a-b", "a-b", Arc::clone(&decode_log));
    register_recording_compiler(&catalog, "b-c", "b-c", Arc::clone(&decode_log));
    register_scripted(
        &catalog,
        "c",
        vec![ScriptedStep::Continue(json!("o"))],
    );

    let pipeline = Pipeline::new(
        PipelineConfig::new("a => b => c").with_defaults(StageDefaults {
            code: "run".to_string(),
            ..StageDefaults::default()
        }),
        catalog.snapshot(),
    );
    assert!(pipeline.init().await);
    assert!(pipeline.create().await);

    let outcome = pipeline.step().await;
    assert!(outcome.stepped);

    // the edge closest to the runtime decodes first, then its predecessor,
    // each consuming the previous decode's result
    assert_eq!(*decode_log.lock(), vec!["b-c".to_string(), "a-b".to_string()]);
    assert_eq!(
        outcome.output,
        Some(json!({ "a-b": { "b-c": "o" } }))
    );
}

#[tokio::test]
async fn compile_forward_moves_one_buffer_at_a_time() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let decode_log = Arc::new(Mutex::new(Vec::new()));
    register_recording_compiler(&catalog, "a-b", "ab", Arc::clone(&decode_log));
    register_scripted(&catalog, "b", vec![]);

    let pipeline = Pipeline::new(
        PipelineConfig::new("a => b").with_defaults(StageDefaults {
            code: "CODE".to_string(),
            ainput: "AIN".to_string(),
            rinput: "RIN".to_string(),
        }),
        catalog.snapshot(),
    );
    assert!(pipeline.init().await);

    pipeline.compile_forward(0, EncodeKind::Code).await.unwrap();
    assert_eq!(pipeline.code(1).await.unwrap(), "ab:CODE");
    // the other buffers are untouched: the three actions are independent
    assert_eq!(pipeline.ainput(1).await.unwrap(), "");
    assert_eq!(pipeline.rinput(1).await.unwrap(), "");

    pipeline.compile_forward(0, EncodeKind::AInput).await.unwrap();
    pipeline.compile_forward(0, EncodeKind::RInput).await.unwrap();
    assert_eq!(pipeline.ainput(1).await.unwrap(), "ab:AIN");
    assert_eq!(pipeline.rinput(1).await.unwrap(), "ab:RIN");
}

#[tokio::test]
async fn unavailable_edge_degrades_but_pipeline_survives() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let decode_log = Arc::new(Mutex::new(Vec::new()));
    // only the second edge's compiler exists
    register_recording_compiler(&catalog, "b-c", "bc", Arc::clone(&decode_log));
    register_scripted(&catalog, "c", vec![ScriptedStep::Continue(json!(1))]);

    let pipeline = Pipeline::new(
        PipelineConfig::new("a => b => c").with_defaults(StageDefaults {
            code: "x".to_string(),
            ..StageDefaults::default()
        }),
        catalog.snapshot(),
    );

    // runtime still initializes; only the edge is degraded
    assert!(pipeline.init().await);
    assert!(!pipeline.is_disabled());
    assert_eq!(pipeline.runtime_lifecycle().await, MachineLifecycle::Ready);

    let status = pipeline.edge_status();
    assert!(status[0].contains("unavailable"));
    assert!(!status[1].contains("unavailable"));

    // the degraded edge refuses its compile actions
    let err = pipeline.compile_forward(0, EncodeKind::Code).await.unwrap_err();
    assert!(matches!(err, PipelineError::Edge(_)));

    // the healthy sibling still encodes
    pipeline.compile_forward(1, EncodeKind::Code).await.unwrap();
    assert_eq!(pipeline.code(2).await.unwrap(), "bc:");

    // stepping needs the full decode chain, so it reports and fails neutrally
    assert!(pipeline.create().await);
    let outcome = pipeline.step().await;
    assert!(!outcome.stepped);
}

#[tokio::test]
async fn runtime_stage_failure_disables_pipeline() {
    let catalog = ModuleCatalog::new();
    register_capture_renderer(&catalog);
    let decode_log = Arc::new(Mutex::new(Vec::new()));
    register_recording_compiler(&catalog, "a-b", "ab", Arc::clone(&decode_log));
    // machine "b" is never registered

    let pipeline = Pipeline::new(PipelineConfig::new("a => b"), catalog.snapshot());
    assert!(!pipeline.init().await);
    assert!(pipeline.is_disabled());
    assert_eq!(
        pipeline.runtime_lifecycle().await,
        MachineLifecycle::InitFailed
    );

    assert!(!pipeline.create().await);
    let outcome = pipeline.step().await;
    assert!(!outcome.stepped);
    // even the healthy edge is refused once the pipeline is disabled
    let err = pipeline.compile_forward(0, EncodeKind::Code).await.unwrap_err();
    assert!(matches!(err, PipelineError::Disabled));
}
