//! Pipeline specification parsing
//!
//! A pipeline is declared as a `"=>"`-delimited string of stage names, e.g.
//! `"recursive_function => while_lang => tiny_isa"`. Parsing always yields at
//! least one stage; a spec without usable names degrades to a placeholder
//! stage so the pipeline can still surface a meaningful error.

use serde::{Deserialize, Serialize};

/// Delimiter between stage names in a pipeline specification.
pub const PIPELINE_DELIMITER: &str = "=>";

/// Placeholder stage name used when the specification is empty.
pub const MISSING_MODEL: &str = "(missing-model)";

/// Positional role of a stage within its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageRole {
    /// Sole stage of a single-stage pipeline; holds the live machine.
    Machine,
    /// First stage of a multi-stage pipeline; holds the human-authored inputs.
    Source,
    /// Interior stage holding an intermediate representation.
    Ir,
    /// Last stage of a multi-stage pipeline; holds the live machine.
    Runtime,
}

impl StageRole {
    /// Whether this stage owns the live create/step controls.
    pub fn owns_machine(&self) -> bool {
        matches!(self, StageRole::Machine | StageRole::Runtime)
    }
}

/// Identity of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMeta {
    /// Model name the stage references
    pub name: String,
    /// Position within the pipeline
    pub index: usize,
    /// Positional role
    pub role: StageRole,
}

impl StageMeta {
    /// Human-readable stage title, e.g. `"Runtime Machine (tiny_isa)"`.
    pub fn title(&self) -> String {
        match self.role {
            StageRole::Machine => format!("Machine ({})", self.name),
            StageRole::Source => format!("Source Machine ({})", self.name),
            StageRole::Runtime => format!("Runtime Machine ({})", self.name),
            StageRole::Ir => format!("IR Machine {} ({})", self.index, self.name),
        }
    }
}

/// Identity of one compiler edge between adjacent stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMeta {
    /// Source stage name
    pub source: String,
    /// Source stage index
    pub source_index: usize,
    /// Target stage name
    pub target: String,
    /// Display key, unique within the pipeline
    pub key: String,
    /// Name the compiler module is resolved under
    pub compiler_name: String,
}

/// A parsed pipeline specification: stages plus the edges between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    stages: Vec<StageMeta>,
    edges: Vec<EdgeMeta>,
}

impl PipelineSpec {
    /// Parse a specification string.
    ///
    /// Names are split on [`PIPELINE_DELIMITER`], trimmed, and empty entries
    /// dropped. A spec that yields no names falls back to the raw (trimmed)
    /// text as a single stage, and an entirely empty spec to
    /// [`MISSING_MODEL`].
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let mut names: Vec<String> = trimmed
            .split(PIPELINE_DELIMITER)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            if trimmed.is_empty() {
                names.push(MISSING_MODEL.to_string());
            } else {
                names.push(trimmed.to_string());
            }
        }

        let last = names.len() - 1;
        let stages: Vec<StageMeta> = names
            .iter()
            .enumerate()
            .map(|(index, name)| StageMeta {
                name: name.clone(),
                index,
                role: role_for(index, last),
            })
            .collect();

        let edges: Vec<EdgeMeta> = stages
            .windows(2)
            .map(|pair| EdgeMeta {
                source: pair[0].name.clone(),
                source_index: pair[0].index,
                target: pair[1].name.clone(),
                key: format!("{}->{}#{}", pair[0].name, pair[1].name, pair[0].index),
                compiler_name: format!("{}-{}", pair[0].name, pair[1].name),
            })
            .collect();

        Self { stages, edges }
    }

    /// Stages in pipeline order. Never empty.
    pub fn stages(&self) -> &[StageMeta] {
        &self.stages
    }

    /// Edges between adjacent stages; `stages().len() - 1` entries.
    pub fn edges(&self) -> &[EdgeMeta] {
        &self.edges
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// A parsed spec is never empty; provided for completeness.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the stage holding the live machine (always the last).
    pub fn runtime_index(&self) -> usize {
        self.stages.len() - 1
    }
}

fn role_for(index: usize, last: usize) -> StageRole {
    if last == 0 {
        StageRole::Machine
    } else if index == 0 {
        StageRole::Source
    } else if index == last {
        StageRole::Runtime
    } else {
        StageRole::Ir
    }
}
