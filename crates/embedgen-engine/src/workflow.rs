//! Stage graph and the engine that runs it.
//!
//! A [`WorkflowGraph`] is compiled into dependency layers. Every stage in a
//! layer sees the same committed snapshot and runs concurrently with its
//! siblings; the engine then merges the layer's updates in declaration
//! order as the single writer.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use embedgen_config::Config;
use embedgen_llm::ModelGateway;
use embedgen_skills::SkillCatalog;
use embedgen_utils::error::{EmbedgenError, StageError, WorkflowError};
use embedgen_utils::logging::{log_stage_complete, log_stage_error, log_stage_start, stage_span};
use futures::future::join_all;
use tracing::{Instrument, info};

use crate::stages::{
    AssembleArtifactsStage, DiagramStage, GenerateCodeStage, PersistStage, PlanStage,
    PrepareWorkspaceStage, Stage, StageContext, names,
};
use crate::state::{StateUpdate, WorkflowState};

/// Stages plus `from -> to` dependency edges.
#[derive(Default)]
pub struct WorkflowGraph {
    stages: Vec<Arc<dyn Stage>>,
    edges: Vec<(String, String)>,
}

impl WorkflowGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan → PrepareWorkspace → GenerateCode → AssembleArtifacts → Persist,
    /// with Diagram beside GenerateCode when enabled.
    #[must_use]
    pub fn standard(enable_diagram: bool) -> Self {
        let mut graph = Self::new()
            .stage(PlanStage)
            .stage(PrepareWorkspaceStage)
            .stage(GenerateCodeStage)
            .edge(names::PLAN, names::PREPARE_WORKSPACE)
            .edge(names::PREPARE_WORKSPACE, names::GENERATE_CODE);

        if enable_diagram {
            graph = graph
                .stage(DiagramStage)
                .edge(names::PREPARE_WORKSPACE, names::DIAGRAM)
                .edge(names::DIAGRAM, names::ASSEMBLE_ARTIFACTS);
        }

        graph
            .stage(AssembleArtifactsStage)
            .stage(PersistStage)
            .edge(names::GENERATE_CODE, names::ASSEMBLE_ARTIFACTS)
            .edge(names::ASSEMBLE_ARTIFACTS, names::PERSIST)
    }

    #[must_use]
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    #[must_use]
    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    /// Validate the graph and group stages into layers.
    ///
    /// # Errors
    ///
    /// `WorkflowError::InvalidGraph` for an empty graph, duplicate stage
    /// names, edges naming unknown stages, self-loops and cycles.
    pub fn compile(self) -> Result<CompiledWorkflow, WorkflowError> {
        if self.stages.is_empty() {
            return Err(WorkflowError::InvalidGraph("no stages".to_string()));
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, stage) in self.stages.iter().enumerate() {
            if index.insert(stage.name(), i).is_some() {
                return Err(WorkflowError::InvalidGraph(format!(
                    "duplicate stage '{}'",
                    stage.name()
                )));
            }
        }

        let mut in_degree = vec![0usize; self.stages.len()];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); self.stages.len()];
        for (from, to) in &self.edges {
            let lookup = |name: &str| {
                index.get(name).copied().ok_or_else(|| {
                    WorkflowError::InvalidGraph(format!("edge references unknown stage '{name}'"))
                })
            };
            let (from_idx, to_idx) = (lookup(from.as_str())?, lookup(to.as_str())?);
            if from_idx == to_idx {
                return Err(WorkflowError::InvalidGraph(format!(
                    "stage '{from}' depends on itself"
                )));
            }
            if !successors[from_idx].contains(&to_idx) {
                successors[from_idx].push(to_idx);
                in_degree[to_idx] += 1;
            }
        }

        // Kahn's algorithm, one layer per round; declaration order within a layer.
        let mut layers: Vec<Vec<Arc<dyn Stage>>> = Vec::new();
        let mut ready: Vec<usize> = (0..self.stages.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut placed = 0;
        while !ready.is_empty() {
            ready.sort_unstable();
            let mut next = Vec::new();
            for &i in &ready {
                for &succ in &successors[i] {
                    in_degree[succ] -= 1;
                    if in_degree[succ] == 0 {
                        next.push(succ);
                    }
                }
            }
            placed += ready.len();
            layers.push(ready.iter().map(|&i| Arc::clone(&self.stages[i])).collect());
            ready = next;
        }

        if placed != self.stages.len() {
            return Err(WorkflowError::InvalidGraph(
                "dependency cycle between stages".to_string(),
            ));
        }

        Ok(CompiledWorkflow { layers })
    }
}

/// A validated graph, ready to run.
#[derive(Clone)]
pub struct CompiledWorkflow {
    layers: Vec<Vec<Arc<dyn Stage>>>,
}

impl CompiledWorkflow {
    /// Stage names per layer, in execution order.
    #[must_use]
    pub fn layer_names(&self) -> Vec<Vec<&'static str>> {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(|s| s.name()).collect())
            .collect()
    }
}

impl std::fmt::Debug for CompiledWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledWorkflow")
            .field("layers", &self.layer_names())
            .finish()
    }
}

/// Runs a compiled workflow against one gateway and skill catalog.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    workflow: CompiledWorkflow,
    gateway: ModelGateway,
    skills: Arc<SkillCatalog>,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(workflow: CompiledWorkflow, gateway: ModelGateway, skills: Arc<SkillCatalog>) -> Self {
        Self {
            workflow,
            gateway,
            skills,
        }
    }

    /// The standard workflow with the HTTP gateway described by `config`.
    ///
    /// # Errors
    ///
    /// Fails before any stage runs when the gateway cannot be built (unknown
    /// provider, missing API key).
    pub fn from_config(config: &Config) -> Result<Self, EmbedgenError> {
        let gateway = ModelGateway::from_config(config)?;
        let workflow = WorkflowGraph::standard(config.graph.enable_diagram).compile()?;
        let skills = Arc::new(SkillCatalog::new(config.skills.dir.clone()));
        Ok(Self::new(workflow, gateway, skills))
    }

    #[must_use]
    pub fn workflow(&self) -> &CompiledWorkflow {
        &self.workflow
    }

    #[must_use]
    pub fn skills(&self) -> &SkillCatalog {
        &self.skills
    }

    /// Run every stage once and return the final state.
    ///
    /// # Errors
    ///
    /// `WorkflowError::StageFailed` naming the first failing stage, or
    /// `WorkflowError::ConflictingWrite` when two stages of one layer set
    /// the same field. Nothing is retried.
    pub async fn run(&self, initial: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        self.run_with(initial, |_, _| {}).await
    }

    /// Like [`run`](Self::run), calling `on_stage` with each stage's update
    /// just before it is merged.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_with<F>(
        &self,
        initial: WorkflowState,
        mut on_stage: F,
    ) -> Result<WorkflowState, WorkflowError>
    where
        F: FnMut(&str, &StateUpdate),
    {
        let mut state = initial;
        let ctx = StageContext {
            run_id: state.run_id(),
            gateway: self.gateway.clone(),
            skills: Arc::clone(&self.skills),
        };

        info!(run_id = %ctx.run_id, layers = self.workflow.layers.len(), "Starting workflow");
        let started = Instant::now();

        for layer in &self.workflow.layers {
            let snapshot = &state;
            let results = join_all(
                layer
                    .iter()
                    .map(|stage| execute_stage(stage.as_ref(), snapshot, &ctx)),
            )
            .await;

            let mut updates = Vec::with_capacity(layer.len());
            for (stage, result) in layer.iter().zip(results) {
                match result {
                    Ok(update) => updates.push((stage.name(), update)),
                    Err(source) => {
                        return Err(WorkflowError::StageFailed {
                            stage: stage.name().to_string(),
                            source,
                        });
                    }
                }
            }

            check_conflicts(&updates)?;
            for (name, update) in updates {
                on_stage(name, &update);
                state.apply(update);
            }
        }

        info!(
            run_id = %ctx.run_id,
            duration_ms = started.elapsed().as_millis(),
            "Workflow completed"
        );
        Ok(state)
    }
}

async fn execute_stage(
    stage: &dyn Stage,
    state: &WorkflowState,
    ctx: &StageContext,
) -> Result<StateUpdate, StageError> {
    let name = stage.name();
    let span = stage_span(&ctx.run_id, name);
    async {
        log_stage_start(&ctx.run_id, name);
        let started = Instant::now();
        let result = stage.run(state, ctx).await;
        let elapsed = started.elapsed().as_millis();
        match &result {
            Ok(_) => log_stage_complete(&ctx.run_id, name, elapsed),
            Err(e) => log_stage_error(&ctx.run_id, name, &e.to_string(), elapsed),
        }
        result
    }
    .instrument(span)
    .await
}

/// Two stages of one layer may not set the same overwrite-policy field.
fn check_conflicts(updates: &[(&'static str, StateUpdate)]) -> Result<(), WorkflowError> {
    let mut writers: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    for (stage, update) in updates {
        for field in update.scalar_fields() {
            writers.entry(field).or_default().push((*stage).to_string());
        }
    }

    match writers.into_iter().find(|(_, stages)| stages.len() > 1) {
        Some((field, stages)) => Err(WorkflowError::ConflictingWrite {
            field: field.to_string(),
            stages,
        }),
        None => Ok(()),
    }
}
