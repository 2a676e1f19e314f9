//! The `compile` pipeline
//!
//! load → select → compress → estimate → (stop here for `--cost-estimate`)
//! → build request → send → write SKILL.md locally.

use crate::app::config::{CompileConfig, Config};
use crate::app::paths::Paths;
use crate::artifacts::{CompiledArtifactSet, CompressionSettings};
use crate::codegen::skill_writer::{CompiledSkill, SkillMetadata, SkillWriter};
use crate::synthesis::cost::{self, CostEstimate};
use crate::synthesis::model::ModelTier;
use crate::synthesis::request::build_request;
use crate::synthesis::transport::SkillTransport;
use crate::workflow::recording::RecordedTask;
use std::path::PathBuf;
use tracing::info;

/// How to run a compile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub tier: ModelTier,
    /// Stop after the estimate; nothing is transmitted
    pub cost_only: bool,
}

/// Artifacts ready to send, with their estimate
#[derive(Debug, Clone)]
pub struct PreparedCompile {
    pub task: RecordedTask,
    pub artifacts: CompiledArtifactSet,
    pub estimate: CostEstimate,
}

/// What a compile produced
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    /// `--cost-estimate`: selection and compression only
    Estimated(PreparedCompile),
    /// The model returned a document, already saved locally
    Compiled {
        skill: CompiledSkill,
        local_path: PathBuf,
        estimate: CostEstimate,
    },
}

/// Compiles recorded tasks into skills
#[derive(Debug, Clone)]
pub struct Compiler {
    paths: Paths,
    config: Config,
}

impl Compiler {
    pub fn new(paths: Paths, config: Config) -> Self {
        Self { paths, config }
    }

    pub fn compile_config(&self) -> &CompileConfig {
        &self.config.compile
    }

    fn compression(&self) -> CompressionSettings {
        CompressionSettings {
            max_dimension: self.config.compile.max_dimension,
            jpeg_quality: self.config.compile.jpeg_quality,
        }
    }

    /// Load, select, compress and price a task. Local work only.
    pub fn prepare(&self, task_name: &str, tier: ModelTier) -> crate::Result<PreparedCompile> {
        let task = RecordedTask::load(&self.paths, task_name)?;
        let artifacts = CompiledArtifactSet::build(
            &task.task_name,
            &task.screenshots,
            task.actions.clone(),
            self.config.compile.max_screenshots,
            &self.compression(),
        )?;
        let estimate = cost::estimate(&artifacts, tier)?;
        info!(
            task = %task.task_name,
            tier = %tier,
            images = artifacts.images.len(),
            cost = estimate.total_cost,
            "Compile prepared"
        );
        Ok(PreparedCompile { task, artifacts, estimate })
    }

    /// Send prepared artifacts and save the returned document
    pub async fn generate<T: SkillTransport>(
        &self,
        prepared: PreparedCompile,
        transport: &T,
    ) -> crate::Result<CompileOutcome> {
        let tier = prepared.estimate.tier;
        let model_id = self.config.compile.models.id_for(tier).to_string();
        // Size is checked before anything goes on the wire
        let request = build_request(
            &prepared.artifacts,
            &model_id,
            self.config.compile.max_output_tokens,
            self.config.compile.max_request_bytes,
        )?;
        let response = transport.send(&request).await?;

        let mut metadata = SkillMetadata::new(
            &prepared.task.task_name,
            &model_id,
            &prepared.estimate,
            prepared.artifacts.raw_screenshot_count,
            prepared.artifacts.actions.len(),
        );
        metadata.input_tokens = response.input_tokens;
        metadata.output_tokens = response.output_tokens;
        let skill = CompiledSkill::new(&response.text, metadata);

        let local_path = SkillWriter::new(prepared.task.layout.clone()).write_local(&skill)?;
        Ok(CompileOutcome::Compiled { skill, local_path, estimate: prepared.estimate })
    }

    /// Full pipeline. `connect` sees the prepared artifacts and is only
    /// called when something will be sent, so `cost_only` runs need no
    /// credential.
    pub async fn run<T, F>(
        &self,
        task_name: &str,
        options: CompileOptions,
        connect: F,
    ) -> crate::Result<CompileOutcome>
    where
        T: SkillTransport,
        F: FnOnce(&CompileConfig, &PreparedCompile) -> crate::Result<T>,
    {
        let this = self.clone();
        let name = task_name.to_string();
        let prepared = tokio::task::spawn_blocking(move || this.prepare(&name, options.tier))
            .await
            .map_err(|e| crate::Error::Capture(format!("compression task failed: {}", e)))??;

        if options.cost_only {
            return Ok(CompileOutcome::Estimated(prepared));
        }
        let transport = connect(&self.config.compile, &prepared)?;
        self.generate(prepared, &transport).await
    }
}
