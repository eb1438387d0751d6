//! JobPipeline - takes one pending topic from the queue to a finished reel.
//!
//! Results are written back as soon as each stage produces them, so a failure
//! late in the run still leaves the script and keyword in the sheet.

use std::fmt;
use std::path::PathBuf;

use crate::compose::{MediaToolkit, VideoComposer};
use crate::config::Config;
use crate::footage::{FootageAsset, FootageLocator, PexelsClient};
use crate::gemini::{GeminiClient, ModelResolver, ScriptGenerator};
use crate::narration::NarrationSynthesizer;
use crate::queue::{Column, Job, JobQueue, QueueError, QueueLookup};

/// Stage of the pipeline that can fail a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Script,
    Compose,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Script => write!(f, "script generation"),
            Stage::Compose => write!(f, "composition"),
        }
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    JobFetched,
    ScriptReady,
    FootageReady,
    Composed,
    Recorded,
    Failed(Stage),
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The queue had no pending row.
    NothingToDo,
    Completed {
        row: u32,
        output: PathBuf,
        model: String,
        keyword: String,
        footage: FootageAsset,
    },
    /// A stage failed and its failure marker was written.
    Failed {
        row: u32,
        stage: Stage,
        error: String,
    },
}

/// File name of the reel rendered for `row`.
pub fn output_file_name(row: u32) -> String {
    format!("reel_row{}.mp4", row)
}

/// Processes exactly one job per `run`.
pub struct JobPipeline<Q, S, M> {
    config: Config,
    queue: Q,
    gemini: GeminiClient,
    pexels: PexelsClient,
    composer: VideoComposer<S, M>,
    state: PipelineState,
}

impl<Q, S, M> JobPipeline<Q, S, M>
where
    Q: JobQueue,
    S: NarrationSynthesizer,
    M: MediaToolkit,
{
    pub fn new(
        config: Config,
        queue: Q,
        gemini: GeminiClient,
        pexels: PexelsClient,
        composer: VideoComposer<S, M>,
    ) -> Self {
        Self {
            config,
            queue,
            gemini,
            pexels,
            composer,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Take the next pending row through every stage.
    ///
    /// Stage failures are recorded in the row's status cell and reported as
    /// `RunOutcome::Failed`. Only queue errors are returned as `Err`.
    pub async fn run(&mut self) -> Result<RunOutcome, QueueError> {
        self.state = PipelineState::Idle;

        let job = match self.queue.find_pending().await {
            QueueLookup::JobFound(job) => job,
            QueueLookup::NoJobPending => {
                log::info!("No pending rows, nothing to do");
                return Ok(RunOutcome::NothingToDo);
            }
            QueueLookup::QueryFailed(e) => return Err(e),
        };
        self.state = PipelineState::JobFetched;
        log::info!("Processing row {}: {}", job.row, job.topic);

        let gemini_config = &self.config.gemini;
        let choice = ModelResolver::new(
            &self.gemini,
            &gemini_config.preferred_marker,
            &gemini_config.fallback_model,
        )
        .resolve()
        .await;

        let generator = ScriptGenerator::new(&self.gemini, &self.config.script, gemini_config);
        let result = generator.generate(&job.topic, choice.identifier()).await;
        let generated = match result {
            Ok(generated) => generated,
            Err(e) => return self.fail(&job, Stage::Script, e.to_string()).await,
        };
        self.queue
            .write_cell(job.row, Column::Script, &generated.script)
            .await?;
        self.queue
            .write_cell(job.row, Column::Keyword, &generated.keyword)
            .await?;
        self.state = PipelineState::ScriptReady;

        let footage = FootageLocator::new(&self.pexels, &self.config.pexels)
            .locate(&generated.keyword)
            .await;
        self.queue
            .write_cell(job.row, Column::FootageUrl, &footage.url)
            .await?;
        self.state = PipelineState::FootageReady;

        let result = self
            .composer
            .compose(&footage.url, &generated.script, &output_file_name(job.row))
            .await;
        let rendered = match result {
            Ok(rendered) => rendered,
            Err(e) => return self.fail(&job, Stage::Compose, e.to_string()).await,
        };
        self.state = PipelineState::Composed;

        let output = rendered.path.display().to_string();
        self.queue
            .write_cell(job.row, Column::OutputPath, &output)
            .await?;
        self.queue
            .write_cell(job.row, Column::Status, &self.config.queue.status.completed)
            .await?;
        self.state = PipelineState::Recorded;
        log::info!(
            "Row {} completed: {} ({:.1}s, {} captions)",
            job.row,
            output,
            rendered.duration.as_secs_f64(),
            rendered.cue_count
        );

        Ok(RunOutcome::Completed {
            row: job.row,
            output: rendered.path,
            model: choice.identifier().to_string(),
            keyword: generated.keyword,
            footage,
        })
    }

    async fn fail(&mut self, job: &Job, stage: Stage, error: String) -> Result<RunOutcome, QueueError> {
        log::error!("Row {} failed during {}: {}", job.row, stage, error);
        let markers = &self.config.queue.status;
        let marker = match stage {
            Stage::Script => &markers.script_failed,
            Stage::Compose => &markers.compose_failed,
        };
        self.queue.write_cell(job.row, Column::Status, marker).await?;
        self.state = PipelineState::Failed(stage);

        Ok(RunOutcome::Failed {
            row: job.row,
            stage,
            error,
        })
    }
}
