//! Classification of stored threads
//!
//! Each detection spec is run over each stored submission: the thread is
//! rendered to a transcript, sent to the model with the spec's instruction
//! and response schema, and the validated verdict is recorded.

pub mod openai;
pub mod schema;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::store::{DetectionSpec, MetadataStore};
use crate::sync::{retry_on_rate_limit, RetryPolicy};
use crate::transcript;

pub use openai::OpenAiClient;
pub use schema::{FieldSpec, FieldType, ResponseSchema};

/// Structured-output language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier recorded with each verdict
    fn name(&self) -> &str;

    /// Ask the model to answer `input` following `instruction`, constrained
    /// to `schema`. Returns the parsed JSON answer.
    async fn structured(
        &self,
        instruction: &str,
        input: &str,
        schema: &ResponseSchema,
    ) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyReport {
    pub recorded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for ClassifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} recorded, {} skipped, {} failed",
            self.recorded, self.skipped, self.failed
        )
    }
}

/// Classify one submission against one spec and store the verdict
pub async fn classify_submission(
    store: &MetadataStore,
    model: &dyn LanguageModel,
    submission_id: i64,
    spec: &DetectionSpec,
) -> Result<()> {
    let thread = store
        .load_thread(submission_id)?
        .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    let text = transcript::render(&thread);

    let answer = model
        .structured(&spec.instruction, &text, &spec.schema)
        .await?;
    let verdict = spec.schema.validate(answer)?;

    store.record_detection(submission_id, spec.id, &verdict, model.name())
}

/// Run every detection spec over the stored submissions.
///
/// Pairs that already have a verdict are skipped unless `force` is set.
/// A failing pair is logged and counted; it never stops the batch. The pass
/// is recorded in `task_runs`.
pub async fn classify_all(
    store: &MetadataStore,
    model: &dyn LanguageModel,
    policy: RetryPolicy,
    subreddit: Option<&str>,
    force: bool,
) -> Result<ClassifyReport> {
    let run_id = store.start_run("classify")?;
    let result = classify_pairs(store, model, policy, subreddit, force).await;

    match &result {
        Ok(report) => {
            info!("classification finished: {}", report);
            store.finish_run(&run_id, Ok(report.to_string().as_str()))?;
        }
        Err(e) => {
            store.finish_run(&run_id, Err(e.to_string().as_str()))?;
        }
    }
    result
}

async fn classify_pairs(
    store: &MetadataStore,
    model: &dyn LanguageModel,
    policy: RetryPolicy,
    subreddit: Option<&str>,
    force: bool,
) -> Result<ClassifyReport> {
    let specs = store.list_detection_specs()?;
    let mut report = ClassifyReport::default();
    if specs.is_empty() {
        warn!("no detection specs configured, nothing to classify");
        return Ok(report);
    }

    let submissions = store.submission_ids(subreddit)?;
    info!(
        specs = specs.len(),
        submissions = submissions.len(),
        model = %model.name(),
        "starting classification"
    );

    for spec in &specs {
        for &submission_id in &submissions {
            if !force && store.has_detection(submission_id, spec.id)? {
                report.skipped += 1;
                continue;
            }

            let label = format!("classification {}/{}", submission_id, spec.id);
            let result = retry_on_rate_limit(policy, &label, move || {
                classify_submission(store, model, submission_id, spec)
            })
            .await;

            match result {
                Ok(()) => report.recorded += 1,
                Err(e) => {
                    warn!(submission = submission_id, spec = spec.id, "classification failed: {}", e);
                    report.failed += 1;
                }
            }
        }
    }

    Ok(report)
}
