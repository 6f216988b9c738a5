//! `plan` and `run` subcommands
//!
//! Both read a migration configuration and a subtree document. `plan`
//! only reports what would change; `run` migrates an in-memory copy of the
//! document and hands back the result.

use anyhow::{Context, Result};
use cfgmig_core::{
    MemoryStore, MigrationConfig, MigrationPlan, MigrationSummary, MigrationTask, SubtreeDocument,
    SubtreeHandle, TaskError, TaskResult,
};
use serde_json::json;
use std::fmt::Write as _;
use std::path::Path;

/// Loaded configuration and input document
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Migration to perform
    pub config: MigrationConfig,
    /// Subtree to migrate
    pub document: SubtreeDocument,
}

impl Inputs {
    /// Load both files
    ///
    /// # Errors
    /// Fails if either file cannot be read, parsed or validated
    pub fn load(config: &Path, input: &Path) -> Result<Self> {
        let config = MigrationConfig::load(config)
            .with_context(|| format!("loading migration config {}", config.display()))?;
        let document = SubtreeDocument::load(input)
            .with_context(|| format!("loading subtree document {}", input.display()))?;
        Ok(Self { config, document })
    }

    fn handle(&self) -> SubtreeHandle {
        self.config.handle()
    }
}

/// Outcome of the `run` subcommand
#[derive(Debug)]
pub struct RunOutcome {
    /// Human or JSON report
    pub report: String,
    /// Subtree after the run; unchanged unless the task succeeded
    pub document: SubtreeDocument,
    /// Process exit code
    pub exit_code: i32,
}

/// Reconcile without submitting anything
///
/// # Errors
/// Fails if the document lists a group twice or the report cannot be rendered
pub fn plan(inputs: &Inputs, as_json: bool) -> Result<String> {
    let handle = inputs.handle();
    let task = MigrationTask::from_config(&inputs.config);
    let groups = inputs
        .document
        .groups(handle.group_key(), handle.element_key());

    let plan = task
        .plan(&handle, groups, |group, element| {
            handle.element_address(group, element)
        })
        .context("reconciling subtree")?;

    if as_json {
        render_plan_json(&inputs.config, &plan)
    } else {
        Ok(render_plan_text(&inputs.config, &plan))
    }
}

/// Migrate the input document in memory
///
/// Store failures become exit code 1 with the store's error in the report.
///
/// # Errors
/// Fails on anything other than a store failure
pub async fn run(inputs: &Inputs, as_json: bool) -> Result<RunOutcome> {
    let handle = inputs.handle();
    let store = MemoryStore::new();
    store.import(&handle, &inputs.document);

    let mut task = MigrationTask::from_config(&inputs.config);
    let (report, exit_code) = match task.run(&store, &handle).await {
        Ok(result) => (render_result(task.name(), &result, as_json)?, 0),
        Err(TaskError::Store(error)) => {
            tracing::error!(%error, "migration failed");
            let report = if as_json {
                serde_json::to_string_pretty(&json!({
                    "task": task.name(),
                    "status": task.state(),
                    "error": error.to_string(),
                }))?
            } else {
                format!("{}: {}\n  error: {error}\n", task.name(), task.state())
            };
            (report, 1)
        }
        Err(other) => return Err(other).context("running migration task"),
    };

    let document = store.export(&handle).context("exporting migrated subtree")?;
    Ok(RunOutcome {
        report,
        document,
        exit_code,
    })
}

/// Write a document to `output`, or to stdout as YAML
///
/// # Errors
/// Fails if the document cannot be rendered or written
pub fn write_document(document: &SubtreeDocument, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => document
            .save(path)
            .with_context(|| format!("writing {}", path.display())),
        None => {
            print!("{}", document.to_yaml()?);
            Ok(())
        }
    }
}

fn join(names: &std::collections::BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn render_summary(out: &mut String, group_key: &str, summary: &MigrationSummary) {
    for change in &summary.changed_groups {
        let _ = writeln!(
            out,
            "  {group_key} {}: added [{}] removed [{}]",
            change.group,
            join(&change.diff.added),
            join(&change.diff.removed)
        );
    }
}

fn render_plan_text(config: &MigrationConfig, plan: &MigrationPlan) -> String {
    let summary = plan.summary();
    let mut out = String::new();
    let _ = writeln!(out, "{} on {}", config.task_name, config.subtree);
    let _ = writeln!(
        out,
        "  {} {} scanned, {} changed",
        summary.groups_scanned,
        config.group_key,
        summary.changed_groups.len()
    );
    render_summary(&mut out, &config.group_key, &summary);

    if plan.is_noop() {
        let _ = writeln!(out, "no {} removed or added", config.report_label);
    } else {
        let _ = writeln!(out, "batch ({} steps):", plan.batch().len());
        for step in plan.batch() {
            let _ = writeln!(out, "  {step}");
        }
    }
    out
}

fn render_plan_json(config: &MigrationConfig, plan: &MigrationPlan) -> Result<String> {
    let value = json!({
        "task": config.task_name,
        "subtree": config.subtree,
        "summary": plan.summary(),
        "batch": plan.batch(),
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn render_result(task: &str, result: &TaskResult, as_json: bool) -> Result<String> {
    if as_json {
        return Ok(serde_json::to_string_pretty(&json!({
            "task": task,
            "result": result,
        }))?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "{task}: {}", result.status());
    for (key, value) in result.attributes() {
        let _ = writeln!(out, "  {key}: {value}");
    }
    Ok(out)
}
