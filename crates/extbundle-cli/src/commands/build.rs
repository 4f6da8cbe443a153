//! `extbundle build`: one-shot extension build.

use super::Project;
use extbundle_core::build::{BuildReport, DirPipeline};
use extbundle_core::{Error, ExtensionPlugin, Vendor};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Schema version of the `--json` output.
pub const BUILD_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct BuildAction {
    pub cwd: PathBuf,
    pub vendor: Option<Vendor>,
    pub config: Option<PathBuf>,
    pub skip_validation: bool,
}

#[derive(Serialize)]
struct BuildResultJson {
    schema_version: u32,
    ok: bool,
    vendor: Vendor,
    src: String,
    dist: String,
    emitted: Vec<String>,
    removed: Vec<String>,
    unchanged: usize,
    duration_ms: u64,
    notes: Vec<String>,
}

#[derive(Serialize)]
struct BuildErrorJson {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<String>,
}

#[derive(Serialize)]
struct BuildErrorResult {
    schema_version: u32,
    ok: bool,
    error: BuildErrorJson,
    notes: Vec<String>,
}

pub fn run(action: BuildAction, json: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;

    match runtime.block_on(build(&action)) {
        Ok((project, report)) => {
            let mut notes = Vec::new();
            if project.config.skip_manifest_validation {
                notes.push("manifest validation skipped".to_string());
            }
            if let Some(file) = &project.config_file {
                notes.push(format!("config: {}", project.display(file)));
            }

            if json {
                let result = BuildResultJson {
                    schema_version: BUILD_SCHEMA_VERSION,
                    ok: true,
                    vendor: project.config.vendor,
                    src: project.src_dir().display().to_string(),
                    dist: project.dist_dir().display().to_string(),
                    emitted: report.emitted,
                    removed: report.removed,
                    unchanged: report.unchanged,
                    duration_ms: report.duration_ms,
                    notes,
                };
                println!("{}", serde_json::to_string(&result).into_diagnostic()?);
            } else {
                print_human_output(&project, &report, &notes);
            }
            Ok(())
        }
        Err(e) if json => {
            let violations = match &e {
                Error::ManifestValidation { violations, .. } => {
                    violations.iter().map(ToString::to_string).collect()
                }
                _ => Vec::new(),
            };
            let result = BuildErrorResult {
                schema_version: BUILD_SCHEMA_VERSION,
                ok: false,
                error: BuildErrorJson {
                    code: e.code(),
                    message: e.to_string(),
                    violations,
                },
                notes: Vec::new(),
            };
            println!("{}", serde_json::to_string(&result).into_diagnostic()?);
            std::process::exit(1);
        }
        Err(e) => Err(e).into_diagnostic(),
    }
}

async fn build(action: &BuildAction) -> extbundle_core::Result<(Project, BuildReport)> {
    let mut project = Project::load(&action.cwd, action.config.as_deref(), action.vendor)?;
    if action.skip_validation {
        project.config.skip_manifest_validation = true;
    }

    let mut plugin = ExtensionPlugin::new(&project.root, project.config.clone());
    let mut pipeline = DirPipeline::new(project.src_dir(), project.dist_dir());
    let report = pipeline.run(&mut plugin, None).await?;
    Ok((project, report))
}

fn print_human_output(project: &Project, report: &BuildReport, notes: &[String]) {
    println!(
        "  Built {} extension in {}ms",
        project.config.vendor, report.duration_ms
    );
    println!(
        "  {} written, {} unchanged, {} removed",
        report.emitted.len(),
        report.unchanged,
        report.removed.len()
    );
    println!("  Output: {}", project.display(&project.dist_dir()));
    for note in notes {
        println!("  note: {note}");
    }
}
