//! Per-file validation runs and their JSON report.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use etax_model::{DocumentType, ValidationResult};
use etax_validate::SchematronValidator;
use serde::Serialize;
use tracing::{info, info_span, warn};

const REPORT_SCHEMA: &str = "etax-cli.validation-report";
const REPORT_SCHEMA_VERSION: u32 = 1;

/// Outcome of validating a batch of files against one document type.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRun {
    pub schema: &'static str,
    pub schema_version: u32,
    pub validated_at: String,
    pub document_type: DocumentType,
    pub files: Vec<FileOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Validation ran; the result may still carry errors.
    Validated {
        result: ValidationResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        svrl: Option<PathBuf>,
    },
    /// Validation could not run.
    Failed { error: String },
}

impl FileOutcome {
    pub fn result(&self) -> Option<&ValidationResult> {
        match &self.status {
            FileStatus::Validated { result, .. } => Some(result),
            FileStatus::Failed { .. } => None,
        }
    }
}

impl ValidationRun {
    /// True when every file validated, none has errors and, if
    /// `fail_on_warnings` is set, none has warnings.
    pub fn passed(&self, fail_on_warnings: bool) -> bool {
        self.files.iter().all(|file| match file.result() {
            Some(result) => result.is_valid() && !(fail_on_warnings && result.has_warnings()),
            None => false,
        })
    }

    pub fn error_count(&self) -> usize {
        self.results().map(|result| result.errors().len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.results().map(|result| result.warnings().len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|file| file.result().is_none()).count()
    }

    fn results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.files.iter().filter_map(FileOutcome::result)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize validation report")
    }
}

/// Validate each file in turn. Files that cannot be validated are recorded
/// as failed; the batch always completes.
///
/// When `svrl_dir` is set, the raw report of each validated file is written
/// there as `<file stem>.svrl.xml`.
pub fn validate_files(
    validator: &SchematronValidator,
    doc_type: DocumentType,
    files: &[PathBuf],
    svrl_dir: Option<&Path>,
) -> ValidationRun {
    let _span = info_span!("validate_files", document_type = %doc_type, files = files.len()).entered();
    let mut svrl_targets = HashSet::new();
    let files = files
        .iter()
        .map(|path| {
            let svrl = svrl_dir.map(|dir| (dir, &mut svrl_targets));
            let status = match validate_file(validator, doc_type, path, svrl) {
                Ok((result, svrl)) => {
                    info!(
                        path = %path.display(),
                        valid = result.is_valid(),
                        errors = result.errors().len(),
                        warnings = result.warnings().len(),
                        "file validated"
                    );
                    FileStatus::Validated { result, svrl }
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %format!("{error:#}"), "file not validated");
                    FileStatus::Failed {
                        error: format!("{error:#}"),
                    }
                }
            };
            FileOutcome {
                path: path.clone(),
                status,
            }
        })
        .collect();

    ValidationRun {
        schema: REPORT_SCHEMA,
        schema_version: REPORT_SCHEMA_VERSION,
        validated_at: Utc::now().to_rfc3339(),
        document_type: doc_type,
        files,
    }
}

fn validate_file(
    validator: &SchematronValidator,
    doc_type: DocumentType,
    path: &Path,
    svrl: Option<(&Path, &mut HashSet<PathBuf>)>,
) -> Result<(ValidationResult, Option<PathBuf>)> {
    let file = std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = std::io::BufReader::new(file);
    let (result, report) = validator
        .validate_reader_with_report(&mut reader, doc_type)
        .with_context(|| format!("validate {}", path.display()))?;

    let svrl = match svrl {
        Some((dir, taken)) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create SVRL directory {}", dir.display()))?;
            let target = svrl_target(dir, path, taken);
            std::fs::write(&target, report.to_xml())
                .with_context(|| format!("write SVRL report {}", target.display()))?;
            Some(target)
        }
        None => None,
    };
    Ok((result, svrl))
}

/// `<stem>.svrl.xml` in `dir`, numbered `<stem>-2.svrl.xml` and up when an
/// earlier file of the batch already took the name.
fn svrl_target(dir: &Path, input: &Path, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "document".into(), |stem| stem.to_string_lossy());
    let mut target = dir.join(format!("{stem}.svrl.xml"));
    let mut suffix = 2usize;
    while !taken.insert(target.clone()) {
        target = dir.join(format!("{stem}-{suffix}.svrl.xml"));
        suffix += 1;
    }
    target
}
