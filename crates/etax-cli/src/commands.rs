use std::sync::Arc;

use anyhow::Result;
use etax_cli::report::{ValidationRun, validate_files};
use etax_validate::{BundleLoader, DoctorReport, SchematronValidator};
use tracing::info_span;

use crate::cli::{DoctorArgs, OutputFormatArg, ValidateArgs};
use crate::summary::{print_doctor, print_validation};

pub fn run_validate(args: &ValidateArgs, loader: Arc<BundleLoader>) -> Result<ValidationRun> {
    let validator = SchematronValidator::new(loader);
    let run = validate_files(&validator, args.doc_type, &args.files, args.svrl.as_deref());
    match args.format {
        OutputFormatArg::Table => print_validation(&run),
        OutputFormatArg::Json => println!("{}", run.to_json()?),
    }
    Ok(run)
}

pub fn run_doctor(args: &DoctorArgs, loader: &BundleLoader) -> Result<DoctorReport> {
    let _span = info_span!("doctor").entered();
    let report = DoctorReport::collect(loader);
    match args.format {
        OutputFormatArg::Table => print_doctor(&report),
        OutputFormatArg::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report)
}
