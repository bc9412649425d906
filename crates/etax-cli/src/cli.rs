//! CLI argument definitions for the e-Tax validator.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use etax_model::DocumentType;

#[derive(Parser)]
#[command(
    name = "etax",
    version,
    about = "Thai e-Tax document validator",
    long_about = "Validate ETDA e-Tax Invoice & e-Receipt v2.1 XML documents against\n\
                  the Schematron business rules of their document type."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Read rule bundles from this directory instead of the embedded set
    /// (overrides ETAX_RULES_DIR).
    #[arg(long = "rules-dir", value_name = "DIR", global = true)]
    pub rules_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate XML documents against one document type.
    Validate(ValidateArgs),

    /// List the supported document types.
    Types,

    /// Check that every rule bundle loads and compiles.
    Doctor(DoctorArgs),
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Document type, e.g. TAX_INVOICE or TaxInvoice.
    #[arg(long = "type", short = 't', value_name = "TYPE", value_parser = parse_document_type)]
    pub doc_type: DocumentType,

    /// XML documents to validate.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,

    /// Write the raw SVRL report of each document into this directory.
    #[arg(long = "svrl", value_name = "DIR")]
    pub svrl: Option<PathBuf>,

    /// Exit non-zero when any document has warnings.
    #[arg(long = "fail-on-warnings")]
    pub fail_on_warnings: bool,
}

#[derive(Parser)]
pub struct DoctorArgs {
    /// Output format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Table,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_document_type(value: &str) -> Result<DocumentType, String> {
    value.parse::<DocumentType>().map_err(|err| {
        let known: Vec<_> = DocumentType::all().iter().map(DocumentType::as_str).collect();
        format!("{err} (expected one of {})", known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn validate_accepts_registry_and_document_names() {
        for name in ["TAX_INVOICE", "TaxInvoice"] {
            let cli = Cli::try_parse_from(["etax", "validate", "--type", name, "a.xml"]).expect("parse");
            let Command::Validate(args) = cli.command else {
                panic!("expected validate");
            };
            assert_eq!(args.doc_type, DocumentType::TaxInvoice);
            assert_eq!(args.files, vec![PathBuf::from("a.xml")]);
        }
    }

    #[test]
    fn unknown_document_type_is_rejected() {
        let err = Cli::try_parse_from(["etax", "validate", "--type", "tax_invoice", "a.xml"])
            .err()
            .expect("rejected");
        assert!(err.to_string().contains("TAX_INVOICE"));
    }

    #[test]
    fn validate_requires_a_file() {
        assert!(Cli::try_parse_from(["etax", "validate", "--type", "RECEIPT"]).is_err());
    }
}
