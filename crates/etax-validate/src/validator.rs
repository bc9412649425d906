//! Validation entry points.

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use etax_model::{DocumentType, ValidationResult};
use etax_schematron::{Document, SvrlReport, XmlError};
use tracing::{debug, error, info_span};

use crate::error::{InputError, ValidationError};
use crate::loader::BundleLoader;
use crate::mapper;

/// Validates e-Tax documents against the rule bundle of their declared type.
///
/// Rule violations are returned as findings inside a [`ValidationResult`];
/// an `Err` means validation could not run at all.
pub trait DocumentValidator {
    /// Validate XML text.
    ///
    /// # Errors
    ///
    /// Empty or blank `xml`, a document that is not well-formed, or a rule
    /// bundle that cannot be resolved.
    fn validate(&self, xml: &str, doc_type: DocumentType) -> Result<ValidationResult, ValidationError>;

    /// Validate XML read to the end from `input`.
    ///
    /// # Errors
    ///
    /// As [`DocumentValidator::validate`], plus a stream that yields no bytes
    /// or fails to read.
    fn validate_reader(
        &self,
        input: &mut dyn Read,
        doc_type: DocumentType,
    ) -> Result<ValidationResult, ValidationError>;

    /// Whether the rule bundle for `doc_type` can be loaded. Never fails.
    fn is_bundle_healthy(&self, doc_type: DocumentType) -> bool;
}

/// [`DocumentValidator`] backed by the Schematron engine.
#[derive(Debug, Clone)]
pub struct SchematronValidator {
    loader: Arc<BundleLoader>,
}

impl SchematronValidator {
    pub fn new(loader: Arc<BundleLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &BundleLoader {
        &self.loader
    }

    /// Validate and also return the raw execution report.
    ///
    /// # Errors
    ///
    /// See [`DocumentValidator::validate`].
    pub fn validate_with_report(
        &self,
        xml: &str,
        doc_type: DocumentType,
    ) -> Result<(ValidationResult, SvrlReport), ValidationError> {
        if xml.trim().is_empty() {
            return Err(InputError::EmptyContent.into());
        }
        let _span = info_span!("validate", document_type = %doc_type, bytes = xml.len()).entered();
        let start = Instant::now();

        let bundle = self.loader.resolve(doc_type)?;
        let document = Document::parse(xml).map_err(|source| parse_error(doc_type, source))?;
        let report = bundle.execute(&document).map_err(|source| {
            error!(document_type = %doc_type, error = %source, "rule execution failed");
            ValidationError::Execution {
                document_type: doc_type,
                source,
            }
        })?;
        let result = mapper::map_report(Some(&report), doc_type);

        debug!(
            document_type = %doc_type,
            valid = result.is_valid(),
            errors = result.errors().len(),
            warnings = result.warnings().len(),
            elapsed_ms = start.elapsed().as_millis(),
            "validation complete"
        );
        Ok((result, report))
    }

    /// Stream form of [`SchematronValidator::validate_with_report`].
    ///
    /// # Errors
    ///
    /// See [`DocumentValidator::validate_reader`].
    pub fn validate_reader_with_report(
        &self,
        input: &mut dyn Read,
        doc_type: DocumentType,
    ) -> Result<(ValidationResult, SvrlReport), ValidationError> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes).map_err(|source| {
            error!(document_type = %doc_type, error = %source, "failed to read XML input");
            ValidationError::Read {
                document_type: doc_type,
                source,
            }
        })?;
        if bytes.is_empty() {
            return Err(InputError::EmptyStream.into());
        }
        self.loader.resolve(doc_type)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|source| parse_error(doc_type, XmlError::Utf8(source)))?;
        self.validate_with_report(text, doc_type)
    }
}

impl Default for SchematronValidator {
    fn default() -> Self {
        Self::new(Arc::new(BundleLoader::new()))
    }
}

impl DocumentValidator for SchematronValidator {
    fn validate(&self, xml: &str, doc_type: DocumentType) -> Result<ValidationResult, ValidationError> {
        self.validate_with_report(xml, doc_type)
            .map(|(result, _)| result)
    }

    fn validate_reader(
        &self,
        input: &mut dyn Read,
        doc_type: DocumentType,
    ) -> Result<ValidationResult, ValidationError> {
        self.validate_reader_with_report(input, doc_type)
            .map(|(result, _)| result)
    }

    fn is_bundle_healthy(&self, doc_type: DocumentType) -> bool {
        self.loader.is_bundle_healthy(doc_type)
    }
}

fn parse_error(doc_type: DocumentType, source: XmlError) -> ValidationError {
    error!(document_type = %doc_type, error = %source, "failed to parse XML document");
    ValidationError::Parse {
        document_type: doc_type,
        source,
    }
}
