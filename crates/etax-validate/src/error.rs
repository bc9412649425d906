//! Error taxonomy for validation runs.
//!
//! Errors mean "validation could not run". Rule violations are never errors;
//! they are findings inside a normally returned
//! [`ValidationResult`](etax_model::ValidationResult).

use std::path::PathBuf;

use etax_model::DocumentType;
use etax_schematron::{CompileError, XPathError, XmlError};
use thiserror::Error;

/// Caller supplied no document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("XML content cannot be null or empty")]
    EmptyContent,

    #[error("XML input stream cannot be null or empty")]
    EmptyStream,
}

/// Validation could not produce a result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    #[error("Failed to parse XML document for {document_type}: {source}")]
    Parse {
        document_type: DocumentType,
        #[source]
        source: XmlError,
    },

    #[error("Failed to read XML input stream for {document_type}: {source}")]
    Read {
        document_type: DocumentType,
        #[source]
        source: std::io::Error,
    },

    #[error("Schematron file not found for {document_type}: {path}")]
    BundleNotFound {
        document_type: DocumentType,
        path: PathBuf,
    },

    #[error("Failed to load Schematron {path} for {document_type}: {source}")]
    BundleLoad {
        document_type: DocumentType,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to compile Schematron {path} for {document_type}: {source}")]
    BundleCompile {
        document_type: DocumentType,
        path: PathBuf,
        #[source]
        source: CompileError,
    },

    #[error("Schematron execution failed for {document_type}: {source}")]
    Execution {
        document_type: DocumentType,
        #[source]
        source: XPathError,
    },
}

impl ValidationError {
    /// Document type being validated, when known.
    pub fn document_type(&self) -> Option<DocumentType> {
        match self {
            ValidationError::InvalidInput(_) => None,
            ValidationError::Parse { document_type, .. }
            | ValidationError::Read { document_type, .. }
            | ValidationError::BundleNotFound { document_type, .. }
            | ValidationError::BundleLoad { document_type, .. }
            | ValidationError::BundleCompile { document_type, .. }
            | ValidationError::Execution { document_type, .. } => Some(*document_type),
        }
    }

    /// True for rejected caller input, as opposed to resource or parse faults.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ValidationError::InvalidInput(_))
    }
}
