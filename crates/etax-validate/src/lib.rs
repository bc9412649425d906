//! Schematron validation of Thai e-Tax documents.
//!
//! - [`BundleLoader`]: resolves a [`DocumentType`] to a cached, compiled rule
//!   bundle, from the embedded set or a rules directory
//! - [`SchematronValidator`]: parses a document, executes its bundle, and
//!   maps the raw report into a [`ValidationResult`]
//! - [`mapper`]: the report-to-findings mapping, usable on any
//!   [`ReportEntry`](etax_schematron::ReportEntry) shape
//! - [`DoctorReport`]: bundle health summary for readiness checks
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use etax_model::DocumentType;
//! use etax_validate::{BundleLoader, DocumentValidator, SchematronValidator};
//!
//! let validator = SchematronValidator::new(Arc::new(BundleLoader::new()));
//! let result = validator
//!     .validate("<note/>", DocumentType::CancellationNote)
//!     .unwrap();
//! assert!(result.is_valid());
//! ```

pub mod doctor;
pub mod embedded;
pub mod error;
pub mod loader;
pub mod mapper;
pub mod paths;
pub mod validator;

pub use doctor::{BundleStatus, DoctorCounts, DoctorReport};
pub use error::{InputError, ValidationError};
pub use loader::{BundleLoader, RuleSource};
pub use paths::{RULES_ENV_VAR, rules_root_from_env};
pub use validator::{DocumentValidator, SchematronValidator};

pub use etax_model::{DocumentType, ErrorLevel, Finding, ValidationResult};
