//! Core types for Thai e-Tax document validation.
//!
//! This crate provides:
//!
//! - **Document types** ([`DocumentType`]): the closed set of ETDA document kinds,
//!   each carrying the location of its rule bundle
//! - **Findings** ([`Finding`]): one reported rule outcome with its level
//! - **Validation results** ([`ValidationResult`]): the immutable aggregate
//!   returned by a validation run
//!
//! # Example
//!
//! ```
//! use etax_model::{DocumentType, ErrorLevel, Finding, ValidationResult};
//!
//! let warning = Finding::new(
//!     "TIV-BuyerTradeParty-002",
//!     "Buyer tax registration is recommended",
//!     "/rsm:TaxInvoice_CrossIndustryInvoice[1]",
//!     ErrorLevel::Warning,
//!     "not(ram:SpecifiedTaxRegistration)",
//! );
//! let result = ValidationResult::valid_with_warnings(vec![warning]);
//!
//! assert!(result.is_valid());
//! assert_eq!(result.total_issue_count(), 1);
//! assert_eq!(DocumentType::TaxInvoice.rule_prefix(), "TIV");
//! ```

pub mod document_type;
pub mod error;
pub mod finding;
pub mod result;

pub use document_type::DocumentType;
pub use error::UnknownDocumentType;
pub use finding::{ErrorLevel, Finding};
pub use result::ValidationResult;
