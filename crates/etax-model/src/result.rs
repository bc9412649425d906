//! Immutable outcome of one validation run.

use std::fmt;

use serde::Serialize;

use crate::finding::Finding;

/// Result of validating one document: errors (failed assertions) and
/// warnings (successful reports).
///
/// Instances are only created through the named constructors, which copy the
/// supplied findings. `is_valid()` always equals `errors().is_empty()`;
/// warnings never affect validity.
///
/// The accessors hand out shared slices, so a result cannot be mutated after
/// construction:
///
/// ```compile_fail
/// use etax_model::{ErrorLevel, Finding, ValidationResult};
///
/// let result = ValidationResult::success();
/// result.errors().push(Finding::new("X", "", "/", ErrorLevel::Error, ""));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
}

impl ValidationResult {
    fn new(errors: Vec<Finding>, warnings: Vec<Finding>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// No errors and no warnings.
    pub fn success() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Errors only.
    ///
    /// Validity is derived from the error list, so an empty list produces a
    /// valid result. Prefer [`ValidationResult::success`] for that case.
    pub fn invalid(errors: impl Into<Vec<Finding>>) -> Self {
        Self::new(errors.into(), Vec::new())
    }

    /// Errors and warnings.
    pub fn invalid_with_warnings(
        errors: impl Into<Vec<Finding>>,
        warnings: impl Into<Vec<Finding>>,
    ) -> Self {
        Self::new(errors.into(), warnings.into())
    }

    /// Warnings only; the result is valid.
    pub fn valid_with_warnings(warnings: impl Into<Vec<Finding>>) -> Self {
        Self::new(Vec::new(), warnings.into())
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Failed assertions, in report order.
    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    /// Successful reports, in report order.
    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Errors plus warnings.
    pub fn total_issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    /// All findings, errors first.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ValidationResult{{valid={}, errors={}, warnings={}}}",
            self.valid,
            self.errors.len(),
            self.warnings.len()
        )
    }
}
