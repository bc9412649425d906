//! Tests for etax-model types.

use etax_model::{DocumentType, ErrorLevel, Finding, ValidationResult};
use insta::assert_snapshot;
use proptest::prelude::*;

fn error(id: &str) -> Finding {
    Finding::new(id, "error message", "/doc", ErrorLevel::Error, "false()")
}

fn warning(id: &str) -> Finding {
    Finding::new(id, "warning message", "/doc", ErrorLevel::Warning, "true()")
}

#[test]
fn success_has_no_issues() {
    let result = ValidationResult::success();
    assert!(result.is_valid());
    assert!(result.errors().is_empty());
    assert!(result.warnings().is_empty());
    assert!(!result.has_errors());
    assert!(!result.has_warnings());
    assert_eq!(result.total_issue_count(), 0);
}

#[test]
fn invalid_with_errors_only() {
    let result = ValidationResult::invalid(vec![error("TIV-001")]);
    assert!(!result.is_valid());
    assert_eq!(result.errors().len(), 1);
    assert!(result.warnings().is_empty());
    assert!(result.has_errors());
}

#[test]
fn invalid_with_errors_and_warnings() {
    let result = ValidationResult::invalid_with_warnings(
        vec![error("TIV-001"), error("TIV-002")],
        vec![warning("TIV-100")],
    );
    assert!(!result.is_valid());
    assert_eq!(result.errors().len(), 2);
    assert_eq!(result.warnings().len(), 1);
    assert_eq!(result.total_issue_count(), 3);
}

#[test]
fn warnings_do_not_affect_validity() {
    let result = ValidationResult::valid_with_warnings(vec![warning("RCT-001")]);
    assert!(result.is_valid());
    assert!(result.has_warnings());
    assert!(!result.has_errors());
}

#[test]
fn invalid_with_empty_list_follows_error_list() {
    let result = ValidationResult::invalid(Vec::new());
    assert_eq!(result.is_valid(), result.errors().is_empty());
}

#[test]
fn constructors_copy_caller_lists() {
    let mut errors = vec![error("TIV-001")];
    let result = ValidationResult::invalid(errors.as_slice());
    errors.push(error("TIV-002"));
    assert_eq!(result.errors().len(), 1);

    let mut warnings = vec![warning("TIV-100")];
    let result = ValidationResult::valid_with_warnings(warnings.as_slice());
    warnings.clear();
    assert_eq!(result.warnings().len(), 1);
}

#[test]
fn equal_content_means_equal_results() {
    let a = ValidationResult::invalid(vec![error("TIV-001")]);
    let b = ValidationResult::invalid(vec![error("TIV-001")]);
    let c = ValidationResult::invalid(vec![error("TIV-002")]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(ValidationResult::success(), a);
}

#[test]
fn display_is_greppable() {
    assert_snapshot!(
        ValidationResult::success().to_string(),
        @"ValidationResult{valid=true, errors=0, warnings=0}"
    );
    let result = ValidationResult::invalid_with_warnings(
        vec![error("TIV-001"), error("TIV-002")],
        vec![warning("TIV-100")],
    );
    assert_snapshot!(
        result.to_string(),
        @"ValidationResult{valid=false, errors=2, warnings=1}"
    );
}

#[test]
fn findings_lists_errors_before_warnings() {
    let result =
        ValidationResult::invalid_with_warnings(vec![error("E-1")], vec![warning("W-1")]);
    let ids: Vec<_> = result.findings().map(Finding::rule_id).collect();
    assert_eq!(ids, vec!["E-1", "W-1"]);
}

#[test]
fn result_serializes_with_validity() {
    let result = ValidationResult::valid_with_warnings(vec![warning("INV-001")]);
    let json = serde_json::to_value(&result).expect("serialize result");
    assert_eq!(json["valid"], true);
    assert_eq!(json["warnings"][0]["rule_id"], "INV-001");
    assert_eq!(json["warnings"][0]["level"], "Warning");
}

#[test]
fn document_type_serializes_as_registry_name() {
    let json = serde_json::to_string(&DocumentType::DebitCreditNote).expect("serialize");
    assert_eq!(json, "\"DEBIT_CREDIT_NOTE\"");
}

fn arb_finding(level: ErrorLevel) -> impl Strategy<Value = Finding> {
    ("[A-Z]{2,3}-[0-9]{3}", ".{0,20}", "(/[a-z]{1,5}){1,3}", ".{0,10}").prop_map(
        move |(id, message, location, test)| Finding::new(id, message, location, level, test),
    )
}

proptest! {
    #[test]
    fn validity_tracks_errors_for_every_constructor(
        errors in proptest::collection::vec(arb_finding(ErrorLevel::Error), 0..6),
        warnings in proptest::collection::vec(arb_finding(ErrorLevel::Warning), 0..6),
    ) {
        let results = [
            ValidationResult::success(),
            ValidationResult::invalid(errors.clone()),
            ValidationResult::invalid_with_warnings(errors.clone(), warnings.clone()),
            ValidationResult::valid_with_warnings(warnings.clone()),
        ];
        for result in &results {
            prop_assert_eq!(result.is_valid(), result.errors().is_empty());
            prop_assert_eq!(
                result.total_issue_count(),
                result.errors().len() + result.warnings().len()
            );
            prop_assert_eq!(result.has_errors(), !result.errors().is_empty());
            prop_assert_eq!(result.has_warnings(), !result.warnings().is_empty());
        }
        prop_assert_eq!(results[2].errors(), errors.as_slice());
        prop_assert_eq!(results[2].warnings(), warnings.as_slice());
    }

    #[test]
    fn findings_differing_only_in_test_expression_are_equal(
        finding in arb_finding(ErrorLevel::Error),
        other_test in ".{0,10}",
    ) {
        let twin = Finding::new(
            finding.rule_id(),
            finding.message(),
            finding.location(),
            finding.level(),
            other_test,
        );
        prop_assert_eq!(&finding, &twin);
    }
}
