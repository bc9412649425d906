//! Raw report to [`ValidationResult`] mapping.
//!
//! Failed assertions become [`ErrorLevel::Error`] findings and successful
//! reports become [`ErrorLevel::Warning`] findings. Every other entry kind
//! is skipped. An entry whose fields cannot be read yields one fallback
//! finding instead of aborting the batch.

use etax_model::{DocumentType, ErrorLevel, Finding, ValidationResult};
use etax_schematron::{EntryKind, ExtractError, ReportEntry, SvrlReport};
use tracing::{debug, trace, warn};

/// Rule id of a fallback finding.
pub const UNKNOWN_RULE_ID: &str = "UNKNOWN";

const ERROR_FALLBACK_MESSAGE: &str = "Failed to extract error details";
const WARNING_FALLBACK_MESSAGE: &str = "Failed to extract warning details";

/// Map an execution report. `None` maps to [`ValidationResult::success`].
pub fn map_report(report: Option<&SvrlReport>, doc_type: DocumentType) -> ValidationResult {
    match report {
        Some(report) => map_entries(report.entries(), doc_type),
        None => {
            debug!(document_type = %doc_type, "no report produced");
            ValidationResult::success()
        }
    }
}

/// Map raw report entries of any shape, preserving their order.
pub fn map_entries<E: ReportEntry>(entries: &[E], doc_type: DocumentType) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for entry in entries {
        let (level, bucket) = match entry.kind() {
            EntryKind::FailedAssert => (ErrorLevel::Error, &mut errors),
            EntryKind::SuccessfulReport => (ErrorLevel::Warning, &mut warnings),
            kind => {
                trace!(?kind, "skipping report entry");
                continue;
            }
        };
        bucket.push(extract_or_fallback(entry, level));
    }

    debug!(
        document_type = %doc_type,
        errors = errors.len(),
        warnings = warnings.len(),
        "report mapped"
    );

    match (errors.is_empty(), warnings.is_empty()) {
        (true, true) => ValidationResult::success(),
        (true, false) => ValidationResult::valid_with_warnings(warnings),
        (false, true) => ValidationResult::invalid(errors),
        (false, false) => ValidationResult::invalid_with_warnings(errors, warnings),
    }
}

/// Read one finding from `entry`.
///
/// A rule without an id yields an empty rule id. An absent or unreadable
/// text payload yields an empty message.
///
/// # Errors
///
/// Fails when the id, location or test cannot be read.
pub fn extract_finding<E: ReportEntry + ?Sized>(
    entry: &E,
    level: ErrorLevel,
) -> Result<Finding, ExtractError> {
    let rule_id = entry.id()?.unwrap_or_default();
    let location = entry.location()?;
    let test = entry.test()?;
    let message = match entry.text() {
        Ok(payload) => payload.into_text(),
        Err(err) => {
            trace!(rule_id, error = %err, "report entry has no message");
            String::new()
        }
    };
    Ok(Finding::new(rule_id, message, location, level, test))
}

fn extract_or_fallback<E: ReportEntry + ?Sized>(entry: &E, level: ErrorLevel) -> Finding {
    match extract_finding(entry, level) {
        Ok(finding) => finding,
        Err(err) => {
            warn!(level = %level, error = %err, "could not extract finding from report entry");
            fallback_finding(level)
        }
    }
}

fn fallback_finding(level: ErrorLevel) -> Finding {
    let message = match level {
        ErrorLevel::Error => ERROR_FALLBACK_MESSAGE,
        ErrorLevel::Warning => WARNING_FALLBACK_MESSAGE,
    };
    Finding::new(UNKNOWN_RULE_ID, message, "", level, "")
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::fmt;

    use etax_schematron::TextPayload;
    use etax_schematron::svrl::{Outcome, SvrlEntry, SvrlText};
    use proptest::prelude::*;

    use super::*;

    /// Entry whose every field can be switched off.
    #[derive(Debug, Clone)]
    struct Raw {
        kind: EntryKind,
        id: Option<Option<&'static str>>,
        location: Option<&'static str>,
        test: Option<&'static str>,
        text: Option<&'static str>,
        opaque: bool,
        shout: Shout,
    }

    #[derive(Debug, Clone)]
    struct Shout(&'static str);

    impl fmt::Display for Shout {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0.to_uppercase())
        }
    }

    impl ReportEntry for Raw {
        fn kind(&self) -> EntryKind {
            self.kind
        }

        fn id(&self) -> Result<Option<&str>, ExtractError> {
            self.id.ok_or(ExtractError::missing("id"))
        }

        fn location(&self) -> Result<&str, ExtractError> {
            self.location.ok_or(ExtractError::missing("location"))
        }

        fn test(&self) -> Result<&str, ExtractError> {
            self.test.ok_or(ExtractError::missing("test"))
        }

        fn text(&self) -> Result<TextPayload<'_>, ExtractError> {
            let text = self.text.ok_or(ExtractError::missing("text"))?;
            if self.opaque {
                Ok(TextPayload::Opaque(&self.shout))
            } else {
                Ok(TextPayload::Value(Cow::Borrowed(text)))
            }
        }
    }

    fn raw(kind: EntryKind, id: &'static str) -> Raw {
        Raw {
            kind,
            id: Some(Some(id)),
            location: Some("/rsm:Doc[1]"),
            test: Some("exists(x)"),
            text: Some("  Something   is\n wrong "),
            opaque: false,
            shout: Shout(""),
        }
    }

    #[test]
    fn asserts_become_errors_and_reports_become_warnings() {
        let entries = vec![
            raw(EntryKind::ActivePattern, "p"),
            raw(EntryKind::FiredRule, "r"),
            raw(EntryKind::FailedAssert, "TIV-001"),
            raw(EntryKind::SuccessfulReport, "TIV-002"),
            raw(EntryKind::Other, "o"),
        ];
        let result = map_entries(&entries, DocumentType::TaxInvoice);
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.warnings().len(), 1);
        assert_eq!(result.errors()[0].rule_id(), "TIV-001");
        assert_eq!(result.errors()[0].message(), "  Something   is\n wrong ");
        assert_eq!(result.errors()[0].test_expression(), "exists(x)");
        assert_eq!(result.warnings()[0].level(), ErrorLevel::Warning);
    }

    #[test]
    fn warnings_alone_keep_the_result_valid() {
        let entries = vec![raw(EntryKind::SuccessfulReport, "RCT-001")];
        let result = map_entries(&entries, DocumentType::Receipt);
        assert!(result.is_valid());
        assert!(result.has_warnings());
    }

    #[test]
    fn malformed_entry_degrades_to_fallback_without_losing_others() {
        let mut broken = raw(EntryKind::FailedAssert, "x");
        broken.location = None;
        let mut broken_report = raw(EntryKind::SuccessfulReport, "y");
        broken_report.id = None;
        let entries = vec![
            raw(EntryKind::FailedAssert, "TIV-001"),
            broken,
            raw(EntryKind::FailedAssert, "TIV-003"),
            broken_report,
        ];
        let result = map_entries(&entries, DocumentType::TaxInvoice);

        let ids: Vec<_> = result.errors().iter().map(Finding::rule_id).collect();
        assert_eq!(ids, vec!["TIV-001", UNKNOWN_RULE_ID, "TIV-003"]);
        assert_eq!(result.errors()[1].message(), ERROR_FALLBACK_MESSAGE);
        assert_eq!(result.errors()[1].location(), "");
        assert_eq!(result.warnings()[0].rule_id(), UNKNOWN_RULE_ID);
        assert_eq!(result.warnings()[0].message(), WARNING_FALLBACK_MESSAGE);
        assert_eq!(result.warnings()[0].level(), ErrorLevel::Warning);
    }

    #[test]
    fn missing_id_or_text_is_not_a_failure() {
        let mut entry = raw(EntryKind::FailedAssert, "");
        entry.id = Some(None);
        entry.text = None;
        let finding = extract_finding(&entry, ErrorLevel::Error).expect("finding");
        assert_eq!(finding.rule_id(), "");
        assert_eq!(finding.message(), "");
        assert_eq!(finding.location(), "/rsm:Doc[1]");
    }

    #[test]
    fn opaque_payload_is_rendered_through_display() {
        let mut entry = raw(EntryKind::FailedAssert, "INV-009");
        entry.opaque = true;
        entry.shout = Shout("total mismatch");
        let finding = extract_finding(&entry, ErrorLevel::Error).expect("finding");
        assert_eq!(finding.message(), "TOTAL MISMATCH");
    }

    #[test]
    fn absent_report_maps_to_success() {
        let result = map_report(None, DocumentType::Invoice);
        assert_eq!(result, ValidationResult::success());
        let empty = SvrlReport::new();
        assert_eq!(map_report(Some(&empty), DocumentType::Invoice), ValidationResult::success());
    }

    #[test]
    fn svrl_entries_map_through_the_same_path() {
        let report: SvrlReport = vec![
            SvrlEntry::FailedAssert(Outcome {
                id: Some("DCN-001".into()),
                location: Some("/a[1]".into()),
                test: Some("false()".into()),
                text: SvrlText::Plain("Always".into()),
                ..Outcome::default()
            }),
            SvrlEntry::FailedAssert(Outcome::default()),
        ]
        .into_iter()
        .collect();
        let result = map_report(Some(&report), DocumentType::DebitCreditNote);
        assert_eq!(result.errors().len(), 2);
        assert_eq!(result.errors()[0].rule_id(), "DCN-001");
        assert_eq!(result.errors()[1].rule_id(), "");
        assert_eq!(result.errors()[1].message(), "");
    }

    #[test]
    fn svrl_outcome_without_location_keeps_rule_and_message() {
        let report: SvrlReport = vec![SvrlEntry::FailedAssert(Outcome {
            id: Some("TIV-Settlement-003".into()),
            test: Some("x = y".into()),
            text: SvrlText::Plain("Grand total mismatch".into()),
            ..Outcome::default()
        })]
        .into_iter()
        .collect();
        let result = map_report(Some(&report), DocumentType::TaxInvoice);

        let finding = &result.errors()[0];
        assert_eq!(finding.rule_id(), "TIV-Settlement-003");
        assert_eq!(finding.message(), "Grand total mismatch");
        assert_eq!(finding.location(), "");
        assert_eq!(finding.test_expression(), "x = y");
        assert_eq!(finding.level(), ErrorLevel::Error);
    }

    fn arb_kind() -> impl Strategy<Value = EntryKind> {
        prop_oneof![
            Just(EntryKind::ActivePattern),
            Just(EntryKind::FiredRule),
            Just(EntryKind::FailedAssert),
            Just(EntryKind::SuccessfulReport),
            Just(EntryKind::Other),
        ]
    }

    fn arb_entry() -> impl Strategy<Value = Raw> {
        (arb_kind(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(kind, has_id, has_location, has_text)| Raw {
                kind,
                id: has_id.then_some(Some("R-1")),
                location: has_location.then_some("/x[1]"),
                test: Some("t"),
                text: has_text.then_some("msg"),
                opaque: false,
                shout: Shout(""),
            },
        )
    }

    proptest! {
        #[test]
        fn one_finding_per_outcome_entry(entries in prop::collection::vec(arb_entry(), 0..32)) {
            let result = map_entries(&entries, DocumentType::TaxInvoice);
            let asserts = entries.iter().filter(|e| e.kind == EntryKind::FailedAssert).count();
            let reports = entries.iter().filter(|e| e.kind == EntryKind::SuccessfulReport).count();
            prop_assert_eq!(result.errors().len(), asserts);
            prop_assert_eq!(result.warnings().len(), reports);
            prop_assert_eq!(result.is_valid(), asserts == 0);
            prop_assert_eq!(result.total_issue_count(), asserts + reports);
            prop_assert!(result.errors().iter().all(Finding::is_error));
        }
    }
}
