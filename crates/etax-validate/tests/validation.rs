//! Validation of the bundled ETDA sample documents.

use std::path::PathBuf;
use std::sync::Arc;

use etax_validate::paths::bundled_data_dir;
use etax_validate::{
    BundleLoader, DocumentType, DocumentValidator, ErrorLevel, Finding, SchematronValidator,
    ValidationError,
};
use insta::assert_snapshot;

fn sample_path(file: &str) -> PathBuf {
    bundled_data_dir()
        .join("e-tax-invoice-receipt-v2.1/ETDA/ExampleFile")
        .join(file)
}

fn sample(file: &str) -> String {
    std::fs::read_to_string(sample_path(file)).expect("read sample document")
}

fn validator() -> SchematronValidator {
    SchematronValidator::new(Arc::new(BundleLoader::new()))
}

fn ids(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(Finding::rule_id).collect()
}

#[test]
fn empty_text_is_an_input_error() {
    let err = validator().validate("", DocumentType::TaxInvoice).unwrap_err();
    assert!(err.is_input_error());
    assert!(err.to_string().contains("null or empty"));
}

#[test]
fn empty_stream_is_an_input_error() {
    let mut input = std::io::empty();
    let err = validator()
        .validate_reader(&mut input, DocumentType::TaxInvoice)
        .unwrap_err();
    assert!(err.is_input_error());
    assert!(err.to_string().contains("cannot be null"));
}

#[test]
fn malformed_xml_is_a_parse_error_with_cause() {
    let err = validator()
        .validate(
            "<?xml version=\"1.0\"?><broken><unclosed>",
            DocumentType::TaxInvoice,
        )
        .unwrap_err();
    assert!(matches!(err, ValidationError::Parse { .. }));
    assert!(err.to_string().contains("parse"));
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(err.document_type(), Some(DocumentType::TaxInvoice));
}

#[test]
fn conformant_tax_invoice_is_valid() {
    let result = validator()
        .validate(&sample("Example_TaxInvoice_2p1_v1.xml"), DocumentType::TaxInvoice)
        .expect("validate");
    assert!(result.is_valid(), "{:?}", result.errors());
    assert!(result.errors().is_empty());
}

#[test]
fn every_sample_validates_against_its_type() {
    let cases = [
        ("Example_TaxInvoice_2p1_v1.xml", DocumentType::TaxInvoice),
        ("Example_Receipt_2p1_v1.xml", DocumentType::Receipt),
        ("Example_DebitNote_2p1_v1.xml", DocumentType::DebitCreditNote),
        ("Example_Invoice_2p1_v1.xml", DocumentType::Invoice),
        ("Example_CreditNote_2p1_v1.xml", DocumentType::CancellationNote),
        (
            "Example_AbbreviatedTaxInvoice_2p1_v1.xml",
            DocumentType::AbbreviatedTaxInvoice,
        ),
    ];
    let validator = validator();
    for (file, doc_type) in cases {
        let result = validator.validate(&sample(file), doc_type).expect(file);
        assert!(result.is_valid(), "{file}: {:?}", result.errors());
        assert!(
            result
                .warnings()
                .iter()
                .all(|warning| warning.rule_id().starts_with(doc_type.rule_prefix())),
            "{file}"
        );
    }
}

#[test]
fn receipt_without_buyer_tax_id_carries_a_warning() {
    let result = validator()
        .validate(&sample("Example_Receipt_2p1_v1.xml"), DocumentType::Receipt)
        .expect("validate");
    assert!(result.is_valid());
    assert_eq!(ids(result.warnings()), vec!["RCT-BuyerTradeParty-002"]);
    assert_eq!(result.warnings()[0].level(), ErrorLevel::Warning);
    assert_snapshot!(result.to_string(), @"ValidationResult{valid=true, errors=0, warnings=1}");
}

#[test]
fn older_guideline_version_still_produces_a_result() {
    let xml = sample("Example_TaxInvoice_2p1_v1.xml")
        .replace("schemeVersionID=\"v2.1\"", "schemeVersionID=\"v1.0\"");
    let result = validator()
        .validate(&xml, DocumentType::TaxInvoice)
        .expect("validate");
    assert!(result.is_valid());
    assert_eq!(ids(result.warnings()), vec!["TIV-DocumentContext-002"]);
    assert_snapshot!(
        result.warnings()[0].message(),
        @"เวอร์ชันมาตรฐานไม่ใช่ v2.1 / Guideline version v1.0 is not v2.1."
    );
}

#[test]
fn document_checked_against_another_type_reports_the_root() {
    let result = validator()
        .validate(&sample("Example_TaxInvoice_2p1_v1.xml"), DocumentType::Receipt)
        .expect("validate");
    assert!(!result.is_valid());
    assert_eq!(ids(result.errors()), vec!["RCT-Document-001"]);
    let error = &result.errors()[0];
    assert_eq!(error.location(), "/");
    assert!(error.message().ends_with("found rsm:TaxInvoice_CrossIndustryInvoice."));
    assert_eq!(error.test_expression(), "rsm:Receipt_CrossIndustryInvoice");
}

#[test]
fn rule_violations_are_findings_not_errors() {
    let xml = sample("Example_TaxInvoice_2p1_v1.xml")
        .replace("<ram:TypeCode>388</ram:TypeCode>", "<ram:TypeCode>380</ram:TypeCode>")
        .replace(
            "<ram:GrandTotalAmount>1070.00</ram:GrandTotalAmount>",
            "<ram:GrandTotalAmount>1000.00</ram:GrandTotalAmount>",
        );
    let result = validator()
        .validate(&xml, DocumentType::TaxInvoice)
        .expect("validate");
    assert!(!result.is_valid());
    assert_eq!(
        ids(result.errors()),
        vec!["TIV-ExchangedDocument-002", "TIV-Settlement-003"]
    );
    assert!(result.errors()[0].message().contains("found '380'"));
    assert!(
        result.errors()[1]
            .location()
            .contains("ApplicableHeaderTradeSettlement")
    );
    assert_snapshot!(
        result.errors()[1].message(),
        @"ยอดรวมทั้งสิ้นต้องเท่ากับมูลค่าก่อนภาษีบวกภาษี / Grand total 1000.00 must equal tax basis 1000.00 plus tax 70.00."
    );
}

#[test]
fn empty_rulesets_accept_any_well_formed_document() {
    let validator = validator();
    let documents = [
        "<root/>",
        &sample("Example_TaxInvoice_2p1_v1.xml"),
        "<?xml version=\"1.0\"?><x:a xmlns:x=\"urn:x\"><x:b>text</x:b></x:a>",
    ];
    for doc_type in DocumentType::all()
        .iter()
        .filter(|doc_type| doc_type.is_empty_ruleset())
    {
        for xml in documents {
            let result = validator.validate(xml, *doc_type).expect("validate");
            assert!(result.is_valid());
            assert!(result.errors().is_empty());
            assert!(result.warnings().is_empty());
        }
    }
}

#[test]
fn validation_is_deterministic() {
    let xml = sample("Example_TaxInvoice_2p1_v1.xml").replace(
        "<ram:LineID>2</ram:LineID>",
        "<ram:LineID></ram:LineID>",
    );
    let validator = validator();
    let first = validator.validate(&xml, DocumentType::TaxInvoice).expect("validate");
    let second = validator.validate(&xml, DocumentType::TaxInvoice).expect("validate");
    assert!(!first.is_valid());
    assert_eq!(first, second);
}

#[test]
fn stream_and_text_inputs_agree() {
    let xml = sample("Example_Receipt_2p1_v1.xml");
    let validator = validator();
    let from_text = validator.validate(&xml, DocumentType::Receipt).expect("text");
    let file = std::fs::File::open(sample_path("Example_Receipt_2p1_v1.xml")).expect("open");
    let mut reader = std::io::BufReader::new(file);
    let from_stream = validator
        .validate_reader(&mut reader, DocumentType::Receipt)
        .expect("stream");
    assert_eq!(from_text, from_stream);
}

#[test]
fn raw_report_is_available_alongside_the_result() {
    let (result, report) = validator()
        .validate_with_report(&sample("Example_Receipt_2p1_v1.xml"), DocumentType::Receipt)
        .expect("validate");
    assert_eq!(report.successful_reports().count(), result.warnings().len());
    assert_eq!(report.failed_asserts().count(), 0);
    assert_eq!(report.title.as_deref(), Some("Receipt (ETDA v2.1)"));
    assert!(report.to_xml().contains("RCT-BuyerTradeParty-002"));
}

#[test]
fn results_serialize_for_reporting() {
    let result = validator()
        .validate(&sample("Example_Receipt_2p1_v1.xml"), DocumentType::Receipt)
        .expect("validate");
    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json["valid"], true);
    assert_eq!(json["warnings"][0]["rule_id"], "RCT-BuyerTradeParty-002");
    assert_eq!(json["warnings"][0]["level"], "Warning");
}
