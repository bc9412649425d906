//! Integration tests for batch validation and the JSON report.

use std::path::PathBuf;
use std::sync::Arc;

use etax_cli::report::{FileStatus, validate_files};
use etax_model::DocumentType;
use etax_validate::paths::bundled_data_dir;
use etax_validate::{BundleLoader, SchematronValidator};
use insta::assert_snapshot;
use tempfile::TempDir;

fn sample(file: &str) -> PathBuf {
    bundled_data_dir()
        .join("e-tax-invoice-receipt-v2.1/ETDA/ExampleFile")
        .join(file)
}

fn validator() -> SchematronValidator {
    SchematronValidator::new(Arc::new(BundleLoader::new()))
}

#[test]
fn batch_records_each_file_outcome() {
    let dir = TempDir::new().expect("tempdir");
    let broken = dir.path().join("broken.xml");
    std::fs::write(&broken, "<rsm:oops").expect("write");
    let missing = dir.path().join("missing.xml");

    let files = vec![sample("Example_Receipt_2p1_v1.xml"), broken, missing];
    let run = validate_files(&validator(), DocumentType::Receipt, &files, None);

    assert_eq!(run.files.len(), 3);
    assert_eq!(run.failed_count(), 2);
    assert_eq!(run.error_count(), 0);
    assert_eq!(run.warning_count(), 1);
    assert!(!run.passed(false));
    assert!(matches!(run.files[0].status, FileStatus::Validated { .. }));

    let FileStatus::Failed { error } = &run.files[1].status else {
        panic!("expected failure");
    };
    assert!(error.contains("parse"), "{error}");
    let FileStatus::Failed { error } = &run.files[2].status else {
        panic!("expected failure");
    };
    assert!(error.starts_with("open "), "{error}");
}

#[test]
fn warnings_only_fail_when_requested() {
    let files = vec![sample("Example_Receipt_2p1_v1.xml")];
    let run = validate_files(&validator(), DocumentType::Receipt, &files, None);
    assert!(run.passed(false));
    assert!(!run.passed(true));

    let files = vec![sample("Example_TaxInvoice_2p1_v1.xml")];
    let run = validate_files(&validator(), DocumentType::TaxInvoice, &files, None);
    assert!(run.passed(true));
}

#[test]
fn svrl_reports_are_written_per_file() {
    let dir = TempDir::new().expect("tempdir");
    let svrl_dir = dir.path().join("svrl");
    let files = vec![sample("Example_Receipt_2p1_v1.xml")];
    let run = validate_files(&validator(), DocumentType::Receipt, &files, Some(&svrl_dir));

    let FileStatus::Validated { svrl: Some(path), .. } = &run.files[0].status else {
        panic!("expected an SVRL path");
    };
    assert_eq!(path, &svrl_dir.join("Example_Receipt_2p1_v1.svrl.xml"));
    let xml = std::fs::read_to_string(path).expect("read svrl");
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<svrl:successful-report"));
    assert!(xml.contains("RCT-BuyerTradeParty-002"));
}

#[test]
fn same_stem_inputs_get_distinct_svrl_reports() {
    let dir = TempDir::new().expect("tempdir");
    let receipt = std::fs::read_to_string(sample("Example_Receipt_2p1_v1.xml")).expect("read sample");
    let mut files = Vec::new();
    for folder in ["a", "b"] {
        let path = dir.path().join(folder).join("doc.xml");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        std::fs::write(&path, &receipt).expect("write input");
        files.push(path);
    }
    let svrl_dir = dir.path().join("out");
    let run = validate_files(&validator(), DocumentType::Receipt, &files, Some(&svrl_dir));

    let targets: Vec<_> = run
        .files
        .iter()
        .map(|file| match &file.status {
            FileStatus::Validated { svrl: Some(path), .. } => path.clone(),
            other => panic!("expected an SVRL path, got {other:?}"),
        })
        .collect();
    assert_eq!(
        targets,
        vec![svrl_dir.join("doc.svrl.xml"), svrl_dir.join("doc-2.svrl.xml")]
    );
    assert_eq!(std::fs::read_dir(&svrl_dir).expect("read dir").count(), 2);
}

#[test]
fn json_report_shape() {
    let files = vec![sample("Example_Receipt_2p1_v1.xml")];
    let run = validate_files(&validator(), DocumentType::Receipt, &files, None);
    let json: serde_json::Value = serde_json::from_str(&run.to_json().expect("json")).expect("parse");

    assert_eq!(json["schema"], "etax-cli.validation-report");
    assert_eq!(json["document_type"], "RECEIPT");
    assert!(
        chrono::DateTime::parse_from_rfc3339(json["validated_at"].as_str().expect("timestamp"))
            .is_ok()
    );
    let file = &json["files"][0];
    assert_eq!(file["status"], "validated");
    assert!(file.get("svrl").is_none());
    assert_snapshot!(
        serde_json::to_string_pretty(&file["result"]["warnings"]).expect("pretty"),
        @r#"
    [
      {
        "level": "Warning",
        "location": "/*:Receipt_CrossIndustryInvoice[namespace-uri()='urn:etda:uncefact:data:standard:Receipt_CrossIndustryInvoice:2'][1]/*:SupplyChainTradeTransaction[namespace-uri()='urn:etda:uncefact:data:standard:Receipt_CrossIndustryInvoice:2'][1]/*:ApplicableHeaderTradeAgreement[namespace-uri()='urn:etda:uncefact:data:standard:Receipt_ReusableAggregateBusinessInformationEntity:2'][1]/*:BuyerTradeParty[namespace-uri()='urn:etda:uncefact:data:standard:Receipt_ReusableAggregateBusinessInformationEntity:2'][1]",
        "message": "ควรระบุเลขประจำตัวผู้เสียภาษีของผู้ซื้อ / Buyer tax registration is recommended.",
        "rule_id": "RCT-BuyerTradeParty-002",
        "test_expression": "not(ram:SpecifiedTaxRegistration/ram:ID)"
      }
    ]
    "#
    );
}
