//! Embedded rule bundles.
//!
//! Every ETDA Schematron bundle is embedded at compile time using
//! `include_str!()`, keyed by its ruleset path, so the default loader needs
//! no runtime file access.

use etax_model::DocumentType;

// =============================================================================
// Rule-bearing bundles
// =============================================================================

/// Tax Invoice (TIV) rules.
pub const TAX_INVOICE_SCH: &str = include_str!(
    "../data/e-tax-invoice-receipt-v2.1/ETDA/data/standard/TaxInvoice_Schematron_2p1.sch"
);

/// Receipt (RCT) rules.
pub const RECEIPT_SCH: &str = include_str!(
    "../data/e-tax-invoice-receipt-v2.1/ETDA/data/standard/Receipt_Schematron_2p1.sch"
);

/// Debit/Credit Note (DCN) rules.
pub const DEBIT_CREDIT_NOTE_SCH: &str = include_str!(
    "../data/e-tax-invoice-receipt-v2.1/ETDA/data/standard/DebitCreditNote_Schematron_2p1.sch"
);

/// Invoice (INV) rules.
pub const INVOICE_SCH: &str = include_str!(
    "../data/e-tax-invoice-receipt-v2.1/ETDA/data/standard/Invoice_Schematron_2p1.sch"
);

// =============================================================================
// Empty bundles
// =============================================================================

/// Cancellation Note bundle. Declares namespaces only.
pub const CANCELLATION_NOTE_SCH: &str = include_str!(
    "../data/e-tax-invoice-receipt-v2.1/ETDA/data/standard/CancellationNote_Schematron_2p1.sch"
);

/// Abbreviated Tax Invoice bundle. Declares namespaces only.
pub const ABBREVIATED_TAX_INVOICE_SCH: &str = include_str!(
    "../data/e-tax-invoice-receipt-v2.1/ETDA/data/standard/AbbreviatedTaxInvoice_Schematron_2p1.sch"
);

/// Embedded bundle text for a ruleset path, or `None` if nothing is
/// embedded under that path.
pub fn bundle_source(ruleset_path: &str) -> Option<&'static str> {
    DocumentType::ALL
        .into_iter()
        .find(|doc_type| doc_type.ruleset_path() == ruleset_path)
        .map(source_for)
}

fn source_for(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::TaxInvoice => TAX_INVOICE_SCH,
        DocumentType::Receipt => RECEIPT_SCH,
        DocumentType::DebitCreditNote => DEBIT_CREDIT_NOTE_SCH,
        DocumentType::Invoice => INVOICE_SCH,
        DocumentType::CancellationNote => CANCELLATION_NOTE_SCH,
        DocumentType::AbbreviatedTaxInvoice => ABBREVIATED_TAX_INVOICE_SCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_document_type_has_an_embedded_bundle() {
        for doc_type in DocumentType::all() {
            let source = bundle_source(doc_type.ruleset_path()).expect("embedded bundle");
            assert!(source.contains("purl.oclc.org/dsdl/schematron"), "{doc_type}");
        }
    }

    #[test]
    fn unknown_paths_are_not_embedded() {
        assert!(bundle_source("e-tax-invoice-receipt-v2.1/ETDA/data/standard/Nope.sch").is_none());
        assert!(bundle_source("").is_none());
    }
}
