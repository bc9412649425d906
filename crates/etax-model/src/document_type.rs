//! Document type registry.
//!
//! Each ETDA e-Tax document kind maps to exactly one Schematron rule bundle.
//! The table is fixed at compile time; lookups by name are exact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownDocumentType;

const STANDARD_DIR: &str = "e-tax-invoice-receipt-v2.1/ETDA/data/standard";

/// ETDA e-Tax document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Tax Invoice (ใบกำกับภาษี)
    TaxInvoice,
    /// Receipt (ใบเสร็จรับเงิน)
    Receipt,
    /// Debit/Credit Note (ใบเพิ่มหนี้/ใบลดหนี้)
    DebitCreditNote,
    /// Generic UN/CEFACT CrossIndustryInvoice
    Invoice,
    /// Cancellation Note (ใบยกเลิก). Its rule bundle carries no rules.
    CancellationNote,
    /// Abbreviated Tax Invoice (ใบกำกับภาษีอย่างย่อ). Its rule bundle carries no rules.
    AbbreviatedTaxInvoice,
}

impl DocumentType {
    /// Every registered document type, in registry order.
    pub const ALL: [DocumentType; 6] = [
        Self::TaxInvoice,
        Self::Receipt,
        Self::DebitCreditNote,
        Self::Invoice,
        Self::CancellationNote,
        Self::AbbreviatedTaxInvoice,
    ];

    /// Get all document types.
    pub const fn all() -> &'static [Self] {
        &Self::ALL
    }

    /// Registry identifier (e.g. `TAX_INVOICE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaxInvoice => "TAX_INVOICE",
            Self::Receipt => "RECEIPT",
            Self::DebitCreditNote => "DEBIT_CREDIT_NOTE",
            Self::Invoice => "INVOICE",
            Self::CancellationNote => "CANCELLATION_NOTE",
            Self::AbbreviatedTaxInvoice => "ABBREVIATED_TAX_INVOICE",
        }
    }

    /// Document name as used in ETDA file names (e.g. `TaxInvoice`).
    pub fn document_name(&self) -> &'static str {
        match self {
            Self::TaxInvoice => "TaxInvoice",
            Self::Receipt => "Receipt",
            Self::DebitCreditNote => "DebitCreditNote",
            Self::Invoice => "Invoice",
            Self::CancellationNote => "CancellationNote",
            Self::AbbreviatedTaxInvoice => "AbbreviatedTaxInvoice",
        }
    }

    /// Path of the Schematron bundle, relative to the rules root.
    pub fn ruleset_path(&self) -> &'static str {
        match self {
            Self::TaxInvoice => "e-tax-invoice-receipt-v2.1/ETDA/data/standard/TaxInvoice_Schematron_2p1.sch",
            Self::Receipt => "e-tax-invoice-receipt-v2.1/ETDA/data/standard/Receipt_Schematron_2p1.sch",
            Self::DebitCreditNote => {
                "e-tax-invoice-receipt-v2.1/ETDA/data/standard/DebitCreditNote_Schematron_2p1.sch"
            }
            Self::Invoice => "e-tax-invoice-receipt-v2.1/ETDA/data/standard/Invoice_Schematron_2p1.sch",
            Self::CancellationNote => {
                "e-tax-invoice-receipt-v2.1/ETDA/data/standard/CancellationNote_Schematron_2p1.sch"
            }
            Self::AbbreviatedTaxInvoice => {
                "e-tax-invoice-receipt-v2.1/ETDA/data/standard/AbbreviatedTaxInvoice_Schematron_2p1.sch"
            }
        }
    }

    /// Prefix of the rule identifiers authored in this type's bundle (e.g. `TIV`).
    pub fn rule_prefix(&self) -> &'static str {
        match self {
            Self::TaxInvoice => "TIV",
            Self::Receipt => "RCT",
            Self::DebitCreditNote => "DCN",
            Self::Invoice => "INV",
            Self::CancellationNote => "CN",
            Self::AbbreviatedTaxInvoice => "ATI",
        }
    }

    /// Whether the bundle intentionally contains zero rules.
    pub fn is_empty_ruleset(&self) -> bool {
        matches!(self, Self::CancellationNote | Self::AbbreviatedTaxInvoice)
    }

    /// Document type codes (`ram:TypeCode`) issued under this kind.
    pub fn type_codes(&self) -> &'static [&'static str] {
        match self {
            Self::TaxInvoice => &["388"],
            Self::Receipt => &["T01"],
            Self::DebitCreditNote => &["80", "81"],
            Self::Invoice => &["380"],
            Self::CancellationNote => &["T07"],
            Self::AbbreviatedTaxInvoice => &["T05"],
        }
    }

    /// Directory holding every bundle, relative to the rules root.
    pub fn standard_dir() -> &'static str {
        STANDARD_DIR
    }

    /// Exact lookup by registry identifier (`TAX_INVOICE`) or document
    /// name (`TaxInvoice`). No case folding or partial matching.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str() == name || doc_type.document_name() == name)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = UnknownDocumentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownDocumentType {
            name: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ruleset_paths_live_in_standard_dir() {
        for doc_type in DocumentType::all() {
            let path = doc_type.ruleset_path();
            assert!(path.starts_with(DocumentType::standard_dir()), "{path}");
            assert!(path.ends_with(".sch"), "{path}");
            assert!(path.contains(doc_type.document_name()), "{path}");
        }
    }

    #[test]
    fn only_cancellation_and_abbreviated_are_empty() {
        let empty: Vec<_> = DocumentType::all()
            .iter()
            .filter(|doc_type| doc_type.is_empty_ruleset())
            .copied()
            .collect();
        assert_eq!(
            empty,
            vec![
                DocumentType::CancellationNote,
                DocumentType::AbbreviatedTaxInvoice
            ]
        );
    }

    #[test]
    fn lookup_is_exact() {
        assert_eq!(
            DocumentType::from_name("TAX_INVOICE"),
            Some(DocumentType::TaxInvoice)
        );
        assert_eq!(
            DocumentType::from_name("Receipt"),
            Some(DocumentType::Receipt)
        );
        assert_eq!(DocumentType::from_name("tax_invoice"), None);
        assert_eq!(DocumentType::from_name("TaxInv"), None);
        assert_eq!(DocumentType::from_name(""), None);
    }

    #[test]
    fn from_str_reports_the_unknown_name() {
        let err = "CREDIT_NOTE".parse::<DocumentType>().unwrap_err();
        assert_eq!(err.name, "CREDIT_NOTE");
        assert!(err.to_string().contains("CREDIT_NOTE"));
    }

    #[test]
    fn prefixes_are_unique() {
        let mut prefixes: Vec<_> = DocumentType::all()
            .iter()
            .map(DocumentType::rule_prefix)
            .collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), DocumentType::ALL.len());
    }
}
