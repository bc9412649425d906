use etax_model::DocumentType;

use crate::loader::BundleLoader;

/// Health of every registered rule bundle.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DoctorReport {
    pub schema: String,
    pub schema_version: u32,
    /// `embedded` or the rules directory.
    pub source: String,
    pub bundles: Vec<BundleStatus>,
    pub counts: DoctorCounts,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BundleStatus {
    pub document_type: DocumentType,
    pub ruleset_path: String,
    pub rule_prefix: String,
    pub empty_ruleset: bool,
    pub healthy: bool,
    pub patterns: usize,
    pub rules: usize,
    pub assertions: usize,
    pub sha256: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DoctorCounts {
    pub bundles: usize,
    pub healthy: usize,
    pub rules: usize,
    pub assertions: usize,
}

impl DoctorReport {
    /// Resolve every document type through `loader` and record the outcome.
    pub fn collect(loader: &BundleLoader) -> Self {
        let bundles: Vec<BundleStatus> = DocumentType::ALL
            .into_iter()
            .map(|doc_type| BundleStatus::probe(loader, doc_type))
            .collect();
        let counts = DoctorCounts {
            bundles: bundles.len(),
            healthy: bundles.iter().filter(|status| status.healthy).count(),
            rules: bundles.iter().map(|status| status.rules).sum(),
            assertions: bundles.iter().map(|status| status.assertions).sum(),
        };
        let source = match loader.source() {
            crate::loader::RuleSource::Embedded => "embedded".to_string(),
            crate::loader::RuleSource::Directory(root) => root.display().to_string(),
        };
        Self {
            schema: "etax-validate.bundle-doctor".to_string(),
            schema_version: 1,
            source,
            bundles,
            counts,
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.counts.healthy == self.counts.bundles
    }
}

impl BundleStatus {
    fn probe(loader: &BundleLoader, doc_type: DocumentType) -> Self {
        let mut status = Self {
            document_type: doc_type,
            ruleset_path: doc_type.ruleset_path().to_string(),
            rule_prefix: doc_type.rule_prefix().to_string(),
            empty_ruleset: doc_type.is_empty_ruleset(),
            healthy: false,
            patterns: 0,
            rules: 0,
            assertions: 0,
            sha256: None,
            error: None,
        };
        match loader.resolve(doc_type) {
            Ok(bundle) => {
                status.healthy = true;
                status.patterns = bundle.pattern_count();
                status.rules = bundle.rule_count();
                status.assertions = bundle.assertion_count();
                status.sha256 = Some(bundle.digest().to_string());
            }
            Err(err) => status.error = Some(err.to_string()),
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_bundles_are_all_healthy() {
        let report = DoctorReport::collect(&BundleLoader::new());
        assert!(report.all_healthy());
        assert_eq!(report.counts.bundles, DocumentType::ALL.len());
        assert_eq!(report.source, "embedded");
        for status in &report.bundles {
            assert_eq!(status.rules == 0, status.empty_ruleset, "{}", status.document_type);
            assert_eq!(status.sha256.as_ref().map(String::len), Some(64));
        }
    }

    #[test]
    fn missing_directory_reports_every_bundle_unhealthy() {
        let report = DoctorReport::collect(&BundleLoader::from_dir("/no/such/rules"));
        assert_eq!(report.counts.healthy, 0);
        assert!(!report.all_healthy());
        assert!(
            report
                .bundles
                .iter()
                .all(|status| status.error.as_deref().is_some_and(|e| e.contains("not found")))
        );
    }
}
