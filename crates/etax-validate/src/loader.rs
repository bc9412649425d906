//! Rule bundle resolution and caching.
//!
//! A [`BundleLoader`] turns a [`DocumentType`] into a shared
//! [`CompiledBundle`]. Compiled bundles are cached per document type; the
//! cache tolerates concurrent readers and concurrent first-time writers.
//! Two callers missing the cache at once may both compile, and the first
//! insert wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use etax_model::DocumentType;
use etax_schematron::CompiledBundle;
use tracing::{debug, error, info_span};

use crate::embedded;
use crate::error::ValidationError;

/// Where bundle text comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RuleSource {
    /// Bundles compiled into the binary.
    #[default]
    Embedded,
    /// Bundles read from `root.join(ruleset_path)`.
    Directory(PathBuf),
}

impl RuleSource {
    /// Display form of the location a document type's bundle resolves to.
    pub fn location_of(&self, doc_type: DocumentType) -> PathBuf {
        match self {
            RuleSource::Embedded => PathBuf::from(doc_type.ruleset_path()),
            RuleSource::Directory(root) => root.join(doc_type.ruleset_path()),
        }
    }
}

/// Resolves document types to compiled rule bundles.
#[derive(Debug, Default)]
pub struct BundleLoader {
    source: RuleSource,
    cache: RwLock<HashMap<DocumentType, Arc<CompiledBundle>>>,
}

impl BundleLoader {
    /// Loader over the embedded bundles.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: RuleSource) -> Self {
        Self {
            source,
            cache: RwLock::default(),
        }
    }

    /// Loader reading from `root`.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::with_source(RuleSource::Directory(root.into()))
    }

    pub fn source(&self) -> &RuleSource {
        &self.source
    }

    /// Compiled bundle for `doc_type`, compiling and caching it on first use.
    ///
    /// # Errors
    ///
    /// [`ValidationError::BundleNotFound`] when no bundle backs the ruleset
    /// path, [`ValidationError::BundleLoad`] when it cannot be read, and
    /// [`ValidationError::BundleCompile`] when it is not a usable Schematron
    /// schema.
    pub fn resolve(&self, doc_type: DocumentType) -> Result<Arc<CompiledBundle>, ValidationError> {
        if let Some(bundle) = self.cached(doc_type) {
            return Ok(bundle);
        }

        let _span = info_span!("resolve_bundle", document_type = %doc_type).entered();
        let bundle = Arc::new(self.compile(doc_type)?);

        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let bundle = cache.entry(doc_type).or_insert(bundle);
        Ok(Arc::clone(bundle))
    }

    /// Whether `doc_type` resolves to a compiled bundle. Never fails.
    pub fn is_bundle_healthy(&self, doc_type: DocumentType) -> bool {
        match self.resolve(doc_type) {
            Ok(_) => true,
            Err(err) => {
                debug!(document_type = %doc_type, error = %err, "bundle health check failed");
                false
            }
        }
    }

    /// Document types currently held in the cache, in registry order.
    pub fn cached_types(&self) -> Vec<DocumentType> {
        let cache = self
            .cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        DocumentType::ALL
            .into_iter()
            .filter(|doc_type| cache.contains_key(doc_type))
            .collect()
    }

    /// Drop every cached bundle; the next resolve recompiles.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    fn cached(&self, doc_type: DocumentType) -> Option<Arc<CompiledBundle>> {
        self.cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&doc_type)
            .cloned()
    }

    fn compile(&self, doc_type: DocumentType) -> Result<CompiledBundle, ValidationError> {
        let path = self.source.location_of(doc_type);
        let text = match &self.source {
            RuleSource::Embedded => embedded::bundle_source(doc_type.ruleset_path())
                .map(str::to_string)
                .ok_or_else(|| not_found(doc_type, &path))?,
            RuleSource::Directory(_) => read_bundle(doc_type, &path)?,
        };

        let bundle = CompiledBundle::compile(path.display().to_string(), &text).map_err(|source| {
            error!(document_type = %doc_type, path = %path.display(), error = %source, "rule bundle failed to compile");
            ValidationError::BundleCompile {
                document_type: doc_type,
                path: path.clone(),
                source,
            }
        })?;

        debug!(
            document_type = %doc_type,
            path = %path.display(),
            patterns = bundle.pattern_count(),
            rules = bundle.rule_count(),
            assertions = bundle.assertion_count(),
            digest = bundle.digest(),
            "rule bundle compiled"
        );
        Ok(bundle)
    }
}

fn read_bundle(doc_type: DocumentType, path: &Path) -> Result<String, ValidationError> {
    if !path.is_file() {
        return Err(not_found(doc_type, path));
    }
    std::fs::read_to_string(path).map_err(|source| {
        error!(document_type = %doc_type, path = %path.display(), error = %source, "rule bundle unreadable");
        ValidationError::BundleLoad {
            document_type: doc_type,
            path: path.to_path_buf(),
            source,
        }
    })
}

fn not_found(doc_type: DocumentType, path: &Path) -> ValidationError {
    error!(document_type = %doc_type, path = %path.display(), "rule bundle not found");
    ValidationError::BundleNotFound {
        document_type: doc_type,
        path: path.to_path_buf(),
    }
}
