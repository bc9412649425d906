use thiserror::Error;

/// Returned when a document type name does not match any registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown document type: '{name}'")]
pub struct UnknownDocumentType {
    /// The name that failed to match.
    pub name: String,
}
