//! Rules directory resolution.

use std::path::PathBuf;

/// Environment variable naming a directory that overrides the embedded bundles.
pub const RULES_ENV_VAR: &str = "ETAX_RULES_DIR";

/// Rules root from `ETAX_RULES_DIR`, if set and non-empty.
pub fn rules_root_from_env() -> Option<PathBuf> {
    std::env::var_os(RULES_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// The `data/` directory shipped with this crate, holding the bundles and
/// sample documents.
pub fn bundled_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}
