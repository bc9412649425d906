//! Single rule outcome reported by a validation run.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Finding level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorLevel {
    /// Failed assertion (business rule violation)
    Error,
    /// Successful report (advisory message)
    Warning,
}

impl ErrorLevel {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One rule outcome.
///
/// Messages may carry both Thai and English text. Equality and hashing cover
/// `rule_id`, `message`, `location` and `level`; the captured test expression
/// is diagnostic only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    rule_id: String,
    message: String,
    location: String,
    level: ErrorLevel,
    test_expression: String,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
        level: ErrorLevel,
        test_expression: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
            location: location.into(),
            level,
            test_expression: test_expression.into(),
        }
    }

    /// Rule identifier (e.g. `TIV-DocumentContext-001`), or `UNKNOWN`.
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// XPath location of the node the rule fired on.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn level(&self) -> ErrorLevel {
        self.level
    }

    /// The rule's test expression.
    pub fn test_expression(&self) -> &str {
        &self.test_expression
    }

    pub fn is_error(&self) -> bool {
        self.level == ErrorLevel::Error
    }
}

impl PartialEq for Finding {
    fn eq(&self, other: &Self) -> bool {
        self.rule_id == other.rule_id
            && self.message == other.message
            && self.location == other.location
            && self.level == other.level
    }
}

impl Eq for Finding {}

impl Hash for Finding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rule_id.hash(state);
        self.message.hash(state);
        self.location.hash(state);
        self.level.hash(state);
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Finding{{ruleId='{}', message='{}', location='{}', level={}}}",
            self.rule_id, self.message, self.location, self.level
        )
    }
}
