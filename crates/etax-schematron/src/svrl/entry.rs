//! SVRL report entries and the [`ReportEntry`] adapter.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Outcome shape of a report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A pattern that was evaluated.
    ActivePattern,
    /// A rule whose context matched a node.
    FiredRule,
    /// An assertion whose test evaluated to false.
    FailedAssert,
    /// A report whose test evaluated to true.
    SuccessfulReport,
    /// Anything else found in a report.
    Other,
}

/// Human-readable text attached to a report entry.
pub enum TextPayload<'a> {
    /// Text already available as a string.
    Value(Cow<'a, str>),
    /// Payload that can only be rendered through [`fmt::Display`].
    Opaque(&'a dyn fmt::Display),
}

impl TextPayload<'_> {
    pub fn into_text(self) -> String {
        match self {
            TextPayload::Value(value) => value.into_owned(),
            TextPayload::Opaque(display) => display.to_string(),
        }
    }
}

impl fmt::Debug for TextPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextPayload::Value(value) => f.debug_tuple("Value").field(value).finish(),
            TextPayload::Opaque(display) => f.debug_tuple("Opaque").field(&display.to_string()).finish(),
        }
    }
}

/// A field could not be read from a report entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("report entry has no {field}")]
pub struct ExtractError {
    pub field: &'static str,
}

impl ExtractError {
    pub fn missing(field: &'static str) -> Self {
        Self { field }
    }
}

/// Uniform read access to one raw report entry, whatever produced it.
///
/// Every accessor may fail; callers decide how to degrade.
pub trait ReportEntry {
    fn kind(&self) -> EntryKind;

    /// Rule identifier; `Ok(None)` when the rule carries no id.
    fn id(&self) -> Result<Option<&str>, ExtractError>;

    /// Location of the node the rule fired on.
    fn location(&self) -> Result<&str, ExtractError>;

    /// Test expression of the assertion or report.
    fn test(&self) -> Result<&str, ExtractError>;

    fn text(&self) -> Result<TextPayload<'_>, ExtractError>;
}

/// Mixed-content message: text interleaved with inline markup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MixedText {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Inline element such as `svrl:emph`, with its text content.
    Markup { name: String, text: String },
}

impl MixedText {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for MixedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) | Segment::Markup { text, .. } => f.write_str(text)?,
            }
        }
        Ok(())
    }
}

/// Content of an `svrl:text` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SvrlText {
    Plain(String),
    Mixed(MixedText),
    /// No `svrl:text` child was present.
    #[default]
    Absent,
}

/// Failed assertion or successful report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    pub id: Option<String>,
    pub location: Option<String>,
    pub test: Option<String>,
    pub role: Option<String>,
    pub flag: Option<String>,
    pub text: SvrlText,
}

/// One child of `svrl:schematron-output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SvrlEntry {
    ActivePattern {
        id: Option<String>,
        name: Option<String>,
    },
    FiredRule {
        id: Option<String>,
        context: String,
    },
    FailedAssert(Outcome),
    SuccessfulReport(Outcome),
    /// Element not modelled above, kept with its qualified name and text.
    Other { name: String, text: String },
}

impl SvrlEntry {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            SvrlEntry::FailedAssert(outcome) | SvrlEntry::SuccessfulReport(outcome) => {
                Some(outcome)
            }
            _ => None,
        }
    }
}

impl ReportEntry for SvrlEntry {
    fn kind(&self) -> EntryKind {
        match self {
            SvrlEntry::ActivePattern { .. } => EntryKind::ActivePattern,
            SvrlEntry::FiredRule { .. } => EntryKind::FiredRule,
            SvrlEntry::FailedAssert(_) => EntryKind::FailedAssert,
            SvrlEntry::SuccessfulReport(_) => EntryKind::SuccessfulReport,
            SvrlEntry::Other { .. } => EntryKind::Other,
        }
    }

    fn id(&self) -> Result<Option<&str>, ExtractError> {
        match self {
            SvrlEntry::ActivePattern { id, .. } | SvrlEntry::FiredRule { id, .. } => {
                Ok(id.as_deref())
            }
            SvrlEntry::FailedAssert(outcome) | SvrlEntry::SuccessfulReport(outcome) => {
                Ok(outcome.id.as_deref())
            }
            SvrlEntry::Other { .. } => Err(ExtractError::missing("id")),
        }
    }

    /// An outcome without a `location` attribute reads as empty; other
    /// entries carry no location at all.
    fn location(&self) -> Result<&str, ExtractError> {
        self.outcome()
            .map(|outcome| outcome.location.as_deref().unwrap_or_default())
            .ok_or(ExtractError::missing("location"))
    }

    fn test(&self) -> Result<&str, ExtractError> {
        self.outcome()
            .map(|outcome| outcome.test.as_deref().unwrap_or_default())
            .ok_or(ExtractError::missing("test"))
    }

    fn text(&self) -> Result<TextPayload<'_>, ExtractError> {
        match self {
            SvrlEntry::FailedAssert(outcome) | SvrlEntry::SuccessfulReport(outcome) => {
                match &outcome.text {
                    SvrlText::Plain(text) => Ok(TextPayload::Value(Cow::Borrowed(text))),
                    SvrlText::Mixed(mixed) => Ok(TextPayload::Opaque(mixed)),
                    SvrlText::Absent => Err(ExtractError::missing("text")),
                }
            }
            SvrlEntry::Other { text, .. } => Ok(TextPayload::Value(Cow::Borrowed(text))),
            _ => Err(ExtractError::missing("text")),
        }
    }
}
