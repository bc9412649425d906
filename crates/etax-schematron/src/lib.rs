//! ISO Schematron engine for e-Tax document validation.
//!
//! - [`Document`]: namespace-aware XML tree with XPath-style node locations
//! - [`xpath`]: compiled XPath expressions over that tree
//! - [`CompiledBundle`]: a parsed `.sch` rule bundle that executes into an
//!   [`SvrlReport`]
//! - [`svrl`]: the report model, readable from and writable to SVRL XML

pub mod bundle;
pub mod dom;
pub mod error;
mod execute;
pub mod svrl;
pub mod xpath;

pub use bundle::{CompiledBundle, SCHEMATRON_NAMESPACE};
pub use dom::{Document, Name, NodeId, NodeKind};
pub use error::{CompileError, XPathError, XmlError};
pub use svrl::{EntryKind, ExtractError, ReportEntry, SvrlEntry, SvrlReport, TextPayload};
