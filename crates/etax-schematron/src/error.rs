//! Error types for XML parsing, XPath evaluation, and bundle compilation.

use thiserror::Error;

/// Errors raised while building a [`Document`](crate::Document).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XmlError {
    /// Tokenizer error (mismatched end tag, malformed markup, bad attribute).
    #[error("XML syntax error at byte {position}: {source}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// Malformed character data escape.
    #[error("invalid character data at byte {position}: {source}")]
    Escape {
        position: u64,
        #[source]
        source: quick_xml::escape::EscapeError,
    },

    /// Entity reference that is neither predefined nor a character reference.
    #[error("unknown entity reference '&{name};' at byte {position}")]
    UnknownEntity { name: String, position: u64 },

    /// End of input reached with elements still open.
    #[error("unexpected end of document: element <{name}> is not closed")]
    Unclosed { name: String },

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element (found <{name}>)")]
    MultipleRoots { name: String },

    #[error("text content outside the root element at byte {position}")]
    TextOutsideRoot { position: u64 },

    #[error("undeclared namespace prefix '{prefix}' at byte {position}")]
    UndeclaredPrefix { prefix: String, position: u64 },

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("failed to read XML input: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while compiling or evaluating an XPath expression.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XPathError {
    #[error("unexpected character '{ch}' at offset {offset} in '{expr}'")]
    Lex { expr: String, offset: usize, ch: char },

    #[error("syntax error at offset {offset} in '{expr}': {message}")]
    Syntax {
        expr: String,
        offset: usize,
        message: String,
    },

    #[error("unknown function {name}()")]
    UnknownFunction { name: String },

    #[error("function {name}() expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("undeclared namespace prefix '{prefix}'")]
    UndeclaredPrefix { prefix: String },

    #[error("unbound variable ${name}")]
    UnboundVariable { name: String },

    #[error("type error: {message}")]
    Type { message: String },

    #[error("invalid regular expression '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while compiling a Schematron rule bundle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    #[error("rule bundle is not well-formed XML: {0}")]
    Xml(#[from] XmlError),

    #[error("root element is <{found}>, expected sch:schema")]
    NotSchematron { found: String },

    #[error("<sch:{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("unsupported Schematron construct: {construct}")]
    Unsupported { construct: String },

    #[error("invalid XPath in {context}: {source}")]
    XPath {
        context: String,
        #[source]
        source: XPathError,
    },
}

/// Result type for XPath operations.
pub type XPathResult<T> = std::result::Result<T, XPathError>;
