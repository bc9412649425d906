//! Schematron rule bundle compilation.

use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::{CompileError, XPathError, XmlError};
use crate::xpath::{Namespaces, XPath};

/// ISO Schematron namespace.
pub const SCHEMATRON_NAMESPACE: &str = "http://purl.oclc.org/dsdl/schematron";

/// A compiled, executable rule bundle.
#[derive(Debug, Clone)]
pub struct CompiledBundle {
    pub(crate) source_name: String,
    pub(crate) title: Option<String>,
    pub(crate) schema_version: Option<String>,
    pub(crate) query_binding: Option<String>,
    /// Declared prefixes in source order.
    pub(crate) prefixes: Vec<(String, String)>,
    pub(crate) lets: Vec<Let>,
    pub(crate) patterns: Vec<Pattern>,
    digest: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Let {
    pub name: String,
    pub value: XPath,
}

#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    pub id: Option<String>,
    pub name: Option<String>,
    pub lets: Vec<Let>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
pub(crate) struct Rule {
    pub id: Option<String>,
    pub context: XPath,
    pub lets: Vec<Let>,
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckKind {
    Assert,
    Report,
}

#[derive(Debug, Clone)]
pub(crate) struct Check {
    pub kind: CheckKind,
    pub id: Option<String>,
    pub role: Option<String>,
    pub flag: Option<String>,
    pub test: XPath,
    pub message: Vec<MessagePart>,
}

#[derive(Debug, Clone)]
pub(crate) enum MessagePart {
    Text(String),
    /// `sch:value-of select="..."`
    ValueOf(XPath),
    /// `sch:name`, optionally with a `path`.
    Name(Option<XPath>),
}

impl CompiledBundle {
    /// Compile Schematron source text. `source_name` is used in diagnostics.
    pub fn compile(source_name: impl Into<String>, text: &str) -> Result<Self, CompileError> {
        let source_name = source_name.into();
        let start = Instant::now();
        let doc = Document::parse(text)?;
        let schema = doc
            .document_element()
            .ok_or(CompileError::Xml(XmlError::NoRoot))?;
        if !is_sch(&doc, schema, "schema") {
            let found = doc
                .name(schema)
                .map(|name| name.qualified().into_owned())
                .unwrap_or_default();
            return Err(CompileError::NotSchematron { found });
        }

        let mut namespaces = Namespaces::new();
        let mut prefixes = Vec::new();
        for child in sch_children(&doc, schema) {
            if is_sch(&doc, child, "ns") {
                let prefix = required(&doc, child, "ns", "prefix")?;
                let uri = required(&doc, child, "ns", "uri")?;
                namespaces.insert(prefix, uri);
                prefixes.push((prefix.to_string(), uri.to_string()));
            }
        }

        let compiler = Compiler {
            doc: &doc,
            namespaces: &namespaces,
        };
        let mut bundle = CompiledBundle {
            source_name,
            title: None,
            schema_version: doc.attribute(schema, "schemaVersion").map(str::to_string),
            query_binding: doc.attribute(schema, "queryBinding").map(str::to_string),
            prefixes,
            lets: Vec::new(),
            patterns: Vec::new(),
            digest: hex::encode(Sha256::digest(text.as_bytes())),
        };

        for child in sch_children(&doc, schema) {
            let local = element_local(&doc, child);
            match local {
                "ns" | "p" | "diagnostics" | "phase" => {}
                "title" => bundle.title = Some(normalized_text(&doc, child)),
                "let" => bundle.lets.push(compiler.let_binding(child, "schema")?),
                "pattern" => bundle.patterns.push(compiler.pattern(child)?),
                "include" => {
                    return Err(CompileError::Unsupported {
                        construct: "sch:include".to_string(),
                    });
                }
                other => {
                    debug!(element = other, "ignoring schema child");
                }
            }
        }

        debug!(
            source = %bundle.source_name,
            patterns = bundle.pattern_count(),
            rules = bundle.rule_count(),
            assertions = bundle.assertion_count(),
            duration_ms = start.elapsed().as_millis(),
            "rule bundle compiled"
        );
        Ok(bundle)
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// `queryBinding` declared on `sch:schema`, if any.
    pub fn query_binding(&self) -> Option<&str> {
        self.query_binding.as_deref()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn rule_count(&self) -> usize {
        self.patterns.iter().map(|pattern| pattern.rules.len()).sum()
    }

    /// Asserts and reports across all rules.
    pub fn assertion_count(&self) -> usize {
        self.patterns
            .iter()
            .flat_map(|pattern| &pattern.rules)
            .map(|rule| rule.checks.len())
            .sum()
    }

    /// True when the bundle holds no rules at all.
    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// Lowercase hex SHA-256 of the source text.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

struct Compiler<'a> {
    doc: &'a Document,
    namespaces: &'a Namespaces,
}

impl Compiler<'_> {
    fn xpath(&self, source: &str, context: impl FnOnce() -> String) -> Result<XPath, CompileError> {
        XPath::compile(source, self.namespaces).map_err(|source| xpath_error(context(), source))
    }

    fn let_binding(&self, node: NodeId, scope: &str) -> Result<Let, CompileError> {
        let name = required(self.doc, node, "let", "name")?;
        let value = required(self.doc, node, "let", "value")?;
        Ok(Let {
            name: name.to_string(),
            value: self.xpath(value, || format!("{scope} variable ${name}"))?,
        })
    }

    fn pattern(&self, node: NodeId) -> Result<Pattern, CompileError> {
        if self.doc.attribute(node, "abstract") == Some("true") {
            return Err(CompileError::Unsupported {
                construct: "abstract sch:pattern".to_string(),
            });
        }
        if self.doc.attribute(node, "is-a").is_some() {
            return Err(CompileError::Unsupported {
                construct: "sch:pattern with is-a".to_string(),
            });
        }
        let mut pattern = Pattern {
            id: self.doc.attribute(node, "id").map(str::to_string),
            name: self.doc.attribute(node, "name").map(str::to_string),
            lets: Vec::new(),
            rules: Vec::new(),
        };
        for child in sch_children(self.doc, node) {
            match element_local(self.doc, child) {
                "let" => pattern.lets.push(self.let_binding(child, "pattern")?),
                "rule" => pattern.rules.push(self.rule(child)?),
                _ => {}
            }
        }
        Ok(pattern)
    }

    fn rule(&self, node: NodeId) -> Result<Rule, CompileError> {
        if self.doc.attribute(node, "abstract") == Some("true") {
            return Err(CompileError::Unsupported {
                construct: "abstract sch:rule".to_string(),
            });
        }
        let context_source = required(self.doc, node, "rule", "context")?;
        let context = XPath::compile_pattern(context_source, self.namespaces)
            .map_err(|source| xpath_error(format!("rule context '{context_source}'"), source))?;
        let mut rule = Rule {
            id: self.doc.attribute(node, "id").map(str::to_string),
            context,
            lets: Vec::new(),
            checks: Vec::new(),
        };
        for child in sch_children(self.doc, node) {
            match element_local(self.doc, child) {
                "let" => rule.lets.push(self.let_binding(child, "rule")?),
                "assert" => rule.checks.push(self.check(child, CheckKind::Assert, context_source)?),
                "report" => rule.checks.push(self.check(child, CheckKind::Report, context_source)?),
                "extends" => {
                    return Err(CompileError::Unsupported {
                        construct: "sch:extends".to_string(),
                    });
                }
                _ => {}
            }
        }
        Ok(rule)
    }

    fn check(&self, node: NodeId, kind: CheckKind, rule_context: &str) -> Result<Check, CompileError> {
        let element = match kind {
            CheckKind::Assert => "assert",
            CheckKind::Report => "report",
        };
        let test_source = required(self.doc, node, element, "test")?;
        let id = self.doc.attribute(node, "id").map(str::to_string);
        let label = || {
            format!(
                "{element} {} in rule '{rule_context}'",
                id.as_deref().unwrap_or("(no id)")
            )
        };
        let test = self.xpath(test_source, label)?;

        let mut message = Vec::new();
        for &child in self.doc.children(node) {
            match self.doc.kind(child) {
                NodeKind::Text(text) => message.push(MessagePart::Text(text.clone())),
                NodeKind::Element(_) if is_sch(self.doc, child, "value-of") => {
                    let select = required(self.doc, child, "value-of", "select")?;
                    message.push(MessagePart::ValueOf(self.xpath(select, || {
                        format!("value-of in {}", label())
                    })?));
                }
                NodeKind::Element(_) if is_sch(self.doc, child, "name") => {
                    let path = match self.doc.attribute(child, "path") {
                        Some(path) => Some(self.xpath(path, || format!("name path in {}", label()))?),
                        None => None,
                    };
                    message.push(MessagePart::Name(path));
                }
                NodeKind::Element(_) => {
                    message.push(MessagePart::Text(self.doc.string_value(child)));
                }
                _ => {}
            }
        }

        Ok(Check {
            kind,
            id,
            role: self.doc.attribute(node, "role").map(str::to_string),
            flag: self.doc.attribute(node, "flag").map(str::to_string),
            test,
            message,
        })
    }
}

fn xpath_error(context: String, source: XPathError) -> CompileError {
    CompileError::XPath { context, source }
}

fn is_sch(doc: &Document, node: NodeId, local: &str) -> bool {
    doc.name(node).is_some_and(|name| {
        name.local == local && name.namespace.as_deref() == Some(SCHEMATRON_NAMESPACE)
    })
}

/// Child elements in the Schematron namespace.
fn sch_children(doc: &Document, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    doc.child_elements(node).filter(|&child| {
        doc.name(child)
            .is_some_and(|name| name.namespace.as_deref() == Some(SCHEMATRON_NAMESPACE))
    })
}

fn element_local(doc: &Document, node: NodeId) -> &str {
    doc.name(node).map_or("", |name| name.local.as_str())
}

fn required<'d>(
    doc: &'d Document,
    node: NodeId,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'d str, CompileError> {
    doc.attribute(node, attribute)
        .ok_or(CompileError::MissingAttribute { element, attribute })
}

fn normalized_text(doc: &Document, node: NodeId) -> String {
    crate::xpath::normalize_space(&doc.string_value(node))
}
