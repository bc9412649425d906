//! Running a compiled bundle against a document.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::bundle::{Check, CheckKind, CompiledBundle, Let, MessagePart};
use crate::dom::{Document, NodeId};
use crate::error::{XPathError, XPathResult};
use crate::svrl::{Outcome, SvrlEntry, SvrlReport, SvrlText};
use crate::xpath::{Value, Variables, normalize_space};

impl CompiledBundle {
    /// Execute every pattern against `doc` and collect an SVRL report.
    ///
    /// Within a pattern each node fires at most one rule, the first whose
    /// context matches it, and nodes are visited in document order.
    pub fn execute(&self, doc: &Document) -> XPathResult<SvrlReport> {
        let mut report = SvrlReport::new();
        report.title = self.title.clone();
        report.schema_version = self.schema_version.clone();
        report.query_binding = self.query_binding.clone();
        report.namespaces = self.prefixes.clone();

        let root = doc.root();
        let mut globals = Variables::new();
        bind_all(&self.lets, doc, root, &mut globals)?;

        for pattern in &self.patterns {
            report.push(SvrlEntry::ActivePattern {
                id: pattern.id.clone(),
                name: pattern.name.clone(),
            });

            let scope = if pattern.lets.is_empty() {
                Cow::Borrowed(&globals)
            } else {
                let mut scope = globals.clone();
                bind_all(&pattern.lets, doc, root, &mut scope)?;
                Cow::Owned(scope)
            };

            let mut assignment: BTreeMap<NodeId, usize> = BTreeMap::new();
            for (index, rule) in pattern.rules.iter().enumerate() {
                let nodes = match rule.context.evaluate(doc, root, &scope)? {
                    Value::Nodes(nodes) => nodes,
                    other => {
                        return Err(XPathError::Type {
                            message: format!(
                                "rule context '{}' selects a {}, not nodes",
                                rule.context,
                                other.type_name()
                            ),
                        });
                    }
                };
                for node in nodes {
                    assignment.entry(node).or_insert(index);
                }
            }

            for (node, index) in assignment {
                let rule = &pattern.rules[index];
                report.push(SvrlEntry::FiredRule {
                    id: rule.id.clone(),
                    context: rule.context.source().to_string(),
                });
                let local = if rule.lets.is_empty() {
                    Cow::Borrowed(scope.as_ref())
                } else {
                    let mut local = scope.as_ref().clone();
                    bind_all(&rule.lets, doc, node, &mut local)?;
                    Cow::Owned(local)
                };
                for check in &rule.checks {
                    if let Some(entry) = run_check(check, doc, node, &local)? {
                        trace!(
                            id = check.id.as_deref().unwrap_or(""),
                            test = %check.test,
                            "check fired"
                        );
                        report.push(entry);
                    }
                }
            }
        }

        debug!(
            source = %self.source_name,
            failed_asserts = report.failed_asserts().count(),
            successful_reports = report.successful_reports().count(),
            fired_rules = report.fired_rule_count(),
            "rule bundle executed"
        );
        Ok(report)
    }
}

fn bind_all(
    lets: &[Let],
    doc: &Document,
    node: NodeId,
    variables: &mut Variables,
) -> XPathResult<()> {
    for binding in lets {
        let value = binding.value.evaluate(doc, node, variables)?;
        variables.insert(binding.name.clone(), value);
    }
    Ok(())
}

fn run_check(
    check: &Check,
    doc: &Document,
    node: NodeId,
    variables: &Variables,
) -> XPathResult<Option<SvrlEntry>> {
    let holds = check.test.evaluate_boolean(doc, node, variables)?;
    let fires = match check.kind {
        CheckKind::Assert => !holds,
        CheckKind::Report => holds,
    };
    if !fires {
        return Ok(None);
    }
    let outcome = Outcome {
        id: check.id.clone(),
        location: Some(doc.location(node)),
        test: Some(check.test.source().to_string()),
        role: check.role.clone(),
        flag: check.flag.clone(),
        text: SvrlText::Plain(render_message(&check.message, doc, node, variables)?),
    };
    Ok(Some(match check.kind {
        CheckKind::Assert => SvrlEntry::FailedAssert(outcome),
        CheckKind::Report => SvrlEntry::SuccessfulReport(outcome),
    }))
}

fn render_message(
    parts: &[MessagePart],
    doc: &Document,
    node: NodeId,
    variables: &Variables,
) -> XPathResult<String> {
    let mut text = String::new();
    for part in parts {
        match part {
            MessagePart::Text(literal) => text.push_str(literal),
            MessagePart::ValueOf(select) => {
                text.push_str(&select.evaluate_string(doc, node, variables)?);
            }
            MessagePart::Name(path) => {
                let target = match path {
                    Some(path) => path
                        .evaluate(doc, node, variables)?
                        .as_nodes()
                        .and_then(|nodes| nodes.first().copied()),
                    None => Some(node),
                };
                if let Some(name) = target.and_then(|id| doc.name(id)) {
                    text.push_str(&name.qualified());
                }
            }
        }
    }
    Ok(normalize_space(&text))
}
