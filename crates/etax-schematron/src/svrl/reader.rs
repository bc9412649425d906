//! SVRL XML input.

use std::io::Read;

use super::{MixedText, Outcome, Segment, SvrlEntry, SvrlReport, SvrlText, SVRL_NAMESPACE};
use crate::dom::{Document, NodeId, NodeKind};
use crate::error::XmlError;

impl SvrlReport {
    /// Read an SVRL document produced by any Schematron processor.
    ///
    /// Children of the root in the SVRL namespace are mapped to their entry
    /// kinds; anything else is kept as [`SvrlEntry::Other`]. Missing
    /// attributes are tolerated and surface later as extraction errors.
    pub fn from_xml(text: &str) -> Result<Self, XmlError> {
        Ok(Self::from_document(&Document::parse(text)?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, XmlError> {
        Ok(Self::from_document(&Document::from_reader(reader)?))
    }

    fn from_document(doc: &Document) -> Self {
        let mut report = SvrlReport::new();
        let Some(root) = doc.document_element() else {
            return report;
        };
        report.title = doc.attribute(root, "title").map(str::to_string);
        report.schema_version = doc.attribute(root, "schemaVersion").map(str::to_string);
        report.query_binding = doc.attribute(root, "queryBinding").map(str::to_string);

        for child in doc.child_elements(root) {
            let Some(name) = doc.name(child) else {
                continue;
            };
            let attr = |local: &str| doc.attribute(child, local).map(str::to_string);
            if name.namespace.as_deref() != Some(SVRL_NAMESPACE) {
                report.push(SvrlEntry::Other {
                    name: name.qualified().into_owned(),
                    text: doc.string_value(child),
                });
                continue;
            }
            match name.local.as_str() {
                "ns-prefix-in-attribute-values" => {
                    if let (Some(prefix), Some(uri)) = (attr("prefix"), attr("uri")) {
                        report.namespaces.push((prefix, uri));
                    }
                }
                "active-pattern" => report.push(SvrlEntry::ActivePattern {
                    id: attr("id"),
                    name: attr("name"),
                }),
                "fired-rule" => report.push(SvrlEntry::FiredRule {
                    id: attr("id"),
                    context: attr("context").unwrap_or_default(),
                }),
                "failed-assert" => {
                    report.push(SvrlEntry::FailedAssert(read_outcome(doc, child)));
                }
                "successful-report" => {
                    report.push(SvrlEntry::SuccessfulReport(read_outcome(doc, child)));
                }
                _ => report.push(SvrlEntry::Other {
                    name: name.qualified().into_owned(),
                    text: doc.string_value(child),
                }),
            }
        }
        report
    }
}

fn read_outcome(doc: &Document, node: NodeId) -> Outcome {
    let attr = |local: &str| doc.attribute(node, local).map(str::to_string);
    let text = doc
        .child_elements(node)
        .find(|&child| {
            doc.name(child).is_some_and(|name| {
                name.local == "text" && name.namespace.as_deref() == Some(SVRL_NAMESPACE)
            })
        })
        .map_or(SvrlText::Absent, |text| read_text(doc, text));
    Outcome {
        id: attr("id"),
        location: attr("location"),
        test: attr("test"),
        role: attr("role"),
        flag: attr("flag"),
        text,
    }
}

fn read_text(doc: &Document, node: NodeId) -> SvrlText {
    if doc.child_elements(node).next().is_none() {
        return SvrlText::Plain(doc.string_value(node));
    }
    let segments = doc
        .children(node)
        .iter()
        .filter_map(|&child| match doc.kind(child) {
            NodeKind::Text(text) => Some(Segment::Text(text.clone())),
            NodeKind::Element(name) => Some(Segment::Markup {
                name: name.qualified().into_owned(),
                text: doc.string_value(child),
            }),
            _ => None,
        })
        .collect();
    SvrlText::Mixed(MixedText::new(segments))
}
