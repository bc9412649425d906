//! SVRL XML output.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::{Outcome, Segment, SvrlEntry, SvrlReport, SvrlText, SVRL_NAMESPACE};

impl SvrlReport {
    /// Write the report as indented SVRL XML.
    pub fn write_xml<W: Write>(&self, out: W) -> std::io::Result<()> {
        let mut xml = Writer::new_with_indent(out, b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("svrl:schematron-output");
        root.push_attribute(("xmlns:svrl", SVRL_NAMESPACE));
        if let Some(title) = self.title.as_deref() {
            root.push_attribute(("title", title));
        }
        if let Some(version) = self.schema_version.as_deref() {
            root.push_attribute(("schemaVersion", version));
        }
        if let Some(binding) = self.query_binding.as_deref() {
            root.push_attribute(("queryBinding", binding));
        }
        if self.entries.is_empty() && self.namespaces.is_empty() {
            xml.write_event(Event::Empty(root))?;
            return Ok(());
        }
        xml.write_event(Event::Start(root))?;

        for (prefix, uri) in &self.namespaces {
            let mut ns = BytesStart::new("svrl:ns-prefix-in-attribute-values");
            ns.push_attribute(("uri", uri.as_str()));
            ns.push_attribute(("prefix", prefix.as_str()));
            xml.write_event(Event::Empty(ns))?;
        }

        for entry in &self.entries {
            match entry {
                SvrlEntry::ActivePattern { id, name } => {
                    let mut node = BytesStart::new("svrl:active-pattern");
                    if let Some(id) = id.as_deref() {
                        node.push_attribute(("id", id));
                    }
                    if let Some(name) = name.as_deref() {
                        node.push_attribute(("name", name));
                    }
                    xml.write_event(Event::Empty(node))?;
                }
                SvrlEntry::FiredRule { id, context } => {
                    let mut node = BytesStart::new("svrl:fired-rule");
                    node.push_attribute(("context", context.as_str()));
                    if let Some(id) = id.as_deref() {
                        node.push_attribute(("id", id));
                    }
                    xml.write_event(Event::Empty(node))?;
                }
                SvrlEntry::FailedAssert(outcome) => {
                    write_outcome(&mut xml, "svrl:failed-assert", outcome)?;
                }
                SvrlEntry::SuccessfulReport(outcome) => {
                    write_outcome(&mut xml, "svrl:successful-report", outcome)?;
                }
                SvrlEntry::Other { name, text } => {
                    xml.write_event(Event::Start(BytesStart::new(name.as_str())))?;
                    xml.write_event(Event::Text(BytesText::new(text)))?;
                    xml.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
        }

        xml.write_event(Event::End(BytesEnd::new("svrl:schematron-output")))?;
        Ok(())
    }

    /// The report as an SVRL XML string.
    pub fn to_xml(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_xml(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn write_outcome<W: Write>(
    xml: &mut Writer<W>,
    element: &str,
    outcome: &Outcome,
) -> std::io::Result<()> {
    let mut node = BytesStart::new(element);
    let attributes = [
        ("test", outcome.test.as_deref()),
        ("id", outcome.id.as_deref()),
        ("role", outcome.role.as_deref()),
        ("flag", outcome.flag.as_deref()),
        ("location", outcome.location.as_deref()),
    ];
    for (name, value) in attributes {
        if let Some(value) = value {
            node.push_attribute((name, value));
        }
    }
    if matches!(outcome.text, SvrlText::Absent) {
        xml.write_event(Event::Empty(node))?;
        return Ok(());
    }
    xml.write_event(Event::Start(node))?;
    xml.write_event(Event::Start(BytesStart::new("svrl:text")))?;
    match &outcome.text {
        SvrlText::Plain(text) => {
            xml.write_event(Event::Text(BytesText::new(text)))?;
        }
        SvrlText::Mixed(mixed) => {
            for segment in mixed.segments() {
                match segment {
                    Segment::Text(text) => {
                        xml.write_event(Event::Text(BytesText::new(text)))?;
                    }
                    Segment::Markup { name, text } => {
                        xml.write_event(Event::Start(BytesStart::new(name.as_str())))?;
                        xml.write_event(Event::Text(BytesText::new(text)))?;
                        xml.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                    }
                }
            }
        }
        SvrlText::Absent => {}
    }
    xml.write_event(Event::End(BytesEnd::new("svrl:text")))?;
    xml.write_event(Event::End(BytesEnd::new(element)))?;
    Ok(())
}
