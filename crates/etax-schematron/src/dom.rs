//! Immutable XML tree with namespace resolution.
//!
//! Nodes live in a single arena and are identified by [`NodeId`]. Ids are
//! assigned in document order, with attributes numbered directly after their
//! owner element and before its children, so comparing ids compares document
//! position.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::Read;

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::error::XmlError;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Arena index of a node. Ordering follows document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Namespace-resolved element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    /// Prefix as written in the source, if any.
    pub prefix: Option<String>,
    pub local: String,
    /// Resolved namespace URI; `None` when the name is in no namespace.
    pub namespace: Option<String>,
}

impl Name {
    /// Name as written in the source (`prefix:local` or `local`).
    pub fn qualified(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{prefix}:{}", self.local)),
            None => Cow::Borrowed(&self.local),
        }
    }

    /// True when both names share local part and namespace.
    pub fn same_expanded(&self, other: &Name) -> bool {
        self.local == other.local && self.namespace == other.namespace
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element(Name),
    Attribute { name: Name, value: String },
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<NodeId>,
}

/// Parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Parse a document from text.
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(text);
        let mut builder = TreeBuilder::new();

        loop {
            let position = reader.buffer_position() as u64;
            match reader.read_event() {
                Ok(Event::Start(start)) => builder.open(&start, position)?,
                Ok(Event::Empty(start)) => {
                    builder.open(&start, position)?;
                    builder.close();
                }
                Ok(Event::End(_)) => builder.close(),
                Ok(Event::Text(text)) => {
                    let raw = std::str::from_utf8(&text)?;
                    let value = unescape(raw)
                        .map_err(|source| XmlError::Escape { position, source })?;
                    builder.text(&value, position)?;
                }
                Ok(Event::CData(data)) => {
                    let value = std::str::from_utf8(&data)?;
                    builder.text(value, position)?;
                }
                Ok(Event::GeneralRef(reference)) => {
                    let name = std::str::from_utf8(&reference)?;
                    let value = resolve_reference(name, position)?;
                    builder.text(&value, position)?;
                }
                Ok(Event::Comment(comment)) => {
                    let value = std::str::from_utf8(&comment)?;
                    builder.leaf(NodeKind::Comment(value.to_string()));
                }
                Ok(Event::PI(pi)) => {
                    let raw = std::str::from_utf8(&pi)?;
                    let (target, data) = match raw.split_once(char::is_whitespace) {
                        Some((target, data)) => (target, data.trim_start()),
                        None => (raw, ""),
                    };
                    builder.leaf(NodeKind::ProcessingInstruction {
                        target: target.to_string(),
                        data: data.to_string(),
                    });
                }
                Ok(Event::Decl(_)) | Ok(Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(source) => return Err(XmlError::Syntax { position, source }),
            }
        }

        builder.finish()
    }

    /// Read all bytes from `reader` and parse them as UTF-8 XML.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, XmlError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = std::str::from_utf8(&bytes)?;
        Self::parse(text)
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    /// Number of nodes, attributes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// All nodes in document order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Child nodes (attributes excluded).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].attributes
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn is_attribute(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Attribute { .. })
    }

    /// Element or attribute name.
    pub fn name(&self, id: NodeId) -> Option<&Name> {
        match self.kind(id) {
            NodeKind::Element(name) => Some(name),
            NodeKind::Attribute { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Value of the un-namespaced attribute `local` on element `id`.
    pub fn attribute(&self, id: NodeId, local: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find_map(|&attr| match self.kind(attr) {
                NodeKind::Attribute { name, value }
                    if name.namespace.is_none() && name.local == local =>
                {
                    Some(value.as_str())
                }
                _ => None,
            })
    }

    /// Element children of `id`.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
    }

    /// Descendants of `id` in document order (attributes excluded).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Last node (by id) inside the subtree rooted at `id`, attributes included.
    pub fn subtree_end(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            if let Some(&last) = self.children(current).last() {
                current = last;
            } else if let Some(&last) = self.attributes(current).last() {
                return last;
            } else {
                return current;
            }
        }
    }

    /// XPath string-value of a node.
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Root | NodeKind::Element(_) => {
                let mut out = String::new();
                for descendant in self.descendants(id) {
                    if let NodeKind::Text(text) = self.kind(descendant) {
                        out.push_str(text);
                    }
                }
                out
            }
            NodeKind::Attribute { value, .. } => value.clone(),
            NodeKind::Text(text) | NodeKind::Comment(text) => text.clone(),
            NodeKind::ProcessingInstruction { data, .. } => data.clone(),
        }
    }

    /// XPath-style location of a node, e.g.
    /// `/*:Invoice[namespace-uri()='urn:x'][1]/*:ID[namespace-uri()='urn:x'][1]`.
    pub fn location(&self, id: NodeId) -> String {
        let mut steps = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(step) = self.location_step(node) {
                steps.push(step);
            }
            current = self.parent(node);
        }
        if steps.is_empty() {
            return "/".to_string();
        }
        steps.iter().rev().fold(String::new(), |mut out, step| {
            out.push('/');
            out.push_str(step);
            out
        })
    }

    fn location_step(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::Root => None,
            NodeKind::Element(name) => {
                let position = self.sibling_position(id, |other| match other {
                    NodeKind::Element(other_name) => other_name.same_expanded(name),
                    _ => false,
                });
                let mut step = String::new();
                match &name.namespace {
                    Some(uri) => {
                        let _ = write!(
                            step,
                            "*:{}[namespace-uri()='{}'][{}]",
                            name.local, uri, position
                        );
                    }
                    None => {
                        let _ = write!(step, "{}[{}]", name.local, position);
                    }
                }
                Some(step)
            }
            NodeKind::Attribute { name, .. } => Some(match &name.namespace {
                Some(uri) => format!("@*[local-name()='{}' and namespace-uri()='{}']", name.local, uri),
                None => format!("@{}", name.local),
            }),
            NodeKind::Text(_) => Some(format!(
                "text()[{}]",
                self.sibling_position(id, |other| matches!(other, NodeKind::Text(_)))
            )),
            NodeKind::Comment(_) => Some(format!(
                "comment()[{}]",
                self.sibling_position(id, |other| matches!(other, NodeKind::Comment(_)))
            )),
            NodeKind::ProcessingInstruction { target, .. } => Some(format!(
                "processing-instruction('{}')[{}]",
                target,
                self.sibling_position(id, |other| matches!(
                    other,
                    NodeKind::ProcessingInstruction { target: t, .. } if t == target
                ))
            )),
        }
    }

    fn sibling_position(&self, id: NodeId, same: impl Fn(&NodeKind) -> bool) -> usize {
        let Some(parent) = self.parent(id) else {
            return 1;
        };
        self.children(parent)
            .iter()
            .take_while(|&&sibling| sibling != id)
            .filter(|&&sibling| same(self.kind(sibling)))
            .count()
            + 1
    }
}

fn resolve_reference(name: &str, position: u64) -> Result<String, XmlError> {
    let unknown = || XmlError::UnknownEntity {
        name: name.to_string(),
        position,
    };
    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => code.parse::<u32>(),
        };
        return parsed
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(unknown);
    }
    resolve_predefined_entity(name)
        .map(str::to_string)
        .ok_or_else(unknown)
}

/// Namespace declarations introduced by one open element.
type Scope = Vec<(Option<String>, Option<String>)>;

struct TreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
    scopes: Vec<Scope>,
    root_seen: bool,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
                attributes: Vec::new(),
            }],
            open: Vec::new(),
            scopes: Vec::new(),
            root_seen: false,
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId(0))
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            attributes: Vec::new(),
        });
        id
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<Option<String>> {
        if prefix == Some("xml") {
            return Some(Some(XML_NAMESPACE.to_string()));
        }
        self.scopes.iter().rev().find_map(|scope| {
            scope
                .iter()
                .rev()
                .find(|(declared, _)| declared.as_deref() == prefix)
                .map(|(_, uri)| uri.clone())
        })
    }

    fn open(&mut self, start: &BytesStart<'_>, position: u64) -> Result<(), XmlError> {
        let qname = std::str::from_utf8(start.name().as_ref())?.to_string();
        if self.open.is_empty() {
            if self.root_seen {
                return Err(XmlError::MultipleRoots { name: qname });
            }
            self.root_seen = true;
        }

        let mut scope = Scope::new();
        let mut raw_attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| XmlError::Syntax {
                position,
                source: quick_xml::Error::from(err),
            })?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let raw = std::str::from_utf8(&attr.value)?;
            let value = unescape(raw)
                .map_err(|source| XmlError::Escape { position, source })?
                .into_owned();
            if key == "xmlns" {
                scope.push((None, (!value.is_empty()).then_some(value)));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.push((Some(prefix.to_string()), Some(value)));
            } else {
                raw_attributes.push((key, value));
            }
        }
        self.scopes.push(scope);

        let name = self.resolve(&qname, true, position)?;
        let parent = self.current();
        let element = self.push(NodeKind::Element(name), parent);
        self.nodes[parent.0].children.push(element);

        for (key, value) in raw_attributes {
            let name = self.resolve(&key, false, position)?;
            let attr = self.push(NodeKind::Attribute { name, value }, element);
            self.nodes[element.0].attributes.push(attr);
        }

        self.open.push(element);
        Ok(())
    }

    fn resolve(&self, qname: &str, is_element: bool, position: u64) -> Result<Name, XmlError> {
        match qname.split_once(':') {
            Some((prefix, local)) => {
                let namespace = self.lookup(Some(prefix)).flatten().ok_or_else(|| {
                    XmlError::UndeclaredPrefix {
                        prefix: prefix.to_string(),
                        position,
                    }
                })?;
                Ok(Name {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                    namespace: Some(namespace),
                })
            }
            None => Ok(Name {
                prefix: None,
                local: qname.to_string(),
                namespace: if is_element {
                    self.lookup(None).flatten()
                } else {
                    None
                },
            }),
        }
    }

    fn close(&mut self) {
        if self.open.pop().is_some() {
            self.scopes.pop();
        }
    }

    fn text(&mut self, value: &str, position: u64) -> Result<(), XmlError> {
        if self.open.is_empty() {
            if value.trim().is_empty() {
                return Ok(());
            }
            return Err(XmlError::TextOutsideRoot { position });
        }
        let parent = self.current();
        let last = self.nodes[parent.0].children.last().copied();
        if let Some(last) = last
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(value);
            return Ok(());
        }
        let id = self.push(NodeKind::Text(value.to_string()), parent);
        self.nodes[parent.0].children.push(id);
        Ok(())
    }

    fn leaf(&mut self, kind: NodeKind) {
        let parent = self.current();
        let id = self.push(kind, parent);
        self.nodes[parent.0].children.push(id);
    }

    fn finish(self) -> Result<Document, XmlError> {
        if let Some(&open) = self.open.last() {
            let name = match &self.nodes[open.0].kind {
                NodeKind::Element(name) => name.qualified().into_owned(),
                _ => String::new(),
            };
            return Err(XmlError::Unclosed { name });
        }
        if !self.root_seen {
            return Err(XmlError::NoRoot);
        }
        Ok(Document { nodes: self.nodes })
    }
}
