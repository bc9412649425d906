//! Tree-walking evaluator over [`Document`].

use super::Variables;
use super::ast::{ArithOp, Axis, CompareOp, Expr, NodeTest, PathStart, Step};
use super::functions;
use crate::dom::{Document, NodeId, NodeKind};
use crate::error::{XPathError, XPathResult};

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Node-set, sorted in document order without duplicates.
    Nodes(Vec<NodeId>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nodes(_) => "node-set",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    pub fn as_nodes(&self) -> Option<&[NodeId]> {
        match self {
            Value::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// XPath `boolean()` conversion.
    pub fn boolean_value(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Boolean(value) => *value,
            Value::Number(value) => *value != 0.0 && !value.is_nan(),
            Value::String(value) => !value.is_empty(),
        }
    }

    /// XPath `number()` conversion.
    pub fn number_value(&self, doc: &Document) -> f64 {
        match self {
            Value::Nodes(_) => parse_number(&self.string_value(doc)),
            Value::Boolean(value) => f64::from(u8::from(*value)),
            Value::Number(value) => *value,
            Value::String(value) => parse_number(value),
        }
    }

    /// XPath `string()` conversion; a node-set yields its first node's value.
    pub fn string_value(&self, doc: &Document) -> String {
        match self {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|&id| doc.string_value(id))
                .unwrap_or_default(),
            Value::Boolean(value) => value.to_string(),
            Value::Number(value) => format_number(*value),
            Value::String(value) => value.clone(),
        }
    }
}

/// Parse a string the way XPath `number()` does: optional minus sign,
/// digits with at most one decimal point, surrounding whitespace allowed.
pub(crate) fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = !body.is_empty()
        && body != "."
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && body.chars().filter(|&c| c == '.').count() <= 1;
    if !well_formed {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Dynamic evaluation context.
#[derive(Clone, Copy)]
pub(crate) struct Context<'a> {
    pub doc: &'a Document,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
    /// Node returned by `current()`: the rule context node.
    pub current: NodeId,
    pub variables: &'a Variables,
}

impl<'a> Context<'a> {
    fn at(&self, node: NodeId, position: usize, size: usize) -> Context<'a> {
        Context {
            node,
            position,
            size,
            ..*self
        }
    }
}

pub(crate) fn evaluate(expr: &Expr, ctx: &Context<'_>) -> XPathResult<Value> {
    match expr {
        Expr::Or(left, right) => Ok(Value::Boolean(
            evaluate(left, ctx)?.boolean_value() || evaluate(right, ctx)?.boolean_value(),
        )),
        Expr::And(left, right) => Ok(Value::Boolean(
            evaluate(left, ctx)?.boolean_value() && evaluate(right, ctx)?.boolean_value(),
        )),
        Expr::Compare(op, left, right) => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            Ok(Value::Boolean(compare(*op, &left, &right, ctx.doc)))
        }
        Expr::Arithmetic(op, left, right) => {
            let a = evaluate(left, ctx)?.number_value(ctx.doc);
            let b = evaluate(right, ctx)?.number_value(ctx.doc);
            Ok(Value::Number(match op {
                ArithOp::Add => a + b,
                ArithOp::Subtract => a - b,
                ArithOp::Multiply => a * b,
                ArithOp::Divide => a / b,
                ArithOp::Modulo => a % b,
            }))
        }
        Expr::Negate(operand) => Ok(Value::Number(-evaluate(operand, ctx)?.number_value(ctx.doc))),
        Expr::Union(left, right) => {
            let mut nodes = expect_nodes(evaluate(left, ctx)?, "|")?;
            nodes.extend(expect_nodes(evaluate(right, ctx)?, "|")?);
            nodes.sort_unstable();
            nodes.dedup();
            Ok(Value::Nodes(nodes))
        }
        Expr::Literal(value) => Ok(Value::String(value.clone())),
        Expr::Number(value) => Ok(Value::Number(*value)),
        Expr::Variable(name) => {
            ctx.variables
                .get(name)
                .cloned()
                .ok_or_else(|| XPathError::UnboundVariable { name: name.clone() })
        }
        Expr::Call(call) => functions::call(call, ctx),
        Expr::Path { start, steps } => {
            let mut nodes = match start {
                PathStart::Root => vec![ctx.doc.root()],
                PathStart::Context => vec![ctx.node],
                PathStart::Expr(base) => expect_nodes(evaluate(base, ctx)?, "/")?,
            };
            for step in steps {
                nodes = apply_step(step, &nodes, ctx)?;
            }
            Ok(Value::Nodes(nodes))
        }
        Expr::Filter { base, predicates } => {
            let nodes = expect_nodes(evaluate(base, ctx)?, "[]")?;
            Ok(Value::Nodes(filter(nodes, predicates, ctx)?))
        }
    }
}

fn expect_nodes(value: Value, operator: &str) -> XPathResult<Vec<NodeId>> {
    match value {
        Value::Nodes(nodes) => Ok(nodes),
        other => Err(XPathError::Type {
            message: format!(
                "operator '{operator}' needs a node-set, got {}",
                other.type_name()
            ),
        }),
    }
}

fn apply_step(step: &Step, input: &[NodeId], ctx: &Context<'_>) -> XPathResult<Vec<NodeId>> {
    let doc = ctx.doc;
    let mut out = Vec::new();
    for &node in input {
        let candidates: Vec<NodeId> = axis_nodes(doc, node, step.axis)
            .into_iter()
            .filter(|&id| matches_test(doc, id, &step.test, step.axis))
            .collect();
        out.extend(filter(candidates, &step.predicates, ctx)?);
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

/// Apply predicates in sequence. Positions follow the order of `nodes`,
/// which is axis order for location steps.
fn filter(mut nodes: Vec<NodeId>, predicates: &[Expr], ctx: &Context<'_>) -> XPathResult<Vec<NodeId>> {
    for predicate in predicates {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (index, &node) in nodes.iter().enumerate() {
            let inner = ctx.at(node, index + 1, size);
            let keep = match evaluate(predicate, &inner)? {
                Value::Number(position) => position == (index + 1) as f64,
                other => other.boolean_value(),
            };
            if keep {
                kept.push(node);
            }
        }
        nodes = kept;
    }
    Ok(nodes)
}

fn ancestors(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = doc.parent(node);
    while let Some(parent) = current {
        out.push(parent);
        current = doc.parent(parent);
    }
    out
}

/// Nodes on `axis` from `node`, in axis order.
fn axis_nodes(doc: &Document, node: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children(node).to_vec(),
        Axis::Descendant => doc.descendants(node),
        Axis::DescendantOrSelf => {
            let mut out = vec![node];
            out.extend(doc.descendants(node));
            out
        }
        Axis::Parent => doc.parent(node).into_iter().collect(),
        Axis::Ancestor => ancestors(doc, node),
        Axis::AncestorOrSelf => {
            let mut out = vec![node];
            out.extend(ancestors(doc, node));
            out
        }
        Axis::FollowingSibling | Axis::PrecedingSibling => {
            if doc.is_attribute(node) {
                return Vec::new();
            }
            let Some(parent) = doc.parent(node) else {
                return Vec::new();
            };
            let siblings = doc.children(parent);
            let Some(index) = siblings.iter().position(|&s| s == node) else {
                return Vec::new();
            };
            if axis == Axis::FollowingSibling {
                siblings[index + 1..].to_vec()
            } else {
                siblings[..index].iter().rev().copied().collect()
            }
        }
        Axis::Following => {
            let end = doc.subtree_end(node);
            doc.node_ids()
                .skip(end.index() + 1)
                .filter(|&id| !doc.is_attribute(id))
                .collect()
        }
        Axis::Preceding => {
            let excluded = ancestors(doc, node);
            let mut out: Vec<NodeId> = doc
                .node_ids()
                .take(node.index())
                .filter(|&id| {
                    !doc.is_attribute(id)
                        && !matches!(doc.kind(id), NodeKind::Root)
                        && !excluded.contains(&id)
                })
                .collect();
            out.reverse();
            out
        }
        Axis::Attribute => doc.attributes(node).to_vec(),
        // Namespace nodes are not materialised.
        Axis::Namespace => Vec::new(),
        Axis::SelfAxis => vec![node],
    }
}

fn matches_test(doc: &Document, id: NodeId, test: &NodeTest, axis: Axis) -> bool {
    let principal = if axis == Axis::Attribute {
        doc.is_attribute(id)
    } else {
        doc.is_element(id)
    };
    match test {
        NodeTest::AnyNode => true,
        NodeTest::Text => matches!(doc.kind(id), NodeKind::Text(_)),
        NodeTest::Comment => matches!(doc.kind(id), NodeKind::Comment(_)),
        NodeTest::ProcessingInstruction(expected) => match doc.kind(id) {
            NodeKind::ProcessingInstruction { target, .. } => {
                expected.as_ref().is_none_or(|expected| expected == target)
            }
            _ => false,
        },
        NodeTest::Wildcard => principal,
        NodeTest::NamespaceWildcard(uri) => {
            principal
                && doc
                    .name(id)
                    .is_some_and(|name| name.namespace.as_deref() == Some(uri.as_str()))
        }
        NodeTest::Name { namespace, local } => {
            principal
                && doc
                    .name(id)
                    .is_some_and(|name| name.local == *local && name.namespace == *namespace)
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value, doc: &Document) -> bool {
    match (left, right) {
        (Value::Nodes(left), Value::Nodes(right)) => {
            let right: Vec<String> = right.iter().map(|&id| doc.string_value(id)).collect();
            left.iter().any(|&id| {
                let value = doc.string_value(id);
                right.iter().any(|other| compare_strings(op, &value, other))
            })
        }
        (Value::Nodes(nodes), other) => compare_node_set(op, nodes, other, doc),
        (other, Value::Nodes(nodes)) => compare_node_set(op.flip(), nodes, other, doc),
        (left, right) => compare_atomic(op, left, right, doc),
    }
}

fn compare_node_set(op: CompareOp, nodes: &[NodeId], other: &Value, doc: &Document) -> bool {
    match other {
        Value::Boolean(_) => compare_atomic(op, &Value::Boolean(!nodes.is_empty()), other, doc),
        Value::Number(number) => nodes
            .iter()
            .any(|&id| compare_numbers(op, parse_number(&doc.string_value(id)), *number)),
        Value::String(text) => nodes
            .iter()
            .any(|&id| compare_strings(op, &doc.string_value(id), text)),
        Value::Nodes(_) => compare(op, &Value::Nodes(nodes.to_vec()), other, doc),
    }
}

fn compare_atomic(op: CompareOp, left: &Value, right: &Value, doc: &Document) -> bool {
    if !op.is_equality() {
        return compare_numbers(op, left.number_value(doc), right.number_value(doc));
    }
    let equal = if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
        left.boolean_value() == right.boolean_value()
    } else if matches!(left, Value::Number(_)) || matches!(right, Value::Number(_)) {
        left.number_value(doc) == right.number_value(doc)
    } else {
        left.string_value(doc) == right.string_value(doc)
    };
    (op == CompareOp::Eq) == equal
}

fn compare_strings(op: CompareOp, left: &str, right: &str) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        _ => compare_numbers(op, parse_number(left), parse_number(right)),
    }
}

fn compare_numbers(op: CompareOp, left: f64, right: f64) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        CompareOp::Lt => left < right,
        CompareOp::LtEq => left <= right,
        CompareOp::Gt => left > right,
        CompareOp::GtEq => left >= right,
    }
}
