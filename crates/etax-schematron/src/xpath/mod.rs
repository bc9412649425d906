//! XPath 1.0 subset used by Schematron rule bundles.
//!
//! Expressions are compiled once against a prefix map and then evaluated
//! many times. Besides the XPath 1.0 core library a handful of XPath 2.0
//! functions common in e-Tax bundles are available (`exists`, `empty`,
//! `matches`, `string-join`, `upper-case`, `lower-case`, `ends-with`) along
//! with the value comparison keywords `eq`, `ne`, `lt`, `le`, `gt`, `ge`.
//!
//! ```
//! use etax_schematron::Document;
//! use etax_schematron::xpath::{Namespaces, Variables, XPath};
//!
//! let doc = Document::parse("<a><b>1</b><b>2</b></a>").unwrap();
//! let expr = XPath::compile("sum(/a/b) = 3", &Namespaces::new()).unwrap();
//! let holds = expr
//!     .evaluate_boolean(&doc, doc.root(), &Variables::new())
//!     .unwrap();
//! assert!(holds);
//! ```

mod ast;
mod eval;
mod functions;
mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;

pub use eval::Value;

use ast::{Axis, Expr, NodeTest, PathStart, Step};
use eval::Context;

use crate::dom::{Document, NodeId};
use crate::error::XPathResult;

pub(crate) use functions::normalize_space;

/// Prefix to namespace URI bindings visible to compiled expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    bindings: HashMap<String, String>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Variable bindings (`$name`) in scope during evaluation.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, Value>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, shadowing any earlier binding.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// A compiled expression.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    /// Compile `source`. Prefixes, function names and arities are checked
    /// here; only type errors and unbound variables surface at run time.
    pub fn compile(source: &str, namespaces: &Namespaces) -> XPathResult<Self> {
        let expr = parser::parse(source, namespaces)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Compile a rule context pattern. Relative location paths match at any
    /// depth, so `ram:ID` behaves like `//ram:ID`.
    pub fn compile_pattern(source: &str, namespaces: &Namespaces) -> XPathResult<Self> {
        let expr = anchor_pattern(parser::parse(source, namespaces)?);
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with `node` as both context node and `current()`.
    pub fn evaluate(
        &self,
        doc: &Document,
        node: NodeId,
        variables: &Variables,
    ) -> XPathResult<Value> {
        let ctx = Context {
            doc,
            node,
            position: 1,
            size: 1,
            current: node,
            variables,
        };
        eval::evaluate(&self.expr, &ctx)
    }

    pub fn evaluate_boolean(
        &self,
        doc: &Document,
        node: NodeId,
        variables: &Variables,
    ) -> XPathResult<bool> {
        Ok(self.evaluate(doc, node, variables)?.boolean_value())
    }

    pub fn evaluate_string(
        &self,
        doc: &Document,
        node: NodeId,
        variables: &Variables,
    ) -> XPathResult<String> {
        Ok(self.evaluate(doc, node, variables)?.string_value(doc))
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn anchor_pattern(expr: Expr) -> Expr {
    match expr {
        Expr::Union(left, right) => Expr::Union(
            Box::new(anchor_pattern(*left)),
            Box::new(anchor_pattern(*right)),
        ),
        Expr::Path {
            start: PathStart::Context,
            steps,
        } => {
            let mut anchored = vec![Step {
                axis: Axis::DescendantOrSelf,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            }];
            anchored.extend(steps);
            Expr::Path {
                start: PathStart::Root,
                steps: anchored,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XPathError;

    const INVOICE: &str = r#"<rsm:Invoice xmlns:rsm="urn:rsm" xmlns:ram="urn:ram">
  <ram:ID>INV-1</ram:ID>
  <ram:Line seq="1"><ram:Amount>100.50</ram:Amount></ram:Line>
  <ram:Line seq="2"><ram:Amount>49.50</ram:Amount></ram:Line>
  <ram:Line seq="3"><ram:Amount>abc</ram:Amount></ram:Line>
  <!-- note -->
</rsm:Invoice>"#;

    fn namespaces() -> Namespaces {
        let mut ns = Namespaces::new();
        ns.insert("rsm", "urn:rsm");
        ns.insert("ram", "urn:ram");
        ns
    }

    fn eval(doc: &Document, source: &str) -> Value {
        XPath::compile(source, &namespaces())
            .expect("compile")
            .evaluate(doc, doc.root(), &Variables::new())
            .expect("evaluate")
    }

    fn eval_str(doc: &Document, source: &str) -> String {
        eval(doc, source).string_value(doc)
    }

    fn eval_bool(doc: &Document, source: &str) -> bool {
        eval(doc, source).boolean_value()
    }

    fn doc() -> Document {
        Document::parse(INVOICE).expect("parse")
    }

    #[test]
    fn location_paths_select_in_document_order() {
        let doc = doc();
        assert_eq!(eval_str(&doc, "/rsm:Invoice/ram:ID"), "INV-1");
        assert_eq!(eval_str(&doc, "count(//ram:Line)"), "3");
        assert_eq!(eval_str(&doc, "//ram:Line[2]/@seq"), "2");
        assert_eq!(eval_str(&doc, "//ram:Line[last()]/@seq"), "3");
        assert_eq!(eval_str(&doc, "count(//ram:Line[@seq > 1])"), "2");
    }

    #[test]
    fn unprefixed_names_do_not_match_namespaced_elements() {
        let doc = doc();
        assert_eq!(eval_str(&doc, "count(//ID)"), "0");
        assert_eq!(eval_str(&doc, "count(//*[local-name() = 'ID'])"), "1");
        assert_eq!(eval_str(&doc, "count(/rsm:Invoice/ram:*)"), "4");
    }

    #[test]
    fn reverse_axes_count_from_the_context_node() {
        let doc = doc();
        assert_eq!(
            eval_str(&doc, "//ram:Line[3]/preceding-sibling::ram:Line[1]/@seq"),
            "2"
        );
        assert_eq!(
            eval_str(&doc, "name(//ram:Amount[1]/ancestor::*[last()])"),
            "rsm:Invoice"
        );
        assert_eq!(eval_str(&doc, "count(//ram:Line[2]/following::ram:Amount)"), "1");
        assert_eq!(eval_str(&doc, "count(//ram:Line[2]/preceding::ram:Amount)"), "1");
    }

    #[test]
    fn node_type_tests() {
        let doc = doc();
        assert_eq!(eval_str(&doc, "count(/rsm:Invoice/comment())"), "1");
        assert_eq!(eval_str(&doc, "normalize-space(/rsm:Invoice/comment())"), "note");
        assert!(eval_bool(&doc, "/rsm:Invoice/ram:ID/text() = 'INV-1'"));
    }

    #[test]
    fn general_comparison_is_existential() {
        let doc = doc();
        assert!(eval_bool(&doc, "//ram:Line/@seq = 2"));
        assert!(eval_bool(&doc, "//ram:Line/@seq != 2"));
        assert!(!eval_bool(&doc, "//ram:Missing = ''"));
        assert!(eval_bool(&doc, "//ram:Amount > 100"));
        assert!(eval_bool(&doc, "5 > //ram:Line/@seq"));
    }

    #[test]
    fn arithmetic_and_numbers() {
        let doc = doc();
        assert_eq!(eval_str(&doc, "//ram:Line[1]/ram:Amount + //ram:Line[2]/ram:Amount"), "150");
        assert_eq!(eval_str(&doc, "7 mod 3"), "1");
        assert_eq!(eval_str(&doc, "-7 div 2"), "-3.5");
        assert_eq!(eval_str(&doc, "sum(//ram:Amount)"), "NaN");
        assert_eq!(eval_str(&doc, "sum(//ram:Line[position() < 3]/ram:Amount)"), "150");
        assert_eq!(eval_str(&doc, "round(2.5) + floor(1.9) + ceiling(1.1)"), "6");
    }

    #[test]
    fn string_functions() {
        let doc = doc();
        assert_eq!(eval_str(&doc, "concat('a', 'b', 'c')"), "abc");
        assert_eq!(eval_str(&doc, "substring-before('2024-01-05', '-')"), "2024");
        assert_eq!(eval_str(&doc, "substring-after('2024-01-05', '-')"), "01-05");
        assert_eq!(eval_str(&doc, "translate('abc', 'abc', 'AB')"), "AB");
        assert_eq!(eval_str(&doc, "upper-case('thb')"), "THB");
        assert_eq!(eval_str(&doc, "string-length('ภาษี')"), "4");
        assert_eq!(eval_str(&doc, "string-join(//ram:Line/@seq, ',')"), "1,2,3");
        assert!(eval_bool(&doc, "starts-with(//ram:ID, 'INV') and ends-with(//ram:ID, '-1')"));
    }

    #[test]
    fn xpath2_helpers() {
        let doc = doc();
        assert!(eval_bool(&doc, "exists(//ram:ID)"));
        assert!(eval_bool(&doc, "empty(//ram:Missing)"));
        assert!(eval_bool(&doc, "matches(//ram:ID, '^INV-[0-9]+$')"));
        assert!(eval_bool(&doc, "//ram:ID eq 'INV-1'"));
        assert!(eval_bool(&doc, "count(//ram:Line) ge 3"));
    }

    #[test]
    fn union_merges_in_document_order() {
        let doc = doc();
        assert_eq!(eval_str(&doc, "count(//ram:ID | //ram:Line | //ram:ID)"), "4");
        assert_eq!(eval_str(&doc, "local-name((//ram:Line | //ram:ID)[1])"), "ID");
    }

    #[test]
    fn variables_and_current() {
        let doc = doc();
        let mut vars = Variables::new();
        vars.insert("limit", Value::Number(100.0));
        let expr = XPath::compile("count(//ram:Amount[. > $limit])", &namespaces()).expect("compile");
        assert_eq!(
            expr.evaluate_string(&doc, doc.root(), &vars).expect("evaluate"),
            "1"
        );

        let line = match eval(&doc, "//ram:Line[2]") {
            Value::Nodes(nodes) => nodes[0],
            other => panic!("expected nodes, got {other:?}"),
        };
        let expr = XPath::compile("count(//ram:Line[@seq < current()/@seq])", &namespaces())
            .expect("compile");
        assert_eq!(
            expr.evaluate_string(&doc, line, &vars).expect("evaluate"),
            "1"
        );
    }

    #[test]
    fn unbound_variable_is_a_runtime_error() {
        let doc = doc();
        let expr = XPath::compile("$missing", &namespaces()).expect("compile");
        assert!(matches!(
            expr.evaluate(&doc, doc.root(), &Variables::new()),
            Err(XPathError::UnboundVariable { .. })
        ));
    }

    #[test]
    fn node_set_functions_reject_atomic_arguments() {
        let doc = doc();
        let expr = XPath::compile("count('x')", &namespaces()).expect("compile");
        assert!(matches!(
            expr.evaluate(&doc, doc.root(), &Variables::new()),
            Err(XPathError::Type { .. })
        ));
    }

    #[test]
    fn patterns_match_at_any_depth() {
        let doc = doc();
        let pattern = XPath::compile_pattern("ram:Line/ram:Amount | ram:ID", &namespaces())
            .expect("compile");
        let value = pattern
            .evaluate(&doc, doc.root(), &Variables::new())
            .expect("evaluate");
        assert_eq!(value.as_nodes().map(<[NodeId]>::len), Some(4));

        let rooted = XPath::compile_pattern("/rsm:Invoice", &namespaces()).expect("compile");
        let value = rooted
            .evaluate(&doc, doc.root(), &Variables::new())
            .expect("evaluate");
        assert_eq!(value.as_nodes().map(<[NodeId]>::len), Some(1));
    }
}
