//! Recursive-descent parser producing [`Expr`] trees.
//!
//! Precedence, loosest first: `or`, `and`, equality, relational, additive,
//! multiplicative, unary minus, union, path.

use regex::Regex;

use super::Namespaces;
use super::ast::{ArithOp, Axis, Call, CompareOp, Expr, NodeTest, PathStart, Step};
use super::functions::{Function, build_regex};
use super::lexer::{Spanned, Token, tokenize};
use crate::error::{XPathError, XPathResult};

pub(crate) fn parse(source: &str, namespaces: &Namespaces) -> XPathResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        namespaces,
    };
    if parser.tokens.is_empty() {
        return Err(parser.error("empty expression"));
    }
    let expr = parser.or_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing tokens"));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    namespaces: &'a Namespaces,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> XPathResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn error(&self, message: &str) -> XPathError {
        let offset = self
            .tokens
            .get(self.pos)
            .map(|s| s.offset)
            .unwrap_or(self.source.len());
        XPathError::Syntax {
            expr: self.source.to_string(),
            offset,
            message: message.to_string(),
        }
    }

    fn or_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.equality_expr()?;
        while self.eat(&Token::And) {
            let right = self.equality_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::NotEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.relational_expr()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn relational_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::LtEq) => CompareOp::LtEq,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::GtEq) => CompareOp::GtEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive_expr()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn additive_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative_expr()?;
            left = Expr::Arithmetic(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => ArithOp::Multiply,
                Some(Token::Div) => ArithOp::Divide,
                Some(Token::Mod) => ArithOp::Modulo,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary_expr()?;
            left = Expr::Arithmetic(op, Box::new(left), Box::new(right));
        }
    }

    fn unary_expr(&mut self) -> XPathResult<Expr> {
        if self.eat(&Token::Minus) {
            let operand = self.unary_expr()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn path_expr(&mut self) -> XPathResult<Expr> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                let steps = if self.at_step_start() {
                    self.relative_steps()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path {
                    start: PathStart::Root,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let mut steps = vec![descendant_or_self_step()];
                steps.extend(self.relative_steps()?);
                Ok(Expr::Path {
                    start: PathStart::Root,
                    steps,
                })
            }
            _ if self.at_filter_start() => {
                let base = self.primary_expr()?;
                let mut predicates = Vec::new();
                while self.peek() == Some(&Token::LBracket) {
                    predicates.push(self.predicate()?);
                }
                let filtered = if predicates.is_empty() {
                    base
                } else {
                    Expr::Filter {
                        base: Box::new(base),
                        predicates,
                    }
                };
                let mut steps = Vec::new();
                match self.peek() {
                    Some(Token::Slash) => {
                        self.pos += 1;
                        steps = self.relative_steps()?;
                    }
                    Some(Token::DoubleSlash) => {
                        self.pos += 1;
                        steps.push(descendant_or_self_step());
                        steps.extend(self.relative_steps()?);
                    }
                    _ => {}
                }
                if steps.is_empty() {
                    Ok(filtered)
                } else {
                    Ok(Expr::Path {
                        start: PathStart::Expr(Box::new(filtered)),
                        steps,
                    })
                }
            }
            _ if self.at_step_start() => Ok(Expr::Path {
                start: PathStart::Context,
                steps: self.relative_steps()?,
            }),
            None => Err(self.error("unexpected end of expression")),
            _ => Err(self.error("expected an expression")),
        }
    }

    fn at_filter_start(&self) -> bool {
        match self.peek() {
            Some(Token::Variable(_) | Token::LParen | Token::Literal(_) | Token::Number(_)) => {
                true
            }
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen) && !is_node_type(name)
            }
            _ => false,
        }
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn relative_steps(&mut self) -> XPathResult<Vec<Step>> {
        let mut steps = vec![self.step()?];
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                    steps.push(self.step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(descendant_or_self_step());
                    steps.push(self.step()?);
                }
                _ => return Ok(steps),
            }
        }
    }

    fn step(&mut self) -> XPathResult<Step> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::ColonColon)) =
            (self.peek(), self.peek_at(1))
        {
            let axis = Axis::from_name(name)
                .ok_or_else(|| self.error(&format!("unknown axis '{name}'")))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.node_test()?;
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            predicates.push(self.predicate()?);
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> XPathResult<NodeTest> {
        let Some(Token::Name(name)) = self.peek().cloned() else {
            return Err(self.error("expected a node test"));
        };
        self.pos += 1;

        if is_node_type(&name) && self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let test = match name.as_str() {
                "node" => NodeTest::AnyNode,
                "text" => NodeTest::Text,
                "comment" => NodeTest::Comment,
                _ => match self.peek().cloned() {
                    Some(Token::Literal(target)) => {
                        self.pos += 1;
                        NodeTest::ProcessingInstruction(Some(target))
                    }
                    _ => NodeTest::ProcessingInstruction(None),
                },
            };
            self.expect(&Token::RParen, "')'")?;
            return Ok(test);
        }

        if name == "*" {
            return Ok(NodeTest::Wildcard);
        }
        match name.split_once(':') {
            Some((prefix, "*")) => Ok(NodeTest::NamespaceWildcard(self.resolve(prefix)?)),
            Some((prefix, local)) => Ok(NodeTest::Name {
                namespace: Some(self.resolve(prefix)?),
                local: local.to_string(),
            }),
            None => Ok(NodeTest::Name {
                namespace: None,
                local: name,
            }),
        }
    }

    fn resolve(&self, prefix: &str) -> XPathResult<String> {
        self.namespaces
            .get(prefix)
            .map(str::to_string)
            .ok_or_else(|| XPathError::UndeclaredPrefix {
                prefix: prefix.to_string(),
            })
    }

    fn predicate(&mut self) -> XPathResult<Expr> {
        self.expect(&Token::LBracket, "'['")?;
        let expr = self.or_expr()?;
        self.expect(&Token::RBracket, "']'")?;
        Ok(expr)
    }

    fn primary_expr(&mut self) -> XPathResult<Expr> {
        match self.advance() {
            Some(Token::Variable(name)) => Ok(Expr::Variable(name)),
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Name(name)) => self.function_call(&name),
            other => {
                if other.is_some() {
                    self.pos -= 1;
                }
                Err(self.error("expected a primary expression"))
            }
        }
    }

    fn function_call(&mut self, name: &str) -> XPathResult<Expr> {
        let function = Function::lookup(name).ok_or_else(|| XPathError::UnknownFunction {
            name: name.to_string(),
        })?;
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.or_expr()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RParen, "')' or ','")?;
                break;
            }
        }
        function.check_arity(args.len())?;
        let regex = precompile_regex(function, &args)?;
        Ok(Expr::Call(Call {
            function,
            args,
            regex,
        }))
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(
        name,
        "node" | "text" | "comment" | "processing-instruction"
    )
}

fn descendant_or_self_step() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
    }
}

fn precompile_regex(function: Function, args: &[Expr]) -> XPathResult<Option<Regex>> {
    if function != Function::Matches {
        return Ok(None);
    }
    let pattern = match args.get(1) {
        Some(Expr::Literal(pattern)) => pattern,
        _ => return Ok(None),
    };
    let flags = match args.get(2) {
        None => "",
        Some(Expr::Literal(flags)) => flags.as_str(),
        Some(_) => return Ok(None),
    };
    build_regex(pattern, flags).map(Some)
}
