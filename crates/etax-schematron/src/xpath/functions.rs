//! Core function library.

use regex::Regex;

use super::ast::Call;
use super::eval::{Context, Value, evaluate, parse_number};
use crate::dom::NodeId;
use crate::error::{XPathError, XPathResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Last,
    Position,
    Count,
    LocalName,
    Name,
    NamespaceUri,
    String,
    Concat,
    StartsWith,
    EndsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    UpperCase,
    LowerCase,
    Boolean,
    Not,
    True,
    False,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
    Exists,
    Empty,
    Matches,
    StringJoin,
    Current,
}

impl Function {
    /// Resolve a function name; the `fn:` prefix is accepted and ignored.
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        let local = name.strip_prefix("fn:").unwrap_or(name);
        Some(match local {
            "last" => Function::Last,
            "position" => Function::Position,
            "count" => Function::Count,
            "local-name" => Function::LocalName,
            "name" => Function::Name,
            "namespace-uri" => Function::NamespaceUri,
            "string" => Function::String,
            "concat" => Function::Concat,
            "starts-with" => Function::StartsWith,
            "ends-with" => Function::EndsWith,
            "contains" => Function::Contains,
            "substring-before" => Function::SubstringBefore,
            "substring-after" => Function::SubstringAfter,
            "substring" => Function::Substring,
            "string-length" => Function::StringLength,
            "normalize-space" => Function::NormalizeSpace,
            "translate" => Function::Translate,
            "upper-case" => Function::UpperCase,
            "lower-case" => Function::LowerCase,
            "boolean" => Function::Boolean,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "number" => Function::Number,
            "sum" => Function::Sum,
            "floor" => Function::Floor,
            "ceiling" => Function::Ceiling,
            "round" => Function::Round,
            "exists" => Function::Exists,
            "empty" => Function::Empty,
            "matches" => Function::Matches,
            "string-join" => Function::StringJoin,
            "current" => Function::Current,
            _ => return None,
        })
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Function::Last => "last",
            Function::Position => "position",
            Function::Count => "count",
            Function::LocalName => "local-name",
            Function::Name => "name",
            Function::NamespaceUri => "namespace-uri",
            Function::String => "string",
            Function::Concat => "concat",
            Function::StartsWith => "starts-with",
            Function::EndsWith => "ends-with",
            Function::Contains => "contains",
            Function::SubstringBefore => "substring-before",
            Function::SubstringAfter => "substring-after",
            Function::Substring => "substring",
            Function::StringLength => "string-length",
            Function::NormalizeSpace => "normalize-space",
            Function::Translate => "translate",
            Function::UpperCase => "upper-case",
            Function::LowerCase => "lower-case",
            Function::Boolean => "boolean",
            Function::Not => "not",
            Function::True => "true",
            Function::False => "false",
            Function::Number => "number",
            Function::Sum => "sum",
            Function::Floor => "floor",
            Function::Ceiling => "ceiling",
            Function::Round => "round",
            Function::Exists => "exists",
            Function::Empty => "empty",
            Function::Matches => "matches",
            Function::StringJoin => "string-join",
            Function::Current => "current",
        }
    }

    fn arity(self) -> (usize, Option<usize>, &'static str) {
        match self {
            Function::Last
            | Function::Position
            | Function::True
            | Function::False
            | Function::Current => (0, Some(0), "0"),
            Function::LocalName
            | Function::Name
            | Function::NamespaceUri
            | Function::String
            | Function::StringLength
            | Function::NormalizeSpace
            | Function::Number => (0, Some(1), "0 or 1"),
            Function::Count
            | Function::UpperCase
            | Function::LowerCase
            | Function::Boolean
            | Function::Not
            | Function::Sum
            | Function::Floor
            | Function::Ceiling
            | Function::Round
            | Function::Exists
            | Function::Empty => (1, Some(1), "1"),
            Function::StartsWith
            | Function::EndsWith
            | Function::Contains
            | Function::SubstringBefore
            | Function::SubstringAfter => (2, Some(2), "2"),
            Function::StringJoin => (1, Some(2), "1 or 2"),
            Function::Substring | Function::Matches => (2, Some(3), "2 or 3"),
            Function::Translate => (3, Some(3), "3"),
            Function::Concat => (2, None, "at least 2"),
        }
    }

    pub(crate) fn check_arity(self, found: usize) -> XPathResult<()> {
        let (min, max, expected) = self.arity();
        if found < min || max.is_some_and(|max| found > max) {
            return Err(XPathError::Arity {
                name: self.name().to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }
}

/// Build a regex for `matches()`; flags `i`, `m`, `s` and `x` are supported.
pub(crate) fn build_regex(pattern: &str, flags: &str) -> XPathResult<Regex> {
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' | 'x' => inline.push(flag),
            other => {
                return Err(XPathError::Type {
                    message: format!("unsupported regex flag '{other}'"),
                });
            }
        }
    }
    let full = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    Regex::new(&full).map_err(|source| XPathError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

pub(crate) fn call(call: &Call, ctx: &Context<'_>) -> XPathResult<Value> {
    let doc = ctx.doc;
    let args = &call.args;
    let string_arg = |index: usize| -> XPathResult<String> {
        Ok(evaluate(&args[index], ctx)?.string_value(doc))
    };
    let number_arg =
        |index: usize| -> XPathResult<f64> { Ok(evaluate(&args[index], ctx)?.number_value(doc)) };
    // Optional single argument defaulting to the context node.
    let string_or_context = || -> XPathResult<String> {
        match args.first() {
            Some(arg) => Ok(evaluate(arg, ctx)?.string_value(doc)),
            None => Ok(doc.string_value(ctx.node)),
        }
    };
    let node_or_context = || -> XPathResult<Option<NodeId>> {
        match args.first() {
            Some(arg) => Ok(node_set(evaluate(arg, ctx)?, call)?.first().copied()),
            None => Ok(Some(ctx.node)),
        }
    };

    let value = match call.function {
        Function::Last => Value::Number(ctx.size as f64),
        Function::Position => Value::Number(ctx.position as f64),
        Function::Count => Value::Number(node_set(evaluate(&args[0], ctx)?, call)?.len() as f64),
        Function::LocalName => Value::String(
            node_or_context()?
                .and_then(|id| doc.name(id))
                .map(|name| name.local.clone())
                .unwrap_or_default(),
        ),
        Function::Name => Value::String(
            node_or_context()?
                .and_then(|id| doc.name(id))
                .map(|name| name.qualified().into_owned())
                .unwrap_or_default(),
        ),
        Function::NamespaceUri => Value::String(
            node_or_context()?
                .and_then(|id| doc.name(id))
                .and_then(|name| name.namespace.clone())
                .unwrap_or_default(),
        ),
        Function::String => Value::String(string_or_context()?),
        Function::Concat => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&evaluate(arg, ctx)?.string_value(doc));
            }
            Value::String(out)
        }
        Function::StartsWith => Value::Boolean(string_arg(0)?.starts_with(&string_arg(1)?)),
        Function::EndsWith => Value::Boolean(string_arg(0)?.ends_with(&string_arg(1)?)),
        Function::Contains => Value::Boolean(string_arg(0)?.contains(&string_arg(1)?)),
        Function::SubstringBefore => {
            let haystack = string_arg(0)?;
            let needle = string_arg(1)?;
            Value::String(
                haystack
                    .find(&needle)
                    .map(|at| haystack[..at].to_string())
                    .unwrap_or_default(),
            )
        }
        Function::SubstringAfter => {
            let haystack = string_arg(0)?;
            let needle = string_arg(1)?;
            Value::String(
                haystack
                    .find(&needle)
                    .map(|at| haystack[at + needle.len()..].to_string())
                    .unwrap_or_default(),
            )
        }
        Function::Substring => {
            let text = string_arg(0)?;
            let start = number_arg(1)?;
            let length = match args.get(2) {
                Some(_) => Some(number_arg(2)?),
                None => None,
            };
            Value::String(substring(&text, start, length))
        }
        Function::StringLength => Value::Number(string_or_context()?.chars().count() as f64),
        Function::NormalizeSpace => Value::String(normalize_space(&string_or_context()?)),
        Function::Translate => {
            let text = string_arg(0)?;
            let from: Vec<char> = string_arg(1)?.chars().collect();
            let to: Vec<char> = string_arg(2)?.chars().collect();
            let translated = text
                .chars()
                .filter_map(|ch| match from.iter().position(|&f| f == ch) {
                    Some(index) => to.get(index).copied(),
                    None => Some(ch),
                })
                .collect();
            Value::String(translated)
        }
        Function::UpperCase => Value::String(string_arg(0)?.to_uppercase()),
        Function::LowerCase => Value::String(string_arg(0)?.to_lowercase()),
        Function::Boolean => Value::Boolean(evaluate(&args[0], ctx)?.boolean_value()),
        Function::Not => Value::Boolean(!evaluate(&args[0], ctx)?.boolean_value()),
        Function::True => Value::Boolean(true),
        Function::False => Value::Boolean(false),
        Function::Number => Value::Number(match args.first() {
            Some(arg) => evaluate(arg, ctx)?.number_value(doc),
            None => parse_number(&doc.string_value(ctx.node)),
        }),
        Function::Sum => {
            let nodes = node_set(evaluate(&args[0], ctx)?, call)?;
            Value::Number(
                nodes
                    .iter()
                    .map(|&id| parse_number(&doc.string_value(id)))
                    .sum(),
            )
        }
        Function::Floor => Value::Number(number_arg(0)?.floor()),
        Function::Ceiling => Value::Number(number_arg(0)?.ceil()),
        Function::Round => Value::Number(round_half_up(number_arg(0)?)),
        Function::Exists => Value::Boolean(match evaluate(&args[0], ctx)? {
            Value::Nodes(nodes) => !nodes.is_empty(),
            _ => true,
        }),
        Function::Empty => Value::Boolean(match evaluate(&args[0], ctx)? {
            Value::Nodes(nodes) => nodes.is_empty(),
            _ => false,
        }),
        Function::Matches => {
            let input = string_arg(0)?;
            let matched = match &call.regex {
                Some(regex) => regex.is_match(&input),
                None => {
                    let pattern = string_arg(1)?;
                    let flags = match args.get(2) {
                        Some(_) => string_arg(2)?,
                        None => String::new(),
                    };
                    build_regex(&pattern, &flags)?.is_match(&input)
                }
            };
            Value::Boolean(matched)
        }
        Function::StringJoin => {
            let items: Vec<String> = match evaluate(&args[0], ctx)? {
                Value::Nodes(nodes) => nodes.iter().map(|&id| doc.string_value(id)).collect(),
                other => vec![other.string_value(doc)],
            };
            let separator = match args.get(1) {
                Some(_) => string_arg(1)?,
                None => String::new(),
            };
            Value::String(items.join(&separator))
        }
        Function::Current => Value::Nodes(vec![ctx.current]),
    };
    Ok(value)
}

fn node_set(value: Value, call: &Call) -> XPathResult<Vec<NodeId>> {
    match value {
        Value::Nodes(nodes) => Ok(nodes),
        other => Err(XPathError::Type {
            message: format!(
                "{}() expects a node-set, got {}",
                call.function.name(),
                other.type_name()
            ),
        }),
    }
}

/// Collapse whitespace runs to one space and trim both ends.
pub(crate) fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// XPath `round()`: halves round towards positive infinity.
fn round_half_up(value: f64) -> f64 {
    if value.is_nan() || value.is_infinite() {
        return value;
    }
    let rounded = (value + 0.5).floor();
    if rounded == 0.0 && value < 0.0 {
        -0.0
    } else {
        rounded
    }
}

/// XPath 1.0 `substring()` with its rounding rules for fractional and
/// non-finite arguments.
fn substring(text: &str, start: f64, length: Option<f64>) -> String {
    let first = round_half_up(start);
    let end = match length {
        Some(length) => first + round_half_up(length),
        None => f64::INFINITY,
    };
    if first.is_nan() || end.is_nan() {
        return String::new();
    }
    text.chars()
        .enumerate()
        .filter(|&(index, _)| {
            let position = (index + 1) as f64;
            position >= first && position < end
        })
        .map(|(_, ch)| ch)
        .collect()
}
