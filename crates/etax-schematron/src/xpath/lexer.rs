//! XPath tokenizer.
//!
//! Applies the XPath lexical disambiguation rule: after a token that can end
//! an operand, `*` is multiplication and `and`/`or`/`div`/`mod` (plus the
//! XPath 2 value comparisons) are operators; elsewhere they are names.

use crate::error::{XPathError, XPathResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    At,
    Comma,
    Pipe,
    Dot,
    DotDot,
    ColonColon,
    Plus,
    Minus,
    Multiply,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Div,
    Mod,
    Literal(String),
    Number(f64),
    Variable(String),
    /// NCName, QName, `*` or `prefix:*`.
    Name(String),
}

impl Token {
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::RParen
                | Token::RBracket
                | Token::Dot
                | Token::DotDot
                | Token::Literal(_)
                | Token::Number(_)
                | Token::Variable(_)
                | Token::Name(_)
        )
    }
}

/// Token with its byte offset in the source expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

pub(crate) fn tokenize(expr: &str) -> XPathResult<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = expr.char_indices().collect();
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, ch) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);
        let operator_mode = tokens.last().is_some_and(|t| t.token.ends_operand());

        let token = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if next == Some('/') => {
                i += 2;
                Token::DoubleSlash
            }
            '/' => {
                i += 1;
                Token::Slash
            }
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '[' => {
                i += 1;
                Token::LBracket
            }
            ']' => {
                i += 1;
                Token::RBracket
            }
            '@' => {
                i += 1;
                Token::At
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '|' => {
                i += 1;
                Token::Pipe
            }
            '+' => {
                i += 1;
                Token::Plus
            }
            '-' => {
                i += 1;
                Token::Minus
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '!' if next == Some('=') => {
                i += 2;
                Token::NotEq
            }
            '<' if next == Some('=') => {
                i += 2;
                Token::LtEq
            }
            '<' => {
                i += 1;
                Token::Lt
            }
            '>' if next == Some('=') => {
                i += 2;
                Token::GtEq
            }
            '>' => {
                i += 1;
                Token::Gt
            }
            ':' if next == Some(':') => {
                i += 2;
                Token::ColonColon
            }
            '*' if operator_mode => {
                i += 1;
                Token::Multiply
            }
            '*' => {
                i += 1;
                Token::Name("*".to_string())
            }
            '.' if next == Some('.') => {
                i += 2;
                Token::DotDot
            }
            '.' if !next.is_some_and(|c| c.is_ascii_digit()) => {
                i += 1;
                Token::Dot
            }
            '"' | '\'' => {
                let quote = ch;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].1 != quote {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(XPathError::Syntax {
                        expr: expr.to_string(),
                        offset,
                        message: "unterminated string literal".to_string(),
                    });
                }
                let literal: String = chars[start..end].iter().map(|&(_, c)| c).collect();
                i = end + 1;
                Token::Literal(literal)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                let value = text.parse::<f64>().map_err(|_| XPathError::Syntax {
                    expr: expr.to_string(),
                    offset,
                    message: format!("invalid number '{text}'"),
                })?;
                Token::Number(value)
            }
            '$' => {
                i += 1;
                let (name, end) = read_qname(&chars, i);
                if name.is_empty() {
                    return Err(XPathError::Syntax {
                        expr: expr.to_string(),
                        offset,
                        message: "expected variable name after '$'".to_string(),
                    });
                }
                i = end;
                Token::Variable(name)
            }
            c if is_name_start(c) => {
                let (name, end) = read_qname(&chars, i);
                i = end;
                if operator_mode {
                    match name.as_str() {
                        "and" => Token::And,
                        "or" => Token::Or,
                        "div" => Token::Div,
                        "mod" => Token::Mod,
                        "eq" => Token::Eq,
                        "ne" => Token::NotEq,
                        "lt" => Token::Lt,
                        "le" => Token::LtEq,
                        "gt" => Token::Gt,
                        "ge" => Token::GtEq,
                        _ => Token::Name(name),
                    }
                } else {
                    Token::Name(name)
                }
            }
            other => {
                return Err(XPathError::Lex {
                    expr: expr.to_string(),
                    offset,
                    ch: other,
                });
            }
        };
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

/// Read `ncname`, `prefix:ncname` or `prefix:*` starting at `start`.
fn read_qname(chars: &[(usize, char)], start: usize) -> (String, usize) {
    let mut i = start;
    if !chars.get(i).is_some_and(|&(_, c)| is_name_start(c)) {
        return (String::new(), i);
    }
    while i < chars.len() && is_name_char(chars[i].1) {
        i += 1;
    }
    // A single ':' followed by a name start or '*' continues a QName; '::' is an axis.
    if chars.get(i).is_some_and(|&(_, c)| c == ':')
        && chars.get(i + 1).is_some_and(|&(_, c)| is_name_start(c) || c == '*')
    {
        i += 1;
        if chars[i].1 == '*' {
            i += 1;
        } else {
            while i < chars.len() && is_name_char(chars[i].1) {
                i += 1;
            }
        }
    }
    let name = chars[start..i].iter().map(|&(_, c)| c).collect();
    (name, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(expr: &str) -> Vec<Token> {
        tokenize(expr)
            .expect("tokenize")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn star_is_name_test_at_operand_start() {
        assert_eq!(
            kinds("*/ram:ID"),
            vec![
                Token::Name("*".into()),
                Token::Slash,
                Token::Name("ram:ID".into())
            ]
        );
    }

    #[test]
    fn star_is_multiply_after_operand() {
        assert_eq!(
            kinds("2 * 3"),
            vec![Token::Number(2.0), Token::Multiply, Token::Number(3.0)]
        );
    }

    #[test]
    fn operator_names_depend_on_position() {
        assert_eq!(
            kinds("and and or"),
            vec![Token::Name("and".into()), Token::And, Token::Name("or".into())]
        );
    }

    #[test]
    fn hyphenated_function_names_stay_whole() {
        assert_eq!(
            kinds("normalize-space(.)"),
            vec![
                Token::Name("normalize-space".into()),
                Token::LParen,
                Token::Dot,
                Token::RParen
            ]
        );
    }

    #[test]
    fn axis_separator_is_not_a_qname() {
        assert_eq!(
            kinds("child::ram:ID"),
            vec![
                Token::Name("child".into()),
                Token::ColonColon,
                Token::Name("ram:ID".into())
            ]
        );
    }

    #[test]
    fn literals_and_variables() {
        assert_eq!(
            kinds("$code = 'T01'"),
            vec![
                Token::Variable("code".into()),
                Token::Eq,
                Token::Literal("T01".into())
            ]
        );
        assert_eq!(kinds(".5"), vec![Token::Number(0.5)]);
    }

    #[test]
    fn unterminated_literal_is_an_error() {
        assert!(matches!(
            tokenize("'open"),
            Err(XPathError::Syntax { .. })
        ));
    }

    #[test]
    fn stray_character_is_an_error() {
        assert!(matches!(
            tokenize("a # b"),
            Err(XPathError::Lex { ch: '#', .. })
        ));
    }
}
