use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

const OPERATORS: [&str; 13] = [
    "//", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "<", ">", "=",
];

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '(' => push(&mut tokens, &mut pos, Token::LParen),
            ')' => push(&mut tokens, &mut pos, Token::RParen),
            '[' => push(&mut tokens, &mut pos, Token::LBracket),
            ']' => push(&mut tokens, &mut pos, Token::RBracket),
            ',' => push(&mut tokens, &mut pos, Token::Comma),
            '.' if !chars.get(pos + 1).is_some_and(char::is_ascii_digit) => {
                push(&mut tokens, &mut pos, Token::Dot)
            }
            '\'' | '"' => {
                let (text, next) = string_literal(source, &chars, pos)?;
                tokens.push(Token::Str(text));
                pos = next;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let literal: String = chars[start..pos].iter().collect();
                let token = if literal.contains('.') {
                    literal.parse().map(Token::Float).ok()
                } else {
                    literal.parse().map(Token::Int).ok()
                };
                tokens.push(token.ok_or_else(|| {
                    Error::syntax(source, format!("invalid number '{literal}'"))
                })?);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            }
            _ => {
                let rest: String = chars[pos..chars.len().min(pos + 2)].iter().collect();
                let op = OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or_else(|| Error::syntax(source, format!("unexpected character '{c}'")))?;
                if *op == "=" {
                    return Err(Error::syntax(source, "assignment is not an expression"));
                }
                tokens.push(Token::Op(*op));
                pos += op.len();
            }
        }
    }
    Ok(tokens)
}

fn push(tokens: &mut Vec<Token>, pos: &mut usize, token: Token) {
    tokens.push(token);
    *pos += 1;
}

/// Read a quoted literal starting at `start`; returns the text and the
/// position after the closing quote.
fn string_literal(source: &str, chars: &[char], start: usize) -> Result<(String, usize)> {
    let quote = chars[start];
    let mut text = String::new();
    let mut pos = start + 1;
    while pos < chars.len() {
        match chars[pos] {
            '\\' if pos + 1 < chars.len() => {
                text.push(match chars[pos + 1] {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                pos += 2;
            }
            c if c == quote => return Ok((text, pos + 1)),
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }
    Err(Error::syntax(source, "unterminated string"))
}
