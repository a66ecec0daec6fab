//! Tokenizer for the filter expression language

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A token plus its byte offset in the input, for parse-error locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let pos = i;
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
            '(' => {
                tokens.push(Spanned { token: Token::LParen, pos });
                i += 1;
            }
            ')' => {
                tokens.push(Spanned { token: Token::RParen, pos });
                i += 1;
            }
            '[' => {
                tokens.push(Spanned { token: Token::LBracket, pos });
                i += 1;
            }
            ']' => {
                tokens.push(Spanned { token: Token::RBracket, pos });
                i += 1;
            }
            '.' => {
                tokens.push(Spanned { token: Token::Dot, pos });
                i += 1;
            }
            '=' => {
                tokens.push(Spanned { token: Token::Eq, pos });
                i += 1;
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned { token: Token::Ne, pos });
                    i += 2;
                } else {
                    return Err(Error::query(pos, "expected '=' after '!'"));
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned { token: Token::Le, pos });
                    i += 2;
                } else {
                    tokens.push(Spanned { token: Token::Lt, pos });
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned { token: Token::Ge, pos });
                    i += 2;
                } else {
                    tokens.push(Spanned { token: Token::Gt, pos });
                    i += 1;
                }
            }
            '"' | '\'' => {
                let (text, next) = scan_string(input, i, c)?;
                tokens.push(Spanned { token: Token::Str(text), pos });
                i = next;
            }
            '-' | '0'..='9' => {
                let (number, next) = scan_number(input, i)?;
                tokens.push(Spanned { token: Token::Number(number), pos });
                i = next;
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < bytes.len() {
                    let c = bytes[i] as char;
                    if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Spanned {
                    token: Token::Ident(input[start..i].to_string()),
                    pos,
                });
            }
            other => {
                return Err(Error::query(pos, format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

fn scan_string(input: &str, start: usize, quote: char) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut chars = input[start + 1..].char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => return Err(Error::query(start, "unterminated escape in string")),
            },
            c if c == quote => return Ok((out, start + 1 + offset + c.len_utf8())),
            c => out.push(c),
        }
    }
    Err(Error::query(start, "unterminated string"))
}

fn scan_number(input: &str, start: usize) -> Result<(f64, usize)> {
    let bytes = input.as_bytes();
    let mut i = start;
    if bytes[i] == b'-' {
        i += 1;
    }
    let mut seen_dot = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => i += 1,
            // A '.' is only part of the number when digits follow;
            // otherwise it is a path separator (e.g. `items[0].id`).
            b'.' if !seen_dot && matches!(bytes.get(i + 1), Some(b'0'..=b'9')) => {
                seen_dot = true;
                i += 1;
            }
            _ => break,
        }
    }
    input[start..i]
        .parse()
        .map(|n| (n, i))
        .map_err(|_| Error::query(start, format!("invalid number '{}'", &input[start..i])))
}
