//! Lexer and recursive-descent parser for `{{ }}` templates.
//!
//! The expression grammar is deliberately small:
//!
//! ```text
//! pipeline := call | operand
//! call     := IDENT operand*
//! operand  := primary FIELD*          (fields must touch the primary)
//! primary  := "." | FIELD | "(" pipeline ")" | STRING | INT
//! ```
//!
//! `FIELD` is a `.Name` token, so `.App.Repo` lexes as two fields rooted at
//! the context.

use std::fmt;

use crate::error::{Error, Result};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text copied to the output
    Text(String),
    /// A `{{ }}` action
    Action {
        /// Body between the delimiters, kept for error messages
        source: String,
        /// Parsed expression
        expr: Expr,
    },
}

/// Parsed expression inside an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `.` - the context root
    Dot,
    /// `<base>.Name`
    Field { base: Box<Expr>, name: String },
    /// `func arg...`
    Call { func: String, args: Vec<Expr> },
    /// `"text"`
    Str(String),
    /// `42`
    Int(i64),
}

impl Expr {
    fn field(base: Expr, name: String) -> Self {
        Expr::Field {
            base: Box::new(base),
            name,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Dot => write!(f, "."),
            Expr::Field { base, name } => match base.as_ref() {
                Expr::Dot => write!(f, ".{name}"),
                Expr::Field { .. } => write!(f, "{base}.{name}"),
                other => write!(f, "({other}).{name}"),
            },
            Expr::Call { func, args } => {
                write!(f, "{func}")?;
                for arg in args {
                    match arg {
                        Expr::Call { .. } => write!(f, " ({arg})")?,
                        _ => write!(f, " {arg}")?,
                    }
                }
                Ok(())
            }
            Expr::Str(s) => write!(f, "{}", quote(s)),
            Expr::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Quote a string as a template string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Split template source into text and parsed actions.
pub fn parse_segments(source: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut consumed = 0;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let body_start = start + OPEN.len();
        let body_len = find_close(&rest[body_start..]).ok_or(Error::Unclosed {
            offset: consumed + start,
        })?;
        let body = &rest[body_start..body_start + body_len];
        segments.push(Segment::Action {
            source: body.to_string(),
            expr: parse_expr(body)?,
        });

        let next = body_start + body_len + CLOSE.len();
        consumed += next;
        rest = &rest[next..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    Ok(segments)
}

/// Find the closing delimiter, skipping over string literals.
fn find_close(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'}' if !in_string && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Parse the body of a single action.
pub fn parse_expr(body: &str) -> Result<Expr> {
    let tokens = lex(body)?;
    let mut parser = Parser {
        body,
        tokens,
        pos: 0,
    };
    let expr = parser.pipeline()?;
    if let Some(tok) = parser.peek() {
        return Err(parser.error(format!("unexpected {}", tok.kind)));
    }
    Ok(expr)
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Dot,
    Field(String),
    Ident(String),
    Str(String),
    Int(i64),
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Dot => write!(f, "\".\""),
            TokenKind::Field(name) => write!(f, "field .{name}"),
            TokenKind::Ident(name) => write!(f, "identifier {name}"),
            TokenKind::Str(s) => write!(f, "string {}", quote(s)),
            TokenKind::Int(n) => write!(f, "number {n}"),
            TokenKind::LParen => write!(f, "\"(\""),
            TokenKind::RParen => write!(f, "\")\""),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// Whitespace separates this token from the previous one
    spaced: bool,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn lex(body: &str) -> Result<Vec<Token>> {
    let syntax = |message: String| Error::Syntax {
        expr: body.to_string(),
        message,
    };

    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();
    let mut spaced = true;

    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            spaced = true;
            continue;
        }

        let kind = match c {
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            '.' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, n)) if is_ident_start(n) => {
                        TokenKind::Field(take_while(&mut chars, body, is_ident_char))
                    }
                    _ => TokenKind::Dot,
                }
            }
            '"' => {
                chars.next();
                TokenKind::Str(lex_string(&mut chars).ok_or_else(|| {
                    syntax(format!("unterminated string at byte {i}"))
                })?)
            }
            c if c.is_ascii_digit() || c == '-' => {
                let text = take_while(&mut chars, body, |c| c.is_ascii_digit() || c == '-');
                let n = text
                    .parse::<i64>()
                    .map_err(|_| syntax(format!("bad number {text}")))?;
                TokenKind::Int(n)
            }
            c if is_ident_start(c) => TokenKind::Ident(take_while(&mut chars, body, is_ident_char)),
            other => return Err(syntax(format!("unexpected character {other:?}"))),
        };

        tokens.push(Token { kind, spaced });
        spaced = false;
    }

    Ok(tokens)
}

fn take_while(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    body: &str,
    pred: impl Fn(char) -> bool,
) -> String {
    let start = chars.peek().map_or(body.len(), |&(i, _)| i);
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if !pred(c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    body[start..end].to_string()
}

fn lex_string(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<String> {
    let mut out = String::new();
    loop {
        let (_, c) = chars.next()?;
        match c {
            '"' => return Some(out),
            '\\' => {
                let (_, esc) = chars.next()?;
                out.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            c => out.push(c),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    body: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: String) -> Error {
        Error::Syntax {
            expr: self.body.to_string(),
            message,
        }
    }

    fn pipeline(&mut self) -> Result<Expr> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Ident(_)) => self.call(),
            Some(_) => self.operand(),
            None => Err(self.error("missing value for command".to_string())),
        }
    }

    fn call(&mut self) -> Result<Expr> {
        let func = match self.next().map(|t| t.kind) {
            Some(TokenKind::Ident(name)) => name,
            _ => return Err(self.error("expected function name".to_string())),
        };

        let mut args = Vec::new();
        while let Some(tok) = self.peek() {
            if tok.kind == TokenKind::RParen {
                break;
            }
            if matches!(tok.kind, TokenKind::Ident(_)) {
                return Err(self.error(format!(
                    "unexpected {} in arguments of {func}, use parentheses",
                    tok.kind
                )));
            }
            args.push(self.operand()?);
        }

        Ok(Expr::Call { func, args })
    }

    fn operand(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        while let Some(Token {
            kind: TokenKind::Field(_),
            spaced: false,
        }) = self.peek()
        {
            if let Some(TokenKind::Field(name)) = self.next().map(|t| t.kind) {
                expr = Expr::field(expr, name);
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        let Some(tok) = self.next() else {
            return Err(self.error("unexpected end of expression".to_string()));
        };
        match tok.kind {
            TokenKind::Dot => Ok(Expr::Dot),
            TokenKind::Field(name) => Ok(Expr::field(Expr::Dot, name)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Int(n) => Ok(Expr::Int(n)),
            TokenKind::LParen => {
                let inner = self.pipeline()?;
                match self.next().map(|t| t.kind) {
                    Some(TokenKind::RParen) => Ok(inner),
                    _ => Err(self.error("unclosed left paren".to_string())),
                }
            }
            other => Err(self.error(format!("unexpected {other}"))),
        }
    }
}
