//! Tokenizer for component sources.
//!
//! Covers the subset of ECMAScript/TypeScript/JSX needed to find module-level
//! statements: identifiers, punctuation, string/template/regex literals,
//! numbers and comments. Every token carries its byte span and the nesting
//! depth of `(`, `[` and `{` it sits at, so the parser can tell top-level
//! statements apart from code inside bodies and expressions.
//!
//! JSX text is not a separate lexical mode. A stray quote in JSX text (e.g.
//! `<p>Don't</p>`) is lexed as a string that ends at the line break, which
//! keeps delimiter tracking intact for the common cases.

use thiserror::Error;

/// A byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Str,
    Template,
    Regex,
    Number,
    Punct,
}

/// A lexed token borrowing its text from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
    /// 1-based line of the first character
    pub line: usize,
    /// Delimiter nesting depth; closing delimiters carry the outer depth
    pub depth: usize,
    /// A line break (or a comment containing one) precedes this token
    pub newline_before: bool,
}

impl Token<'_> {
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    /// Decoded value of a string literal.
    pub fn string_value(&self) -> Option<String> {
        if self.kind != TokenKind::Str {
            return None;
        }

        let quote = self.text.chars().next()?;
        let body = &self.text[quote.len_utf8()..];
        let body = body.strip_suffix(quote).unwrap_or(body);
        Some(unescape(body))
    }
}

/// A malformed-source error with its location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    /// Build an error, computing line and column from a byte offset.
    pub fn at(src: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(src.len());
        let before = &src[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);

        SyntaxError {
            message: message.into(),
            offset,
            line,
            column: before[line_start..].chars().count() + 1,
        }
    }
}

/// Keywords after which a `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Tokenize source text.
pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    newline_pending: bool,
    /// Open delimiters with their offsets
    stack: Vec<(char, usize)>,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            newline_pending: false,
            stack: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, SyntaxError> {
        if self.src.starts_with("#!") {
            self.skip_line_comment();
        }

        while let Some(ch) = self.current_char() {
            match ch {
                '\n' => {
                    self.line += 1;
                    self.newline_pending = true;
                    self.pos += 1;
                }
                c if c.is_whitespace() => self.pos += c.len_utf8(),
                '/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                '/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                '\'' | '"' => {
                    let (start, line) = (self.pos, self.line);
                    self.scan_string(ch);
                    self.push(TokenKind::Str, start, line);
                }
                '`' => {
                    let (start, line) = (self.pos, self.line);
                    self.scan_template()?;
                    self.push(TokenKind::Template, start, line);
                }
                '/' if self.regex_allowed() => self.lex_regex(),
                '0'..='9' => self.lex_number(),
                '.' if matches!(self.peek(1), Some(b'0'..=b'9')) => self.lex_number(),
                c if is_ident_start(c) => self.lex_ident(),
                _ => self.lex_punct()?,
            }
        }

        if let Some(&(open, offset)) = self.stack.last() {
            return Err(SyntaxError::at(
                self.src,
                offset,
                format!("unclosed `{}`", open),
            ));
        }

        Ok(self.tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        let token = Token {
            kind,
            text: &self.src[start..self.pos],
            span: Span::new(start, self.pos),
            line,
            depth: self.stack.len(),
            newline_before: std::mem::take(&mut self.newline_pending),
        };
        self.tokens.push(token);
    }

    fn skip_line_comment(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let Some(len) = self.src[self.pos + 2..].find("*/") else {
            return Err(SyntaxError::at(self.src, start, "unterminated block comment"));
        };

        let body = &self.src[self.pos..self.pos + 2 + len];
        let newlines = body.matches('\n').count();
        if newlines > 0 {
            self.line += newlines;
            self.newline_pending = true;
        }

        self.pos += len + 4;
        Ok(())
    }

    /// Advance over a quoted string. Unterminated strings end at the line break.
    fn scan_string(&mut self, quote: char) {
        self.pos += 1;
        while let Some(ch) = self.current_char() {
            match ch {
                '\\' => {
                    self.pos += 1;
                    if let Some(escaped) = self.current_char() {
                        if escaped == '\n' {
                            self.line += 1;
                        }
                        self.pos += escaped.len_utf8();
                    }
                }
                '\n' => return,
                c if c == quote => {
                    self.pos += 1;
                    return;
                }
                c => self.pos += c.len_utf8(),
            }
        }
    }

    /// Advance over a template literal, including nested `${}` expressions.
    fn scan_template(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.pos += 1;

        while let Some(ch) = self.current_char() {
            match ch {
                '\\' => {
                    self.pos += 1;
                    if let Some(escaped) = self.current_char() {
                        if escaped == '\n' {
                            self.line += 1;
                        }
                        self.pos += escaped.len_utf8();
                    }
                }
                '`' => {
                    self.pos += 1;
                    return Ok(());
                }
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                '$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.scan_interpolation(start)?;
                }
                c => self.pos += c.len_utf8(),
            }
        }

        Err(SyntaxError::at(self.src, start, "unterminated template literal"))
    }

    fn scan_interpolation(&mut self, template_start: usize) -> Result<(), SyntaxError> {
        let mut depth = 1usize;

        while let Some(ch) = self.current_char() {
            match ch {
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                '/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                '/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                '\'' | '"' => self.scan_string(ch),
                '`' => self.scan_template()?,
                '{' => {
                    depth += 1;
                    self.pos += 1;
                }
                '}' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                c => self.pos += c.len_utf8(),
            }
        }

        Err(SyntaxError::at(
            self.src,
            template_start,
            "unterminated template literal",
        ))
    }

    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.tokens.last() else {
            return true;
        };

        match prev.kind {
            TokenKind::Ident => REGEX_PRECEDING_KEYWORDS.contains(&prev.text),
            TokenKind::Punct => !matches!(prev.text, ")" | "]" | "}" | "<"),
            TokenKind::Str | TokenKind::Template | TokenKind::Regex | TokenKind::Number => false,
        }
    }

    /// Lex a regex literal, falling back to a `/` punctuator when the
    /// literal would run past the end of the line.
    fn lex_regex(&mut self) {
        let (start, line) = (self.pos, self.line);
        let mut cursor = self.pos + 1;
        let mut in_class = false;

        loop {
            let Some(ch) = self.src[cursor..].chars().next() else {
                break;
            };
            match ch {
                '\n' => break,
                '\\' => {
                    cursor += 1;
                    match self.src[cursor..].chars().next() {
                        Some('\n') | None => break,
                        Some(escaped) => cursor += escaped.len_utf8(),
                    }
                }
                '[' => {
                    in_class = true;
                    cursor += 1;
                }
                ']' => {
                    in_class = false;
                    cursor += 1;
                }
                '/' if !in_class => {
                    self.pos = cursor + 1;
                    while let Some(flag) = self.current_char() {
                        if !is_ident_continue(flag) {
                            break;
                        }
                        self.pos += flag.len_utf8();
                    }
                    self.push(TokenKind::Regex, start, line);
                    return;
                }
                c => cursor += c.len_utf8(),
            }
        }

        self.pos = start + 1;
        self.push(TokenKind::Punct, start, line);
    }

    fn lex_number(&mut self) {
        let (start, line) = (self.pos, self.line);
        let hex = self.src[self.pos..].starts_with("0x") || self.src[self.pos..].starts_with("0X");

        while let Some(&b) = self.bytes.get(self.pos) {
            let exponent_sign = matches!(b, b'+' | b'-')
                && !hex
                && matches!(self.bytes.get(self.pos - 1), Some(b'e' | b'E'));

            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }

        self.push(TokenKind::Number, start, line);
    }

    fn lex_ident(&mut self) {
        let (start, line) = (self.pos, self.line);
        while let Some(ch) = self.current_char() {
            if !is_ident_continue(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        self.push(TokenKind::Ident, start, line);
    }

    fn lex_punct(&mut self) -> Result<(), SyntaxError> {
        let (start, line) = (self.pos, self.line);
        let rest = &self.src[self.pos..];

        for op in ["...", "=>", "?."] {
            if rest.starts_with(op) {
                // `a?.5:b` is a conditional, not optional chaining
                if op == "?." && matches!(self.peek(2), Some(b'0'..=b'9')) {
                    continue;
                }
                self.pos += op.len();
                self.push(TokenKind::Punct, start, line);
                return Ok(());
            }
        }

        let Some(ch) = rest.chars().next() else {
            return Ok(());
        };
        self.pos += ch.len_utf8();

        match ch {
            '(' | '[' | '{' => {
                self.push(TokenKind::Punct, start, line);
                self.stack.push((ch, start));
            }
            ')' | ']' | '}' => {
                let expected = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match self.stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, offset)) => {
                        let opened_line = SyntaxError::at(self.src, offset, "").line;
                        return Err(SyntaxError::at(
                            self.src,
                            start,
                            format!(
                                "mismatched `{}`: `{}` opened at line {} is still open",
                                ch, open, opened_line
                            ),
                        ));
                    }
                    None => {
                        return Err(SyntaxError::at(
                            self.src,
                            start,
                            format!("unexpected `{}`", ch),
                        ));
                    }
                }
                self.push(TokenKind::Punct, start, line);
            }
            _ => self.push(TokenKind::Punct, start, line),
        }

        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

/// Decode the escape sequences of a string literal body.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('\n') => {}
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                {
                    out.push(decoded);
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&c| c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                {
                    out.push(decoded);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}
