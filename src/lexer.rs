//! Lexer for Skert Compiler
//!
//! Context-sensitive tokenizer. The caller picks a [`LexMode`] for every
//! token because the same bytes scan differently depending on what the
//! grammar expects next: `/` is division or the start of a regular
//! expression, `}` may resume a template literal, and reserved words are
//! plain names after a `.`.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::error::ParseError;
use crate::span::Span;

lazy_static! {
    /// Words that always scan as keyword tokens outside of name mode.
    pub static ref RESERVED_WORDS: HashSet<&'static str> = [
        "break", "case", "catch", "class", "const", "continue", "debugger", "default",
        "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
        "function", "if", "import", "in", "instanceof", "new", "null", "return", "super",
        "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
    ]
    .into_iter()
    .collect();

    /// Identifiers that may not be bound or referenced in strict code.
    pub static ref STRICT_RESERVED_WORDS: HashSet<&'static str> = [
        "implements", "interface", "let", "package", "private", "protected", "public",
        "static", "yield",
    ]
    .into_iter()
    .collect();
}

/// Longest punctuators first so the first prefix match wins.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "=>", "->", "==", "!=", "<=",
    ">=", "&&", "||", "??", "#[", "++", "--", "+=", "-=", "*=", "%=", "&=", "|=", "^=", "<<", ">>",
    "**", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "%", "&", "|",
    "^", "!", "~", "?", ":", "=", ".",
];

const OCTAL_ERROR: &str = "Octal literals are not allowed in strict mode";

// ─────────────────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexMode {
    /// A `/` starts a regular expression literal.
    #[default]
    Regex,
    /// A `/` is the division operator.
    Div,
    /// A `}` resumes a template literal after an interpolation.
    Template,
    /// Reserved words scan as plain identifiers (property names).
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    Identifier,
    Keyword(&'static str),
    Punct(&'static str),
    Number,
    String,
    /// One literal section of a template: `` `...${ ``, `}...${`, `}...` `` or `` `...` ``.
    Template,
    Regex,
    /// An `@name` symbolic member name.
    Symbol,
    Comment,
    Eof,
}

impl TokenKind {
    /// Human-readable form used in "Unexpected token" messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Keyword(word) => *word,
            TokenKind::Punct(punct) => *punct,
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Template => "TEMPLATE",
            TokenKind::Regex => "REGEX",
            TokenKind::Symbol => "SYMBOL",
            TokenKind::Comment => "COMMENT",
            TokenKind::Eof => "EOF",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Identifier name, cooked string or template text, regex body, symbol
    /// name (with its `@`), or comment text.
    pub value: String,
    pub number: f64,
    pub number_suffix: String,
    pub regex_flags: String,
    /// Set on the template section that closes the literal.
    pub template_end: bool,
    pub newline_before: bool,
    /// A violation that only matters if the enclosing code is strict.
    pub strict_error: Option<&'static str>,
}

impl Token {
    fn new(kind: TokenKind, start: usize) -> Self {
        Token {
            kind,
            span: Span::new(start, start),
            value: String::new(),
            number: 0.0,
            number_suffix: String::new(),
            regex_flags: String::new(),
            template_end: false,
            newline_before: false,
            strict_error: None,
        }
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(p) if p == punct)
    }

    /// The identifier's name, provided it is written without escapes.
    pub fn keyword_value(&self) -> &str {
        if self.kind == TokenKind::Identifier && self.span.end - self.span.start == self.value.len()
        {
            &self.value
        } else {
            ""
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Character classification
// ─────────────────────────────────────────────────────────────────────────────

pub fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\x0B' | '\x0C' | ' ' | '\u{00A0}' | '\u{FEFF}' | '\u{1680}' | '\u{2000}'
            ..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}

pub fn is_id_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

pub fn is_id_continue(c: char) -> bool {
    c == '$' || c == '_' || c == '\u{200C}' || c == '\u{200D}' || c.is_alphanumeric()
}

// ─────────────────────────────────────────────────────────────────────────────
// Lexer
// ─────────────────────────────────────────────────────────────────────────────

pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    /// A line terminator was crossed since the last non-comment token.
    pending_newline: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer {
            source,
            offset: 0,
            pending_newline: false,
        };

        // A leading hashbang line is treated as whitespace
        if source.starts_with("#!") {
            lexer.offset = source.find(is_line_terminator).unwrap_or(source.len());
        }

        lexer
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Rewind to `offset`, restoring the newline flag the token at that
    /// offset was originally scanned with.
    pub fn reset(&mut self, offset: usize, newline_before: bool) {
        self.offset = offset;
        self.pending_newline = newline_before;
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[start..end]
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn peek_char_at(&self, n: usize) -> Option<char> {
        self.source[self.offset..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.offset += c.len_utf8();
        Some(c)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    /// Skip whitespace. If a comment follows, scan and return it; otherwise
    /// stop at the start of the next real token and return `None`.
    pub fn skip(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_whitespace();
        if self.rest().starts_with("//") || self.rest().starts_with("/*") {
            return self.next(LexMode::Div).map(Some);
        }
        Ok(None)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if is_line_terminator(c) {
                self.pending_newline = true;
            } else if !is_whitespace(c) {
                break;
            }
            self.advance();
        }
    }

    /// Scan the next token under `mode`. Comments come back as
    /// [`TokenKind::Comment`] tokens; callers record and skip them.
    pub fn next(&mut self, mode: LexMode) -> Result<Token, ParseError> {
        self.skip_whitespace();

        let start = self.offset;
        let newline_before = self.pending_newline;

        let mut token = match self.peek_char() {
            None => Token::new(TokenKind::Eof, start),
            Some(c) => self.scan(c, mode)?,
        };

        token.span = Span::new(start, self.offset);
        token.newline_before = newline_before;

        if token.kind == TokenKind::Comment {
            if token.value.chars().any(is_line_terminator) {
                self.pending_newline = true;
            }
        } else {
            self.pending_newline = false;
        }

        Ok(token)
    }

    fn scan(&mut self, c: char, mode: LexMode) -> Result<Token, ParseError> {
        let start = self.offset;

        match c {
            '/' => {
                if self.rest().starts_with("//") || self.rest().starts_with("/*") {
                    return self.scan_comment();
                }
                if mode == LexMode::Regex {
                    return self.scan_regex();
                }
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token::new(TokenKind::Punct("/="), start));
                }
                Ok(Token::new(TokenKind::Punct("/"), start))
            }
            '}' if mode == LexMode::Template => self.scan_template(),
            '`' => self.scan_template(),
            '"' | '\'' => self.scan_string(c),
            '@' => self.scan_symbol(),
            '.' if matches!(self.peek_char_at(1), Some(d) if d.is_ascii_digit()) => {
                self.scan_number()
            }
            '0'..='9' => self.scan_number(),
            '\\' => self.scan_identifier(mode),
            c if is_id_start(c) => self.scan_identifier(mode),
            _ => self.scan_punctuator(),
        }
    }

    fn error(&self, message: &str, start: usize) -> ParseError {
        ParseError::lexical(message, Span::new(start, self.offset.max(start + 1)))
    }

    fn scan_punctuator(&mut self) -> Result<Token, ParseError> {
        let start = self.offset;
        let rest = self.rest();

        match PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            Some(punct) => {
                self.offset += punct.len();
                Ok(Token::new(TokenKind::Punct(punct), start))
            }
            None => {
                self.advance();
                Err(self.error("Unexpected character", start))
            }
        }
    }

    fn scan_comment(&mut self) -> Result<Token, ParseError> {
        let start = self.offset;
        let mut token = Token::new(TokenKind::Comment, start);

        if self.rest().starts_with("//") {
            let end = self.rest().find(is_line_terminator).map_or(self.source.len(), |i| self.offset + i);
            token.value = self.source[start + 2..end].to_string();
            self.offset = end;
        } else {
            match self.rest()[2..].find("*/") {
                Some(i) => {
                    token.value = self.source[start + 2..start + 2 + i].to_string();
                    self.offset = start + 4 + i;
                }
                None => {
                    self.offset = self.source.len();
                    return Err(self.error("Unterminated comment", start));
                }
            }
        }

        Ok(token)
    }

    fn scan_identifier(&mut self, mode: LexMode) -> Result<Token, ParseError> {
        let start = self.offset;
        let mut value = String::new();

        loop {
            match self.peek_char() {
                Some('\\') => {
                    self.advance();
                    if self.advance() != Some('u') {
                        return Err(self.error("Invalid identifier escape", start));
                    }
                    let c = self.scan_unicode_escape(start)?;
                    let valid = if value.is_empty() {
                        is_id_start(c)
                    } else {
                        is_id_continue(c)
                    };
                    if !valid {
                        return Err(self.error("Invalid identifier escape", start));
                    }
                    value.push(c);
                }
                Some(c) if is_id_continue(c) => {
                    self.advance();
                    value.push(c);
                }
                _ => break,
            }
        }

        let escaped = self.offset - start != value.len();
        let kind = match RESERVED_WORDS.get(value.as_str()) {
            Some(word) if mode != LexMode::Name && !escaped => TokenKind::Keyword(word),
            _ => TokenKind::Identifier,
        };

        let mut token = Token::new(kind, start);
        token.value = value;
        Ok(token)
    }

    fn scan_symbol(&mut self) -> Result<Token, ParseError> {
        let start = self.offset;
        self.advance();

        match self.peek_char() {
            Some(c) if is_id_start(c) => {}
            _ => return Err(self.error("Invalid symbol name", start)),
        }

        let mut token = self.scan_identifier(LexMode::Name)?;
        token.kind = TokenKind::Symbol;
        token.value.insert(0, '@');
        Ok(token)
    }

    /// Reads the part of a `\u` escape after the `u`.
    fn scan_unicode_escape(&mut self, start: usize) -> Result<char, ParseError> {
        let code = if self.peek_char() == Some('{') {
            self.advance();
            let digits_start = self.offset;
            while matches!(self.peek_char(), Some(d) if d.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = &self.source[digits_start..self.offset];
            if digits.is_empty() || self.advance() != Some('}') {
                return Err(self.error("Invalid unicode escape", start));
            }
            u32::from_str_radix(digits, 16).ok()
        } else {
            let digits_start = self.offset;
            for _ in 0..4 {
                match self.peek_char() {
                    Some(d) if d.is_ascii_hexdigit() => {
                        self.advance();
                    }
                    _ => return Err(self.error("Invalid unicode escape", start)),
                }
            }
            u32::from_str_radix(&self.source[digits_start..self.offset], 16).ok()
        };

        code.and_then(char::from_u32)
            .ok_or_else(|| self.error("Invalid unicode escape", start))
    }

    fn scan_number(&mut self) -> Result<Token, ParseError> {
        let start = self.offset;
        let mut token = Token::new(TokenKind::Number, start);
        let mut integer = true;

        let radix = match (self.peek_char(), self.peek_char_at(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };

        if radix != 10 {
            self.offset += 2;
            let digits_start = self.offset;
            while matches!(self.peek_char(), Some(d) if d.is_digit(radix)) {
                self.advance();
            }
            if self.offset == digits_start {
                return Err(self.error("Invalid number", start));
            }
            token.number = parse_radix(&self.source[digits_start..self.offset], radix);
        } else if self.peek_char() == Some('0')
            && matches!(self.peek_char_at(1), Some('0'..='9'))
        {
            // Legacy octal, or a decimal with a leading zero
            self.advance();
            let digits_start = self.offset;
            while matches!(self.peek_char(), Some('0'..='9')) {
                self.advance();
            }
            let digits = &self.source[digits_start..self.offset];
            token.number = if digits.bytes().all(|b| b < b'8') {
                parse_radix(digits, 8)
            } else {
                digits.parse().unwrap_or(0.0)
            };
            token.strict_error = Some(OCTAL_ERROR);
        } else {
            while matches!(self.peek_char(), Some('0'..='9')) {
                self.advance();
            }
            if self.peek_char() == Some('.') {
                integer = false;
                self.advance();
                while matches!(self.peek_char(), Some('0'..='9')) {
                    self.advance();
                }
            }
            if matches!(self.peek_char(), Some('e' | 'E')) {
                integer = false;
                self.advance();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.advance();
                }
                let exp_start = self.offset;
                while matches!(self.peek_char(), Some('0'..='9')) {
                    self.advance();
                }
                if self.offset == exp_start {
                    return Err(self.error("Invalid number", start));
                }
            }
            token.number = self.source[start..self.offset]
                .parse()
                .map_err(|_| self.error("Invalid number", start))?;
        }

        match self.peek_char() {
            Some('n') if integer && token.strict_error.is_none() => {
                self.advance();
                token.number_suffix = "n".to_string();
            }
            Some(c) if is_id_start(c) || c.is_ascii_digit() => {
                self.advance();
                return Err(self.error("Invalid numeric literal suffix", start));
            }
            _ => {}
        }

        Ok(token)
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, ParseError> {
        let start = self.offset;
        let mut token = Token::new(TokenKind::String, start);
        self.advance();

        loop {
            match self.peek_char() {
                None => return Err(self.error("Unterminated string", start)),
                Some(c) if c == '\n' || c == '\r' => {
                    return Err(self.error("Unterminated string", start))
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    self.scan_escape(&mut token, start)?;
                }
                Some(c) => {
                    self.advance();
                    token.value.push(c);
                }
            }
        }

        Ok(token)
    }

    /// Reads an escape sequence after its backslash, appending the cooked
    /// character (if any) to the token value.
    fn scan_escape(&mut self, token: &mut Token, start: usize) -> Result<(), ParseError> {
        let c = match self.advance() {
            Some(c) => c,
            None => return Err(self.error("Unterminated escape sequence", start)),
        };

        match c {
            'n' => token.value.push('\n'),
            't' => token.value.push('\t'),
            'r' => token.value.push('\r'),
            'b' => token.value.push('\u{8}'),
            'f' => token.value.push('\u{C}'),
            'v' => token.value.push('\u{B}'),
            'x' => {
                let digits_start = self.offset;
                for _ in 0..2 {
                    match self.peek_char() {
                        Some(d) if d.is_ascii_hexdigit() => {
                            self.advance();
                        }
                        _ => return Err(self.error("Invalid hexadecimal escape", start)),
                    }
                }
                let code = u32::from_str_radix(&self.source[digits_start..self.offset], 16)
                    .map_err(|_| self.error("Invalid hexadecimal escape", start))?;
                token.value.extend(char::from_u32(code));
            }
            'u' => {
                let c = self.scan_unicode_escape(start)?;
                token.value.push(c);
            }
            '\r' => {
                if self.peek_char() == Some('\n') {
                    self.advance();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '0' if !matches!(self.peek_char(), Some('0'..='9')) => token.value.push('\0'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                let max_len = if c <= '3' { 3 } else { 2 };
                let mut len = 1;
                while len < max_len {
                    match self.peek_char().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            self.advance();
                            code = code * 8 + d;
                            len += 1;
                        }
                        None => break,
                    }
                }
                token.value.extend(char::from_u32(code));
                token.strict_error = Some(OCTAL_ERROR);
            }
            '8' | '9' => {
                token.value.push(c);
                token.strict_error = Some(OCTAL_ERROR);
            }
            other => token.value.push(other),
        }

        Ok(())
    }

    fn scan_template(&mut self) -> Result<Token, ParseError> {
        let start = self.offset;
        let mut token = Token::new(TokenKind::Template, start);
        // Opening '`' or the '}' that closes an interpolation
        self.advance();

        loop {
            match self.peek_char() {
                None => return Err(self.error("Unterminated template", start)),
                Some('`') => {
                    self.advance();
                    token.template_end = true;
                    break;
                }
                Some('$') if self.peek_char_at(1) == Some('{') => {
                    self.offset += 2;
                    break;
                }
                Some('\\') => {
                    self.advance();
                    self.scan_escape(&mut token, start)?;
                }
                Some('\r') => {
                    // Template values normalize CRLF and CR to LF
                    self.advance();
                    if self.peek_char() == Some('\n') {
                        self.advance();
                    }
                    token.value.push('\n');
                }
                Some(c) => {
                    self.advance();
                    token.value.push(c);
                }
            }
        }

        Ok(token)
    }

    fn scan_regex(&mut self) -> Result<Token, ParseError> {
        let start = self.offset;
        let mut token = Token::new(TokenKind::Regex, start);
        let mut in_class = false;
        self.advance();

        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated regular expression", start)),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error("Unterminated regular expression", start))
                }
                Some('\\') => {
                    token.value.push('\\');
                    match self.advance() {
                        Some(c) if !is_line_terminator(c) => token.value.push(c),
                        _ => return Err(self.error("Unterminated regular expression", start)),
                    }
                }
                Some('[') => {
                    in_class = true;
                    token.value.push('[');
                }
                Some(']') => {
                    in_class = false;
                    token.value.push(']');
                }
                Some('/') if !in_class => break,
                Some(c) => token.value.push(c),
            }
        }

        while let Some(c) = self.peek_char() {
            if !is_id_continue(c) {
                break;
            }
            if !"dgimsuyv".contains(c) || token.regex_flags.contains(c) {
                self.advance();
                return Err(self.error("Invalid regular expression flags", start));
            }
            self.advance();
            token.regex_flags.push(c);
        }

        Ok(token)
    }
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    digits.chars().fold(0.0, |acc, d| {
        acc * radix as f64 + d.to_digit(radix).unwrap_or(0) as f64
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(source: &str, mode: LexMode) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next(mode).unwrap();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_slash_depends_on_mode() {
        let regex = scan_all("/ab+c/gi", LexMode::Regex);
        assert_eq!(regex.len(), 1);
        assert_eq!(regex[0].kind, TokenKind::Regex);
        assert_eq!(regex[0].value, "ab+c");
        assert_eq!(regex[0].regex_flags, "gi");

        let div = scan_all("/ ab", LexMode::Div);
        assert_eq!(div[0].kind, TokenKind::Punct("/"));
        assert_eq!(div[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_regex_class_may_contain_slash() {
        let tokens = scan_all("/[/]x/", LexMode::Regex);
        assert_eq!(tokens[0].value, "[/]x");
    }

    #[test]
    fn test_name_mode_reads_reserved_words_as_identifiers() {
        let normal = scan_all("class", LexMode::Regex);
        assert_eq!(normal[0].kind, TokenKind::Keyword("class"));

        let name = scan_all("class", LexMode::Name);
        assert_eq!(name[0].kind, TokenKind::Identifier);
        assert_eq!(name[0].value, "class");
    }

    #[test]
    fn test_newline_before_survives_comments() {
        let tokens = scan_all("a /* x\n */ b // c\n d", LexMode::Div);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Comment,
                TokenKind::Identifier,
                TokenKind::Comment,
                TokenKind::Identifier
            ]
        );
        assert!(!tokens[0].newline_before);
        assert!(tokens[2].newline_before);
        assert!(tokens[4].newline_before);
    }

    #[test]
    fn test_numbers() {
        let tokens = scan_all("0x1F 0o17 0b101 1.5e2 .5 10n", LexMode::Div);
        let values: Vec<f64> = tokens.iter().map(|t| t.number).collect();
        assert_eq!(values, vec![31.0, 15.0, 5.0, 150.0, 0.5, 10.0]);
        assert_eq!(tokens[5].number_suffix, "n");
    }

    #[test]
    fn test_legacy_octal_is_strict_error() {
        let tokens = scan_all("017", LexMode::Div);
        assert_eq!(tokens[0].number, 15.0);
        assert_eq!(tokens[0].strict_error, Some(OCTAL_ERROR));
    }

    #[test]
    fn test_invalid_numeric_suffix() {
        let mut lexer = Lexer::new("10px");
        let error = lexer.next(LexMode::Div).unwrap_err();
        assert_eq!(error.message, "Invalid numeric literal suffix");
        assert_eq!(error.span.start, 0);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = scan_all(r#"'a\n\x41B\u{43}' "\101""#, LexMode::Div);
        assert_eq!(tokens[0].value, "a\nABC");
        assert_eq!(tokens[0].strict_error, None);
        assert_eq!(tokens[1].value, "A");
        assert_eq!(tokens[1].strict_error, Some(OCTAL_ERROR));
    }

    #[test]
    fn test_unterminated_literals() {
        for source in ["'abc", "`abc", "/abc", "/abc\n/", "'a\nb'"] {
            let mut lexer = Lexer::new(source);
            assert!(lexer.next(LexMode::Regex).is_err(), "{}", source);
        }
    }

    #[test]
    fn test_template_sections() {
        let mut lexer = Lexer::new("`a${x}b`");
        let head = lexer.next(LexMode::Regex).unwrap();
        assert_eq!(head.kind, TokenKind::Template);
        assert_eq!(head.value, "a");
        assert!(!head.template_end);

        let x = lexer.next(LexMode::Regex).unwrap();
        assert_eq!(x.value, "x");

        let tail = lexer.next(LexMode::Template).unwrap();
        assert_eq!(tail.kind, TokenKind::Template);
        assert_eq!(tail.value, "b");
        assert!(tail.template_end);
    }

    #[test]
    fn test_extension_punctuators() {
        let tokens = scan_all("a->b @sym a-->b ?? &x", LexMode::Div);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Punct("->"),
                TokenKind::Identifier,
                TokenKind::Symbol,
                TokenKind::Identifier,
                TokenKind::Punct("--"),
                TokenKind::Punct(">"),
                TokenKind::Identifier,
                TokenKind::Punct("??"),
                TokenKind::Punct("&"),
                TokenKind::Identifier,
            ]
        );
        assert_eq!(tokens[3].value, "@sym");
    }

    #[test]
    fn test_escaped_identifier_is_not_keyword() {
        let tokens = scan_all(r"\u0069f", LexMode::Regex);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "if");
        assert_eq!(tokens[0].keyword_value(), "");
    }
}
