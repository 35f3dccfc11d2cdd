//! Content-stream lexer.
//!
//! Splits decoded content-stream bytes into the flat [`Token`] sequence the
//! canonical writer consumes. Every byte of the input is accounted for: the
//! stream either lexes completely (whitespace and comments aside) or the whole
//! stream is rejected with the offset of the first byte that could not be
//! read. Nothing is dropped silently.
//!
//! Inline images are scanned here as well: the parameter dictionary is read
//! like any other operand run up to `ID`, then the raw samples are taken
//! verbatim up to the whitespace that precedes `EI`. Filters and colour
//! spaces are never interpreted, so abbreviated or filtered images pass
//! through unchanged.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::char,
    combinator::value,
    sequence::{delimited, preceded},
};

use crate::canonical::{BEGIN_INLINE_IMAGE, BEGIN_INLINE_IMAGE_DATA, END_INLINE_IMAGE};
use crate::token::{InlineImage, Operand, OperandMap, Token};
use crate::tokenizer::TokenizeError;

/// Arrays and dictionaries nested deeper than this are rejected.
pub const MAX_NESTING: usize = 256;

// ========== byte classes ==========

/// PDF whitespace: NUL, tab, LF, FF, CR and space.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn is_operator_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'*' | b'\'' | b'"')
}

// ========== leaf lexemes ==========

fn whitespace(input: &[u8]) -> IResult<&[u8], ()> {
    value((), take_while1(is_whitespace))(input)
}

/// `%` up to, not including, the end of the line.
fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

fn skip_ws(mut input: &[u8]) -> &[u8] {
    while let Ok((rest, ())) = alt((whitespace, comment))(input) {
        input = rest;
    }
    input
}

/// A run of regular characters: a number, a keyword or an operator.
fn word(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_regular)(input)
}

fn name(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (rest, raw) = preceded(char('/'), take_while(is_regular))(input)?;
    Ok((rest, decode_name(raw)))
}

/// Decode `#xx` escapes. A `#` not followed by two hex digits stays as is.
pub fn decode_name(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' {
            if let Some(byte) = raw.get(i + 1..i + 3).and_then(hex_pair) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    match pair {
        [hi, lo] => Some((hex_digit(*hi)? << 4) | hex_digit(*lo)?),
        _ => None,
    }
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (rest, digits) = delimited(
        char('<'),
        take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c)),
        char('>'),
    )(input)?;
    let nibbles: Vec<u8> = digits.iter().filter_map(|&c| hex_digit(c)).collect();
    // an odd final digit is padded with 0
    let bytes = nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect();
    Ok((rest, bytes))
}

/// Literal string with balanced parentheses, escapes decoded.
fn literal_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (mut rest, _) = char('(')(input)?;
    let mut out = Vec::new();
    let mut depth = 0usize;
    loop {
        let Some((&c, tail)) = rest.split_first() else {
            return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)));
        };
        rest = tail;
        match c {
            b'(' => {
                depth += 1;
                out.push(c);
            }
            b')' if depth == 0 => return Ok((rest, out)),
            b')' => {
                depth -= 1;
                out.push(c);
            }
            b'\\' => rest = string_escape(rest, &mut out),
            // an unescaped end of line reads as a single LF
            b'\r' => {
                out.push(b'\n');
                if rest.first() == Some(&b'\n') {
                    rest = &rest[1..];
                }
            }
            _ => out.push(c),
        }
    }
}

/// Decode the escape after a backslash and return the input past it.
fn string_escape<'a>(input: &'a [u8], out: &mut Vec<u8>) -> &'a [u8] {
    let Some((&c, rest)) = input.split_first() else {
        return input;
    };
    match c {
        b'n' => out.push(b'\n'),
        b'r' => out.push(b'\r'),
        b't' => out.push(b'\t'),
        b'b' => out.push(0x08),
        b'f' => out.push(0x0C),
        b'0'..=b'7' => {
            let len = rest.iter().take(2).take_while(|d| matches!(d, b'0'..=b'7')).count();
            let code = rest[..len]
                .iter()
                .fold(u32::from(c - b'0'), |acc, d| acc * 8 + u32::from(d - b'0'));
            // high-order overflow is ignored
            out.push((code & 0xff) as u8);
            return &rest[len..];
        }
        // backslash + end of line continues the string
        b'\r' => return rest.strip_prefix(b"\n").unwrap_or(rest),
        b'\n' => {}
        // `\(`, `\)`, `\\`, and a backslash before anything else is dropped
        _ => out.push(c),
    }
    rest
}

/// Integer or real, PDF syntax only: optional sign, digits, at most one `.`.
fn number(word: &[u8]) -> Option<Operand> {
    let digits = match word {
        [b'+' | b'-', rest @ ..] => rest,
        _ => word,
    };
    let points = digits.iter().filter(|&&c| c == b'.').count();
    if points > 1 || !digits.iter().any(u8::is_ascii_digit) || !digits.iter().all(|&c| c.is_ascii_digit() || c == b'.') {
        return None;
    }
    let text = std::str::from_utf8(word).ok()?;
    if points == 0 {
        // integers beyond i64 are kept as reals
        text.parse().map(Operand::Integer).or_else(|_| text.parse().map(Operand::Real)).ok()
    } else {
        text.parse().map(Operand::Real).ok()
    }
}

// ========== operand runs ==========

enum Lexeme<'a> {
    Operand(Operand),
    Word(&'a [u8]),
    ArrayEnd,
    DictEnd,
}

struct Lexer<'a> {
    raw: &'a [u8],
    rest: &'a [u8],
}

impl<'a> Lexer<'a> {
    fn offset(&self) -> usize {
        self.raw.len() - self.rest.len()
    }

    fn syntax(&self, offset: usize, reason: &'static str) -> TokenizeError {
        TokenizeError::Syntax { offset, reason }
    }

    fn skip_ws(&mut self) {
        self.rest = skip_ws(self.rest);
    }

    /// Next lexeme; the caller has skipped whitespace and checked for end of
    /// input.
    fn lexeme(&mut self, depth: usize) -> Result<Lexeme<'a>, TokenizeError> {
        let start = self.offset();
        let input = self.rest;
        match input {
            [b'/', ..] => {
                let (rest, name) = name(input).map_err(|_| self.syntax(start, "malformed name"))?;
                self.rest = rest;
                Ok(Lexeme::Operand(Operand::Name(name)))
            }
            [b'(', ..] => {
                let (rest, bytes) = literal_string(input).map_err(|_| self.syntax(start, "unterminated string"))?;
                self.rest = rest;
                Ok(Lexeme::Operand(Operand::String(bytes)))
            }
            [b'<', b'<', ..] => {
                self.rest = &input[2..];
                self.dictionary(start, depth + 1).map(|map| Lexeme::Operand(Operand::Dictionary(map)))
            }
            [b'<', ..] => {
                let (rest, bytes) = hex_string(input).map_err(|_| self.syntax(start, "malformed hex string"))?;
                self.rest = rest;
                Ok(Lexeme::Operand(Operand::String(bytes)))
            }
            [b'>', b'>', ..] => {
                self.rest = &input[2..];
                Ok(Lexeme::DictEnd)
            }
            [b'[', ..] => {
                self.rest = &input[1..];
                self.array(start, depth + 1).map(|items| Lexeme::Operand(Operand::Array(items)))
            }
            [b']', ..] => {
                self.rest = &input[1..];
                Ok(Lexeme::ArrayEnd)
            }
            _ => {
                let (rest, word) = word(input).map_err(|_| self.syntax(start, "unexpected delimiter"))?;
                self.rest = rest;
                self.classify(start, word)
            }
        }
    }

    fn classify(&self, start: usize, word: &'a [u8]) -> Result<Lexeme<'a>, TokenizeError> {
        if let Some(operand) = number(word) {
            return Ok(Lexeme::Operand(operand));
        }
        match word {
            b"true" => Ok(Lexeme::Operand(Operand::Boolean(true))),
            b"false" => Ok(Lexeme::Operand(Operand::Boolean(false))),
            b"null" => Err(TokenizeError::UnsupportedOperand("null")),
            [first, ..] if !first.is_ascii_digit() && word.iter().all(|&c| is_operator_byte(c)) => {
                Ok(Lexeme::Word(word))
            }
            _ => Err(self.syntax(start, "malformed number or operator")),
        }
    }

    /// One operand; operators and closing delimiters are errors here.
    fn operand(&mut self, depth: usize, unterminated: (usize, &'static str)) -> Result<Operand, TokenizeError> {
        self.skip_ws();
        if self.rest.is_empty() {
            return Err(self.syntax(unterminated.0, unterminated.1));
        }
        let start = self.offset();
        match self.lexeme(depth)? {
            Lexeme::Operand(operand) => Ok(operand),
            Lexeme::Word(_) => Err(self.syntax(start, "operator where an operand was expected")),
            Lexeme::ArrayEnd | Lexeme::DictEnd => Err(self.syntax(start, "unbalanced closing delimiter")),
        }
    }

    fn array(&mut self, open: usize, depth: usize) -> Result<Vec<Operand>, TokenizeError> {
        if depth > MAX_NESTING {
            return Err(self.syntax(open, "arrays and dictionaries nested too deeply"));
        }
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.rest.is_empty() {
                return Err(self.syntax(open, "unterminated array"));
            }
            let start = self.offset();
            match self.lexeme(depth)? {
                Lexeme::Operand(operand) => items.push(operand),
                Lexeme::ArrayEnd => return Ok(items),
                Lexeme::Word(_) => return Err(self.syntax(start, "operator inside array")),
                Lexeme::DictEnd => return Err(self.syntax(start, "unbalanced `>>` inside array")),
            }
        }
    }

    fn dictionary(&mut self, open: usize, depth: usize) -> Result<OperandMap, TokenizeError> {
        if depth > MAX_NESTING {
            return Err(self.syntax(open, "arrays and dictionaries nested too deeply"));
        }
        let mut entries = OperandMap::new();
        loop {
            self.skip_ws();
            if self.rest.is_empty() {
                return Err(self.syntax(open, "unterminated dictionary"));
            }
            let start = self.offset();
            match self.lexeme(depth)? {
                Lexeme::DictEnd => return Ok(entries),
                Lexeme::Operand(Operand::Name(key)) => {
                    let value = self.operand(depth, (open, "unterminated dictionary"))?;
                    entries.insert(key, value);
                }
                _ => return Err(self.syntax(start, "dictionary key is not a name")),
            }
        }
    }

    // ========== inline images ==========

    /// Parameters and samples of an inline image; `BI` has been consumed.
    fn inline_image(&mut self, begin: usize) -> Result<InlineImage, TokenizeError> {
        let mut params = OperandMap::new();
        loop {
            self.skip_ws();
            if self.rest.is_empty() {
                return Err(TokenizeError::UnterminatedInlineImage(begin));
            }
            let start = self.offset();
            match self.lexeme(0)? {
                Lexeme::Word(word) if word == BEGIN_INLINE_IMAGE_DATA.as_bytes() => break,
                Lexeme::Operand(Operand::Name(key)) => {
                    let value = self.operand(0, (begin, "inline image without `ID`"))?;
                    params.insert(key, value);
                }
                _ => return Err(self.syntax(start, "inline image key is not a name")),
            }
        }

        // a single whitespace byte separates `ID` from the samples
        if let Some((&c, rest)) = self.rest.split_first() {
            if is_whitespace(c) {
                self.rest = rest;
            }
        }
        let (len, end) = find_end_of_image(self.rest).ok_or(TokenizeError::UnterminatedInlineImage(begin))?;
        let data = self.rest[..len].to_vec();
        self.rest = &self.rest[end..];
        Ok(InlineImage { params, data })
    }
}

/// Length of the samples and offset just past `EI`.
///
/// `EI` ends the data only when whitespace precedes it and whitespace, a
/// delimiter or the end of the stream follows it. Samples that happen to
/// contain that exact pattern cannot be told apart from the terminator.
fn find_end_of_image(data: &[u8]) -> Option<(usize, usize)> {
    let marker = END_INLINE_IMAGE.as_bytes();
    let ends_here = |at: usize| {
        data[at..].starts_with(marker)
            && data.get(at + marker.len()).is_none_or(|&c| is_whitespace(c) || is_delimiter(c))
    };
    (0..data.len())
        .find(|&i| is_whitespace(data[i]) && ends_here(i + 1))
        .map(|i| (i, i + 1 + marker.len()))
}

// ========== entry ==========

/// Lex a whole decoded content stream.
pub fn tokenize(raw: &[u8]) -> Result<Vec<Token>, TokenizeError> {
    let mut lexer = Lexer { raw, rest: raw };
    let mut tokens = Vec::new();
    loop {
        lexer.skip_ws();
        if lexer.rest.is_empty() {
            return Ok(tokens);
        }
        let start = lexer.offset();
        match lexer.lexeme(0)? {
            Lexeme::Operand(operand) => tokens.push(Token::Operand(operand)),
            Lexeme::Word(word) if word == BEGIN_INLINE_IMAGE.as_bytes() => {
                tokens.push(Token::inline_image(lexer.inline_image(start)?));
            }
            Lexeme::Word(word) if word == BEGIN_INLINE_IMAGE_DATA.as_bytes() || word == END_INLINE_IMAGE.as_bytes() => {
                return Err(TokenizeError::DetachedInlineImage(start));
            }
            // operator bytes are ASCII by construction
            Lexeme::Word(word) => tokens.push(Token::operator(String::from_utf8_lossy(word))),
            Lexeme::ArrayEnd | Lexeme::DictEnd => return Err(lexer.syntax(start, "unbalanced closing delimiter")),
        }
    }
}
