//! Canonical content-stream writer.
//!
//! Renders a token sequence back to strict PDF content-stream syntax. Output is
//! raw bytes, one byte per character: names, strings and inline-image payloads
//! are copied without any text transcoding.

use crate::token::{InlineImage, Operand, Operator, Token};

pub const BEGIN_INLINE_IMAGE: &str = "BI";
pub const BEGIN_INLINE_IMAGE_DATA: &str = "ID";
pub const END_INLINE_IMAGE: &str = "EI";

/// Render a whole token sequence.
pub fn canonicalize(tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::new();
    for token in tokens {
        write_token(token, &mut out);
    }
    out
}

/// Append one top-level token: operators end their line, operands are
/// followed by a single space.
pub fn write_token(token: &Token, out: &mut Vec<u8>) {
    match token {
        Token::Operator(op) => write_operator(op, out),
        Token::Operand(operand) => write_operand(operand, out),
    }
}

pub fn write_operand(operand: &Operand, out: &mut Vec<u8>) {
    match operand {
        Operand::Name(name) => write_name(name, out),
        Operand::Boolean(value) => {
            let text: &[u8] = if *value { b"true " } else { b"false " };
            out.extend_from_slice(text);
        }
        Operand::Integer(value) => {
            out.extend_from_slice(value.to_string().as_bytes());
            out.push(b' ');
        }
        Operand::Real(value) => {
            out.extend_from_slice(format_real(*value).as_bytes());
            out.push(b' ');
        }
        Operand::String(bytes) => write_string(bytes, out),
        Operand::Array(items) => {
            out.extend_from_slice(b"[ ");
            for item in items {
                write_operand(item, out);
            }
            out.extend_from_slice(b"] ");
        }
        Operand::Dictionary(entries) => {
            out.extend_from_slice(b"<< ");
            for (key, value) in entries {
                write_name(key, out);
                write_operand(value, out);
            }
            out.extend_from_slice(b">> ");
        }
    }
}

pub fn write_operator(op: &Operator, out: &mut Vec<u8>) {
    match op {
        Operator::Named(name) => {
            out.extend_from_slice(name.as_bytes());
            out.push(b'\n');
        }
        Operator::InlineImage(image) => write_inline_image(image, out),
    }
}

fn write_inline_image(image: &InlineImage, out: &mut Vec<u8>) {
    out.extend_from_slice(BEGIN_INLINE_IMAGE.as_bytes());
    out.push(b'\n');
    for (key, value) in &image.params {
        // `/W 16 ` keeps the key a name token so the block parses again.
        write_name(key, out);
        write_operand(value, out);
        out.push(b'\n');
    }
    out.extend_from_slice(BEGIN_INLINE_IMAGE_DATA.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(&image.data);
    out.push(b'\n');
    out.extend_from_slice(END_INLINE_IMAGE.as_bytes());
    out.push(b'\n');
}

fn write_name(name: &[u8], out: &mut Vec<u8>) {
    out.push(b'/');
    out.extend_from_slice(name);
    out.push(b' ');
}

fn write_string(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &b in bytes {
        if !(0x20..=0x7e).contains(&b) {
            out.push(b'\\');
            out.push(b'0' + (b >> 6));
            out.push(b'0' + ((b >> 3) & 0o7));
            out.push(b'0' + (b & 0o7));
        } else if matches!(b, b'(' | b')' | b'\\') {
            // Newline, tab and the other control escapes were caught above.
            out.push(b'\\');
            out.push(b);
        } else {
            out.push(b);
        }
    }
    out.extend_from_slice(b") ");
}

/// Shortest decimal text that reads back as the same `f32`.
///
/// Integral values keep a `.0` suffix so they tokenize as reals again.
pub fn format_real(value: f32) -> String {
    if !value.is_finite() {
        return "0.0".to_string();
    }
    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}
