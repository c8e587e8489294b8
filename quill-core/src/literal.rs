//! Literal tokens to typed constants.
//!
//! The type of a literal follows from its lexical shape alone. Every
//! literal evaluates to a constant [`Value`] together with the rendered
//! constructor text, e.g. `i32{14}` or `str{"abc"}`.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::SemanticError;
use crate::lexer::Token;
use crate::render::RenderNode;
use crate::types::{DataType, Prim};
use crate::value::{Const, Value};

/// Evaluate a literal token.
pub fn eval_literal(tok: &Token) -> Result<(Value, RenderNode), SemanticError> {
    let text = tok.text.as_str();
    let (ty, constant) = match text.as_bytes().first() {
        Some(b'"') => (Prim::Str, Const::Str(decode_escapes(inner(text))?)),
        Some(b'`') => (Prim::Str, Const::Str(inner(text).to_string())),
        Some(b'\'') => char_literal(inner(text))?,
        _ if text == "true" || text == "false" => (Prim::Bool, Const::Bool(text == "true")),
        _ if text == "nil" => (Prim::Nil, Const::Nil),
        _ if is_float(text) => (Prim::F64, float_literal(text)?),
        _ => {
            let constant = integer_literal(text)?;
            (constant.literal_prim(), constant)
        }
    };
    let ty = DataType::prim(ty).with_span(tok.span);
    let node = RenderNode::Text(render_const(&constant, &ty));
    Ok((Value::constant(ty, constant, tok.span), node))
}

fn inner(text: &str) -> &str {
    if text.len() < 2 {
        return "";
    }
    &text[1..text.len() - 1]
}

/// Numbers with a `.` or an exponent are floats unless hex-prefixed.
pub fn is_float(text: &str) -> bool {
    if text.starts_with("0x") || text.starts_with("0X") {
        return false;
    }
    text.contains('.') || text.contains(['e', 'E'])
}

fn float_literal(text: &str) -> Result<Const, SemanticError> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    digits
        .parse::<f64>()
        .map(Const::Float)
        .map_err(|_| SemanticError::InvalidSyntax)
}

/// Parse an integer literal with arbitrary precision, then narrow it to
/// the signed 64-bit host form, or the unsigned one when it only fits
/// there.
pub fn integer_literal(text: &str) -> Result<Const, SemanticError> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    let (radix, body) = if let Some(rest) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (2, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };
    let big = BigInt::parse_bytes(body.as_bytes(), radix).ok_or(SemanticError::InvalidSyntax)?;
    if let Some(v) = big.to_i64() {
        return Ok(Const::Int(v));
    }
    big.to_u64().map(Const::UInt).ok_or_else(|| SemanticError::ConstOverflow {
        value: text.to_string(),
        kind: Prim::U64.name().to_string(),
    })
}

/// A char is a byte (`u8`) when it is one ASCII character, a `\x` or
/// octal escape, or a single-letter escape. Anything else is a rune
/// (`i32`).
fn char_literal(content: &str) -> Result<(Prim, Const), SemanticError> {
    let decoded = decode_escape_bytes(content)?;
    let is_byte = match content.as_bytes() {
        [c] => c.is_ascii(),
        [b'\\', b'x', ..] => true,
        [b'\\', c, ..] => (b'0'..=b'7').contains(c) || simple_escape(*c).is_some(),
        _ => false,
    };
    if is_byte {
        let byte = decoded.first().copied().ok_or(SemanticError::InvalidSyntax)?;
        return Ok((Prim::U8, Const::Int(i64::from(byte))));
    }
    let text = String::from_utf8(decoded).map_err(|_| SemanticError::InvalidSyntax)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok((Prim::I32, Const::Int(i64::from(u32::from(c))))),
        _ => Err(SemanticError::InvalidSyntax),
    }
}

fn simple_escape(c: u8) -> Option<u8> {
    Some(match c {
        b'n' => b'\n',
        b't' => b'\t',
        b'r' => b'\r',
        b'a' => 0x07,
        b'b' => 0x08,
        b'f' => 0x0c,
        b'v' => 0x0b,
        b'\\' => b'\\',
        b'\'' => b'\'',
        b'"' => b'"',
        _ => return None,
    })
}

fn decode_escapes(content: &str) -> Result<String, SemanticError> {
    let bytes = decode_escape_bytes(content)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}

fn decode_escape_bytes(content: &str) -> Result<Vec<u8>, SemanticError> {
    let src = content.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if src[i] != b'\\' {
            out.push(src[i]);
            i += 1;
            continue;
        }
        let esc = *src.get(i + 1).ok_or(SemanticError::InvalidSyntax)?;
        i += 2;
        if let Some(b) = simple_escape(esc) {
            out.push(b);
            continue;
        }
        match esc {
            b'x' => {
                let (v, len) = read_digits(&src[i..], 16, 2)?;
                out.push(v as u8);
                i += len;
            }
            b'0'..=b'7' => {
                let (v, len) = read_digits(&src[i - 1..], 8, 3)?;
                out.push(v as u8);
                i += len - 1;
            }
            b'u' | b'U' => {
                let width = if esc == b'u' { 4 } else { 8 };
                let (v, len) = read_digits(&src[i..], 16, width)?;
                let c = char::from_u32(v).ok_or(SemanticError::InvalidSyntax)?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                i += len;
            }
            _ => return Err(SemanticError::InvalidSyntax),
        }
    }
    Ok(out)
}

/// Read up to `max` digits of `radix`; at least one is required.
fn read_digits(src: &[u8], radix: u32, max: usize) -> Result<(u32, usize), SemanticError> {
    let mut value = 0u32;
    let mut len = 0;
    while len < max {
        let Some(d) = src.get(len).and_then(|&b| char::from(b).to_digit(radix)) else {
            break;
        };
        value = value * radix + d;
        len += 1;
    }
    if len == 0 {
        return Err(SemanticError::InvalidSyntax);
    }
    Ok((value, len))
}

/// Quote `text` as a C++ string literal. Quotes and backslashes are
/// escaped; control and non-ASCII bytes become octal escapes.
pub fn escape_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for &b in text.as_bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }
    out.push('"');
    out
}

/// Constructor text of a constant in type `ty`.
pub fn render_const(constant: &Const, ty: &DataType) -> String {
    let type_name = match ty.as_prim() {
        Some(p) if p.is_numeric() => p.name().to_string(),
        _ => constant.literal_prim().name().to_string(),
    };
    match constant {
        Const::Int(v) => format!("{type_name}{{{v}}}"),
        Const::UInt(v) => format!("{type_name}{{{v}}}"),
        Const::Float(v) if v.is_nan() => format!("{type_name}{{NAN}}"),
        Const::Float(v) if v.is_infinite() => {
            let sign = if *v < 0.0 { "-" } else { "" };
            format!("{type_name}{{{sign}INFINITY}}")
        }
        Const::Float(v) => format!("{type_name}{{{v:?}}}"),
        Const::Str(s) => format!("str{{{}}}", escape_str(s)),
        Const::Bool(b) => b.to_string(),
        Const::Nil => "nil".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;
    use crate::span::Span;

    fn lit(text: &str) -> (Value, RenderNode) {
        eval_literal(&Token::new(TokenKind::Literal, text, Span::default())).expect("literal")
    }

    #[test]
    fn integers_detect_base() {
        assert_eq!(integer_literal("0x1F"), Ok(Const::Int(31)));
        assert_eq!(integer_literal("0b101"), Ok(Const::Int(5)));
        assert_eq!(integer_literal("017"), Ok(Const::Int(15)));
        assert_eq!(integer_literal("1_000"), Ok(Const::Int(1000)));
        assert_eq!(integer_literal("18446744073709551615"), Ok(Const::UInt(u64::MAX)));
        assert_eq!(
            integer_literal("18446744073709551616").map_err(|e| e.key()),
            Err("const_overflow")
        );
        assert!(integer_literal("09").is_err());
    }

    #[test]
    fn integer_types_grow_with_value() {
        let (v, node) = lit("14");
        assert_eq!(v.ty.kind_text(), "i32");
        assert_eq!(node.to_string(), "i32{14}");
        let (v, _) = lit("4294967296");
        assert_eq!(v.ty.kind_text(), "i64");
        let (v, node) = lit("0xFFFFFFFFFFFFFFFF");
        assert_eq!(v.ty.kind_text(), "u64");
        assert_eq!(node.to_string(), "u64{18446744073709551615}");
    }

    #[test]
    fn floats_need_dot_or_exponent() {
        assert!(is_float("1.5"));
        assert!(is_float("2e10"));
        assert!(!is_float("0xE"));
        let (v, node) = lit("1.5");
        assert_eq!(v.constant, Some(Const::Float(1.5)));
        assert_eq!(node.to_string(), "f64{1.5}");
    }

    #[test]
    fn chars_split_bytes_and_runes() {
        let (v, node) = lit("'a'");
        assert_eq!(v.ty.kind_text(), "u8");
        assert_eq!(node.to_string(), "u8{97}");
        let (v, _) = lit("'\\n'");
        assert_eq!(v.constant, Some(Const::Int(10)));
        let (v, _) = lit("'\\x41'");
        assert_eq!(v.constant, Some(Const::Int(0x41)));
        let (v, node) = lit("'é'");
        assert_eq!(v.ty.kind_text(), "i32");
        assert_eq!(node.to_string(), "i32{233}");
    }

    #[test]
    fn strings_escape_for_output() {
        let (v, node) = lit("\"a\\tb\\\"\"");
        assert_eq!(v.constant, Some(Const::Str("a\tb\"".into())));
        assert_eq!(node.to_string(), "str{\"a\\011b\\\"\"}");
        let (v, _) = lit("`raw\\n`");
        assert_eq!(v.constant, Some(Const::Str("raw\\n".into())));
    }

    #[test]
    fn keywords() {
        let (v, node) = lit("nil");
        assert!(v.ty.is_nil());
        assert_eq!(node.to_string(), "nil");
        let (v, node) = lit("true");
        assert!(v.ty.is_bool());
        assert_eq!(node.to_string(), "true");
    }
}
