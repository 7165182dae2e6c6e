//! Numeric literal classification.
//!
//! A literal may be representable as several types at once: `13+0i` is an
//! int, a uint, a float, and a complex. [`Number::parse`] records every
//! representation that holds exactly. The scanners below reproduce the
//! source language's literal grammar: base prefixes, leading-zero octal
//! for integers, `_` digit separators, hexadecimal floats with a binary
//! exponent, and quoted character constants.

use crate::lexer::TokenKind;

/// The classified value of a number, character, or complex constant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Number {
    /// Number has an integral value.
    pub is_int: bool,
    /// Number has an unsigned integral value.
    pub is_uint: bool,
    /// Number has a floating-point value.
    pub is_float: bool,
    /// Number is complex.
    pub is_complex: bool,
    pub int64: i64,
    pub uint64: u64,
    pub float64: f64,
    /// Real and imaginary parts.
    pub complex128: (f64, f64),
}

impl Number {
    /// Classifies a literal with the lexical kind the scanner assigned to it.
    pub fn parse(text: &str, kind: TokenKind) -> Result<Number, String> {
        let mut n = Number::default();
        match kind {
            TokenKind::CharConstant => {
                let cp = unquote_char(text)
                    .ok_or_else(|| format!("malformed character constant: {text}"))?;
                n.int64 = i64::from(cp);
                n.is_int = true;
                n.uint64 = u64::from(cp);
                n.is_uint = true;
                n.float64 = f64::from(cp); // odd but those are the rules
                n.is_float = true;
                return Ok(n);
            }
            TokenKind::Complex => {
                let c = parse_complex(text)
                    .ok_or_else(|| format!("illegal number syntax: {text:?}"))?;
                n.complex128 = c;
                n.is_complex = true;
                n.simplify_complex();
                return Ok(n);
            }
            _ => {}
        }
        // Imaginary constants can only be complex unless they are zero.
        if let Some(body) = text.strip_suffix('i') {
            if let Some(f) = parse_float(body) {
                n.is_complex = true;
                n.complex128 = (0.0, f);
                n.simplify_complex();
                return Ok(n);
            }
        }
        // Do the integer tests first so 0x123 etc. classify by prefix.
        if let Some(u) = parse_uint(text) {
            n.is_uint = true;
            n.uint64 = u;
        }
        if let Some(i) = parse_int(text) {
            n.is_int = true;
            n.int64 = i;
            if i == 0 {
                n.is_uint = true; // in case of -0
                n.uint64 = 0;
            }
        }
        // If an integer extraction succeeded, promote the float.
        if n.is_int {
            n.is_float = true;
            n.float64 = n.int64 as f64;
        } else if n.is_uint {
            n.is_float = true;
            n.float64 = n.uint64 as f64;
        } else if let Some(f) = parse_float(text) {
            // It parsed as a float but looks like an integer: a number too
            // large to fit. Reject it.
            if !text.contains(['.', 'e', 'E', 'p', 'P']) {
                return Err(format!("integer overflow: {text:?}"));
            }
            n.is_float = true;
            n.float64 = f;
            // A float that happens to be integral also extracts the ints.
            if !n.is_int && (f as i64) as f64 == f {
                n.is_int = true;
                n.int64 = f as i64;
            }
            if !n.is_uint && (f as u64) as f64 == f {
                n.is_uint = true;
                n.uint64 = f as u64;
            }
        }
        if !n.is_int && !n.is_uint && !n.is_float {
            return Err(format!("illegal number syntax: {text:?}"));
        }
        Ok(n)
    }

    /// A complex with a zero imaginary part collapses to a float, and to the
    /// integer types when exactly representable.
    fn simplify_complex(&mut self) {
        self.is_float = self.complex128.1 == 0.0;
        if self.is_float {
            self.float64 = self.complex128.0;
            self.is_int = (self.float64 as i64) as f64 == self.float64;
            if self.is_int {
                self.int64 = self.float64 as i64;
            }
            self.is_uint = (self.float64 as u64) as f64 == self.float64;
            if self.is_uint {
                self.uint64 = self.float64 as u64;
            }
        }
    }
}

/// Parses a signed integer with base-0 semantics: `0x`/`0o`/`0b` prefixes,
/// a bare leading `0` meaning octal, and `_` digit separators.
pub(crate) fn parse_int(text: &str) -> Option<i64> {
    let (neg, rest) = match text.as_bytes().first() {
        Some(b'+') => (false, &text[1..]),
        Some(b'-') => (true, &text[1..]),
        _ => (false, text),
    };
    if !underscore_ok(text) {
        return None;
    }
    let u = parse_uint_digits(rest)?;
    if neg {
        if u > 1u64 << 63 {
            return None;
        }
        Some(u.wrapping_neg() as i64)
    } else {
        if u > i64::MAX as u64 {
            return None;
        }
        Some(u as i64)
    }
}

/// Parses an unsigned integer with base-0 semantics. A sign prefix is not
/// permitted.
pub(crate) fn parse_uint(text: &str) -> Option<u64> {
    if text.starts_with(['+', '-']) {
        return None;
    }
    if !underscore_ok(text) {
        return None;
    }
    parse_uint_digits(text)
}

fn parse_uint_digits(text: &str) -> Option<u64> {
    let (base, digits) = split_base(text);
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    u64::from_str_radix(&digits, base).ok()
}

fn split_base(s: &str) -> (u32, &str) {
    let b = s.as_bytes();
    if b.len() >= 2 && b[0] == b'0' {
        return match b[1] {
            b'x' | b'X' => (16, &s[2..]),
            b'o' | b'O' => (8, &s[2..]),
            b'b' | b'B' => (2, &s[2..]),
            _ => (8, &s[1..]), // a bare leading 0 means octal
        };
    }
    (10, s)
}

/// Validates `_` placement: separators may only sit between digits, or
/// between a base prefix and a digit.
fn underscore_ok(s: &str) -> bool {
    // `saw` tracks the class of the previous character: '^' for beginning
    // of the number, '0' for a digit or base prefix, '_' for an underscore,
    // '!' for anything else.
    let mut saw = '^';
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut hex = false;
    if bytes.len() >= 2
        && bytes[0] == b'0'
        && matches!(bytes[1].to_ascii_lowercase(), b'b' | b'o' | b'x')
    {
        i = 2;
        saw = '0'; // the base prefix counts as a digit for separators
        hex = bytes[1].to_ascii_lowercase() == b'x';
    }
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_digit() || (hex && c.to_ascii_lowercase().is_ascii_hexdigit()) {
            saw = '0';
            i += 1;
            continue;
        }
        if c == b'_' {
            if saw != '0' {
                return false;
            }
            saw = '_';
            i += 1;
            continue;
        }
        if saw == '_' {
            return false;
        }
        saw = '!';
        i += 1;
    }
    saw != '_'
}

/// Parses a float: decimal with optional `e` exponent, or hexadecimal with
/// a mandatory `p` exponent. `_` separators are accepted, leading zeros do
/// not mean octal.
pub(crate) fn parse_float(text: &str) -> Option<f64> {
    if text.is_empty() || !underscore_ok(text) {
        return None;
    }
    let (neg, rest) = match text.as_bytes().first() {
        Some(b'+') => (false, &text[1..]),
        Some(b'-') => (true, &text[1..]),
        _ => (false, text),
    };
    if rest.starts_with(['+', '-']) {
        return None;
    }
    let value = if rest.len() >= 2 && rest.as_bytes()[0] == b'0' && matches!(rest.as_bytes()[1], b'x' | b'X')
    {
        parse_hex_float(&rest[2..])?
    } else {
        let cleaned: String = rest.chars().filter(|&c| c != '_').collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse::<f64>().ok()?
    };
    Some(if neg { -value } else { value })
}

/// Parses the body of a hexadecimal float (after the `0x` prefix): hex
/// mantissa with an optional point, then a required binary exponent.
fn parse_hex_float(body: &str) -> Option<f64> {
    let body: String = body.chars().filter(|&c| c != '_').collect();
    let (mantissa, exponent) = body.split_once(['p', 'P'])?;
    if exponent.is_empty() || exponent == "+" || exponent == "-" {
        return None;
    }
    if !exponent
        .strip_prefix(['+', '-'])
        .unwrap_or(exponent)
        .bytes()
        .all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let exp: i32 = exponent.parse().ok()?;
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((a, b)) => (a, b),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut value = 0.0f64;
    for c in int_part.chars() {
        value = value * 16.0 + f64::from(c.to_digit(16)?);
    }
    let mut scale = 1.0 / 16.0;
    for c in frac_part.chars() {
        value += f64::from(c.to_digit(16)?) * scale;
        scale /= 16.0;
    }
    Some(value * 2f64.powi(exp))
}

/// Parses the full complex form `R±Ii` (the internal sign is mandatory;
/// pure imaginaries like `4i` go through the plain number path).
pub(crate) fn parse_complex(text: &str) -> Option<(f64, f64)> {
    let bytes = text.as_bytes();
    let mut split = None;
    for i in 1..bytes.len() {
        if matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E' | b'p' | b'P') {
            split = Some(i);
            break;
        }
    }
    let i = split?;
    let real = parse_float(&text[..i])?;
    let imag = parse_float(text[i..].strip_suffix('i')?)?;
    Some((real, imag))
}

/// Unquotes a full character constant (quotes included), returning the
/// codepoint value. Exactly one rune or escape must sit between the quotes.
pub(crate) fn unquote_char(text: &str) -> Option<u32> {
    let body = text.strip_prefix('\'')?;
    let (value, rest) = unquote_one(body, '\'')?;
    if rest != "'" {
        return None;
    }
    Some(value)
}

/// Unquotes a full string literal: `"…"` with escapes, or a raw backquoted
/// string (in which carriage returns are discarded).
pub(crate) fn unquote_string(text: &str) -> Option<String> {
    if let Some(body) = text.strip_prefix('`') {
        let body = body.strip_suffix('`')?;
        if body.contains('`') {
            return None;
        }
        return Some(body.chars().filter(|&c| c != '\r').collect());
    }
    let body = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::new();
    let mut rest = body;
    while !rest.is_empty() {
        let (value, tail) = unquote_one(rest, '"')?;
        out.push(char::from_u32(value)?);
        rest = tail;
    }
    Some(out)
}

/// Decodes one rune or escape sequence from the front of `s`, inside a
/// literal quoted by `quote`. Returns the codepoint and the remainder.
fn unquote_one(s: &str, quote: char) -> Option<(u32, &str)> {
    let mut chars = s.chars();
    let c = chars.next()?;
    if c == quote || c == '\n' {
        return None;
    }
    if c != '\\' {
        return Some((c as u32, chars.as_str()));
    }
    let escape = chars.next()?;
    let rest = chars.as_str();
    match escape {
        'a' => Some((0x07, rest)),
        'b' => Some((0x08, rest)),
        'f' => Some((0x0C, rest)),
        'n' => Some((u32::from('\n'), rest)),
        'r' => Some((u32::from('\r'), rest)),
        't' => Some((u32::from('\t'), rest)),
        'v' => Some((0x0B, rest)),
        '\\' => Some((u32::from('\\'), rest)),
        '\'' if quote == '\'' => Some((u32::from('\''), rest)),
        '"' if quote == '"' => Some((u32::from('"'), rest)),
        'x' => hex_escape(rest, 2),
        'u' => {
            let (v, rest) = hex_escape(rest, 4)?;
            char::from_u32(v)?;
            Some((v, rest))
        }
        'U' => {
            let (v, rest) = hex_escape(rest, 8)?;
            char::from_u32(v)?;
            Some((v, rest))
        }
        '0'..='7' => {
            let d1 = escape.to_digit(8)?;
            let mut it = rest.chars();
            let d2 = it.next()?.to_digit(8)?;
            let d3 = it.next()?.to_digit(8)?;
            let v = d1 * 64 + d2 * 8 + d3;
            if v > 255 {
                return None;
            }
            Some((v, it.as_str()))
        }
        _ => None,
    }
}

fn hex_escape(s: &str, n: usize) -> Option<(u32, &str)> {
    let digits = s.get(..n)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let v = u32::from_str_radix(digits, 16).ok()?;
    Some((v, &s[n..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NumberTest {
        text: &'static str,
        is_int: bool,
        is_uint: bool,
        is_float: bool,
        is_complex: bool,
        int64: i64,
        uint64: u64,
        float64: f64,
        complex128: (f64, f64),
    }

    fn t(
        text: &'static str,
        is_int: bool,
        is_uint: bool,
        is_float: bool,
        is_complex: bool,
        int64: i64,
        uint64: u64,
        float64: f64,
        complex128: (f64, f64),
    ) -> NumberTest {
        NumberTest { text, is_int, is_uint, is_float, is_complex, int64, uint64, float64, complex128 }
    }

    fn bad(text: &'static str) -> NumberTest {
        t(text, false, false, false, false, 0, 0, 0.0, (0.0, 0.0))
    }

    fn number_tests() -> Vec<NumberTest> {
        vec![
            // basics
            t("0", true, true, true, false, 0, 0, 0.0, (0.0, 0.0)),
            t("-0", true, true, true, false, 0, 0, 0.0, (0.0, 0.0)), // -0 is a uint
            t("73", true, true, true, false, 73, 73, 73.0, (0.0, 0.0)),
            t("7_3", true, true, true, false, 73, 73, 73.0, (0.0, 0.0)),
            t("0b10_010_01", true, true, true, false, 73, 73, 73.0, (0.0, 0.0)),
            t("0B10_010_01", true, true, true, false, 73, 73, 73.0, (0.0, 0.0)),
            t("073", true, true, true, false, 59, 59, 59.0, (0.0, 0.0)),
            t("0o73", true, true, true, false, 59, 59, 59.0, (0.0, 0.0)),
            t("0O73", true, true, true, false, 59, 59, 59.0, (0.0, 0.0)),
            t("0x73", true, true, true, false, 115, 115, 115.0, (0.0, 0.0)),
            t("0X73", true, true, true, false, 115, 115, 115.0, (0.0, 0.0)),
            t("0x7_3", true, true, true, false, 115, 115, 115.0, (0.0, 0.0)),
            t("-73", true, false, true, false, -73, 0, -73.0, (0.0, 0.0)),
            t("+73", true, false, true, false, 73, 0, 73.0, (0.0, 0.0)),
            t("100", true, true, true, false, 100, 100, 100.0, (0.0, 0.0)),
            t("1e9", true, true, true, false, 1_000_000_000, 1_000_000_000, 1e9, (0.0, 0.0)),
            t("-1e9", true, false, true, false, -1_000_000_000, 0, -1e9, (0.0, 0.0)),
            t("-1.2", false, false, true, false, 0, 0, -1.2, (0.0, 0.0)),
            t("1e19", false, true, true, false, 0, 10_000_000_000_000_000_000, 1e19, (0.0, 0.0)),
            t("1e1_9", false, true, true, false, 0, 10_000_000_000_000_000_000, 1e19, (0.0, 0.0)),
            t("1E19", false, true, true, false, 0, 10_000_000_000_000_000_000, 1e19, (0.0, 0.0)),
            t("-1e19", false, false, true, false, 0, 0, -1e19, (0.0, 0.0)),
            t("0x_1p4", true, true, true, false, 16, 16, 16.0, (0.0, 0.0)),
            t("0X_1P4", true, true, true, false, 16, 16, 16.0, (0.0, 0.0)),
            t("0x_1p-4", false, false, true, false, 0, 0, 1.0 / 16.0, (0.0, 0.0)),
            t("4i", false, false, false, true, 0, 0, 0.0, (0.0, 4.0)),
            t("-1.2+4.2i", false, false, false, true, 0, 0, 0.0, (-1.2, 4.2)),
            t("073i", false, false, false, true, 0, 0, 0.0, (0.0, 73.0)), // not octal!
            // complex with 0 imaginary are float (and maybe integer)
            t("0i", true, true, true, true, 0, 0, 0.0, (0.0, 0.0)),
            t("-1.2+0i", false, false, true, true, 0, 0, -1.2, (-1.2, 0.0)),
            t("-12+0i", true, false, true, true, -12, 0, -12.0, (-12.0, 0.0)),
            t("13+0i", true, true, true, true, 13, 13, 13.0, (13.0, 0.0)),
            // funny bases
            t("0123", true, true, true, false, 83, 83, 83.0, (0.0, 0.0)),
            t("-0x0", true, true, true, false, 0, 0, 0.0, (0.0, 0.0)),
            t(
                "0xdeadbeef",
                true,
                true,
                true,
                false,
                0xdeadbeef,
                0xdeadbeef,
                3735928559.0,
                (0.0, 0.0),
            ),
            // character constants
            t("'a'", true, true, true, false, 97, 97, 97.0, (0.0, 0.0)),
            t(r"'\n'", true, true, true, false, 10, 10, 10.0, (0.0, 0.0)),
            t(r"'\\'", true, true, true, false, 92, 92, 92.0, (0.0, 0.0)),
            t(r"'\''", true, true, true, false, 39, 39, 39.0, (0.0, 0.0)),
            t(r"'\xFF'", true, true, true, false, 0xFF, 0xFF, 255.0, (0.0, 0.0)),
            t("'パ'", true, true, true, false, 0x30d1, 0x30d1, 12497.0, (0.0, 0.0)),
            t(r"'\u30d1'", true, true, true, false, 0x30d1, 0x30d1, 12497.0, (0.0, 0.0)),
            t(r"'\U000030d1'", true, true, true, false, 0x30d1, 0x30d1, 12497.0, (0.0, 0.0)),
            // some broken syntax
            bad("+-2"),
            bad("0x123."),
            bad("1e."),
            bad("0xi."),
            bad("1+2."),
            bad("'x"),
            bad("'xx'"),
            bad("'433937734937734969526500969526500'"), // integer too large
            // 0xe must not parse as a float exponent
            t("0xef", true, true, true, false, 0xef, 0xef, 239.0, (0.0, 0.0)),
        ]
    }

    /// Mirrors the scanner's kind assignment: leading quote means a char
    /// constant, a full `R±Ii` form means complex, anything else a number.
    fn classify_kind(text: &str) -> TokenKind {
        if text.starts_with('\'') {
            TokenKind::CharConstant
        } else if parse_complex(text).is_some() {
            TokenKind::Complex
        } else {
            TokenKind::Number
        }
    }

    #[test]
    fn test_number_parse() {
        for test in number_tests() {
            let kind = classify_kind(test.text);
            let ok = test.is_int || test.is_uint || test.is_float || test.is_complex;
            let result = Number::parse(test.text, kind);
            match result {
                Err(err) => {
                    assert!(!ok, "unexpected error for {:?}: {}", test.text, err);
                    continue;
                }
                Ok(n) => {
                    assert!(ok, "expected error for {:?}, got {:?}", test.text, n);
                    assert_eq!(n.is_int, test.is_int, "is_int wrong for {:?}", test.text);
                    assert_eq!(n.is_uint, test.is_uint, "is_uint wrong for {:?}", test.text);
                    assert_eq!(n.is_float, test.is_float, "is_float wrong for {:?}", test.text);
                    assert_eq!(n.is_complex, test.is_complex, "is_complex wrong for {:?}", test.text);
                    if test.is_int {
                        assert_eq!(n.int64, test.int64, "int64 wrong for {:?}", test.text);
                    }
                    if test.is_uint {
                        assert_eq!(n.uint64, test.uint64, "uint64 wrong for {:?}", test.text);
                    }
                    if test.is_float {
                        assert_eq!(n.float64, test.float64, "float64 wrong for {:?}", test.text);
                    }
                    if test.is_complex {
                        assert_eq!(n.complex128, test.complex128, "complex wrong for {:?}", test.text);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unquote_string() {
        assert_eq!(unquote_string(r#""abc \n\t\" ""#).as_deref(), Some("abc \n\t\" "));
        assert_eq!(unquote_string("`abc\\n`").as_deref(), Some("abc\\n"));
        assert_eq!(unquote_string("`a\r\nb`").as_deref(), Some("a\nb"));
        assert_eq!(unquote_string(r#""ÿ""#).as_deref(), Some("\u{FF}"));
        assert_eq!(unquote_string(r#""\101""#).as_deref(), Some("A"));
        assert!(unquote_string("\"unclosed").is_none());
    }

    #[test]
    fn test_underscore_placement() {
        assert!(underscore_ok("1_2"));
        assert!(underscore_ok("0x_1"));
        assert!(!underscore_ok("_1"));
        assert!(!underscore_ok("1_"));
        assert!(!underscore_ok("1__2"));
    }
}
