//! Numeric parsing and formatting shared by `Obj`, `expr` and the bridge.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

/// Parse an integer literal: optional sign, then decimal digits or a
/// `0x`/`0o`/`0b` prefixed run. Surrounding whitespace is allowed.
pub fn parse_int(text: &str) -> Option<BigInt> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.as_bytes().first()? {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (radix, digits) = match body.get(..2) {
        Some("0x" | "0X") => (16, &body[2..]),
        Some("0o" | "0O") => (8, &body[2..]),
        Some("0b" | "0B") => (2, &body[2..]),
        _ => (10, body),
    };

    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return None;
    }

    let magnitude = BigInt::parse_bytes(digits.as_bytes(), radix)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a floating-point literal. Integers (in any radix) are accepted too.
pub fn parse_double(text: &str) -> Option<f64> {
    if let Some(int) = parse_int(text) {
        return int.to_f64();
    }

    let trimmed = text.trim();
    let first = trimmed.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '-' | '+' | '.' | 'i' | 'I' | 'n' | 'N')) {
        return None;
    }

    trimmed.parse::<f64>().ok()
}

/// Boolean literal rules: any number (non-zero is true), or a unique prefix
/// of `true/false/yes/no`, or exactly `on`/`off` (prefixes of at least two
/// characters), case-insensitively.
pub fn parse_bool(text: &str) -> Option<bool> {
    if let Some(int) = parse_int(text) {
        return Some(!int.is_zero());
    }
    if let Some(double) = parse_double(text) {
        return Some(double != 0.0);
    }

    let word = text.trim().to_ascii_lowercase();
    if word.is_empty() {
        return None;
    }

    let prefix_of = |full: &str| full.starts_with(word.as_str());
    if prefix_of("true") || prefix_of("yes") {
        return Some(true);
    }
    if prefix_of("false") || prefix_of("no") {
        return Some(false);
    }
    match word.as_str() {
        "on" => Some(true),
        "of" | "off" => Some(false),
        _ => None,
    }
}

/// Shortest round-trip rendering, with an exponent outside `1e-4..1e16`.
/// Non-finite values render as `Inf`, `-Inf` and `NaN`.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Inf".into() } else { "-Inf".into() };
    }
    render_finite(value)
}

pub(crate) fn render_finite(value: f64) -> String {
    let debug = format!("{value:?}");
    let Some((mantissa, exponent)) = debug.split_once('e') else {
        return debug;
    };

    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(rest) => ('-', rest),
        None => ('+', exponent),
    };
    let mantissa = mantissa.strip_suffix(".0").unwrap_or(mantissa);
    format!("{mantissa}e{sign}{digits:0>2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_radix_prefixes() {
        assert_eq!(parse_int("0x1F"), Some(BigInt::from(31)));
        assert_eq!(parse_int("-0b101"), Some(BigInt::from(-5)));
        assert_eq!(parse_int(" 42 "), Some(BigInt::from(42)));
        assert_eq!(parse_int("4x"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn parses_huge_integers() {
        let big = parse_int("123456789012345678901234567890").unwrap();
        assert_eq!(big.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn parses_doubles() {
        assert_eq!(parse_double("1.5"), Some(1.5));
        assert_eq!(parse_double("1e3"), Some(1000.0));
        assert_eq!(parse_double("0x10"), Some(16.0));
        assert_eq!(parse_double("abc"), None);
        assert!(parse_double("Inf").unwrap().is_infinite());
    }

    #[test]
    fn parses_booleans() {
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("t"), Some(true));
        assert_eq!(parse_bool("OFF"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("2.5"), Some(true));
        assert_eq!(parse_bool("o"), None);
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn formats_doubles() {
        assert_eq!(format_double(4.0), "4.0");
        assert_eq!(format_double(0.5), "0.5");
        assert_eq!(format_double(1e16), "1e+16");
        assert_eq!(format_double(1.5e-7), "1.5e-07");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Inf");
    }
}
