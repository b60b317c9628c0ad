//! Text <-> number conversion for variable values and factors.
//!
//! Values are stored as text and coerced at the point of use. Coercion is
//! deliberately narrower than `f64::from_str`: spellings such as `inf` or
//! `nan` are not numbers here and coerce to `NaN`.

use std::sync::LazyLock;

static DECIMAL_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap()
});

static RADIX_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^0([xXoObB])([0-9a-fA-F]+)$").unwrap());

/// Coerce text to a number. Anything unrecognised (including empty text) is `NaN`.
pub fn coerce(text: &str) -> f64 {
    let text = text.trim();
    match text {
        "" => return f64::NAN,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if DECIMAL_RE.is_match(text) {
        return text.parse().unwrap_or(f64::NAN);
    }

    if let Some(caps) = RADIX_RE.captures(text) {
        let radix = match &caps[1] {
            "x" | "X" => 16,
            "o" | "O" => 8,
            _ => 2,
        };
        return parse_radix(&caps[2], radix);
    }

    f64::NAN
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    let mut value = 0.0_f64;
    for ch in digits.chars() {
        match ch.to_digit(radix) {
            Some(digit) => value = value * f64::from(radix) + f64::from(digit),
            None => return f64::NAN,
        }
    }
    value
}

/// Render a number the way it is written back into a variable.
///
/// Integral values carry no fractional suffix, `-0` renders as `0`, and
/// non-finite values render as `NaN`, `Infinity` or `-Infinity`.
pub fn format(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_decimal_forms() {
        assert_eq!(coerce("8"), 8.0);
        assert_eq!(coerce(" -2.5 "), -2.5);
        assert_eq!(coerce(".5"), 0.5);
        assert_eq!(coerce("5."), 5.0);
        assert_eq!(coerce("1e3"), 1000.0);
        assert_eq!(coerce("+4"), 4.0);
    }

    #[test]
    fn coerces_radix_prefixes() {
        assert_eq!(coerce("0x10"), 16.0);
        assert_eq!(coerce("0o17"), 15.0);
        assert_eq!(coerce("0b101"), 5.0);
        assert!(coerce("0b102").is_nan());
    }

    #[test]
    fn coerces_infinity_spellings_only_in_full() {
        assert_eq!(coerce("Infinity"), f64::INFINITY);
        assert_eq!(coerce("-Infinity"), f64::NEG_INFINITY);
        assert!(coerce("inf").is_nan());
        assert!(coerce("nan").is_nan());
    }

    #[test]
    fn non_numeric_and_empty_are_nan() {
        assert!(coerce("").is_nan());
        assert!(coerce("   ").is_nan());
        assert!(coerce("abc").is_nan());
        assert!(coerce("1 2").is_nan());
        assert!(coerce("--1").is_nan());
    }

    #[test]
    fn format_drops_integral_suffix() {
        assert_eq!(format(8.0), "8");
        assert_eq!(format(-0.0), "0");
        assert_eq!(format(2.5), "2.5");
        assert_eq!(format(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn format_names_non_finite_values() {
        assert_eq!(format(f64::NAN), "NaN");
        assert_eq!(format(f64::INFINITY), "Infinity");
        assert_eq!(format(f64::NEG_INFINITY), "-Infinity");
        assert!(coerce(&format(f64::NEG_INFINITY)).is_infinite());
    }
}
