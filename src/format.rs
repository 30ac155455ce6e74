//! Text rendering for trace record values
//!
//! All rendering is locale-independent. Floating point values use the
//! conventions of C's `%g` so that trace files stay comparable with files
//! produced by other Scansion writers.

/// Significant digits used by [`format_g`]
const G_PRECISION: i32 = 6;

/// Render a float the way C's `%g` does
///
/// Six significant digits, trailing zeros removed, exponent form when the
/// decimal exponent is below -4 or at least 6.
///
/// ```
/// use scantrace::format::format_g;
///
/// assert_eq!(format_g(1e-8), "1e-08");
/// assert_eq!(format_g(0.25), "0.25");
/// assert_eq!(format_g(1234567.0), "1.23457e+06");
/// ```
pub fn format_g(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // Round to the target precision first; rounding can bump the exponent
    // (999999.7 becomes 1e+06).
    let sci = format!("{:.*e}", (G_PRECISION - 1) as usize, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= G_PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (G_PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// Drop trailing zeros of a fractional part, and the point if nothing is left
fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Render an address as `0x` followed by uppercase hex digits
pub fn format_address(address: u64) -> String {
    format!("0x{:X}", address)
}

/// Render a byte buffer as `0x` followed by two uppercase hex digits per
/// byte, most-significant (last) byte first
///
/// The buffer is read as a little-endian value regardless of how the payload
/// stores it internally.
pub fn format_hex_msb_first(bytes: &[u8]) -> String {
    let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
    format!("0x{}", hex::encode_upper(reversed))
}

/// Render a bool as the `True` / `False` spelling used in property values
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Escape XML special characters for use inside an attribute value
pub fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_g_small_times() {
        assert_eq!(format_g(1e-8), "1e-08");
        assert_eq!(format_g(2.5e-9), "2.5e-09");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(0.00001), "1e-05");
    }

    #[test]
    fn test_format_g_fixed_range() {
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(1.0), "1");
        assert_eq!(format_g(100.0), "100");
        assert_eq!(format_g(1.23456789), "1.23457");
        assert_eq!(format_g(-42.5), "-42.5");
        assert_eq!(format_g(123456.0), "123456");
    }

    #[test]
    fn test_format_g_large_values() {
        assert_eq!(format_g(1234567.0), "1.23457e+06");
        assert_eq!(format_g(999999.7), "1e+06");
        assert_eq!(format_g(1e21), "1e+21");
    }

    #[test]
    fn test_format_g_non_finite() {
        assert_eq!(format_g(f64::NAN), "nan");
        assert_eq!(format_g(f64::INFINITY), "inf");
        assert_eq!(format_g(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(0), "0x0");
        assert_eq!(format_address(0xdead_beef), "0xDEADBEEF");
    }

    #[test]
    fn test_hex_msb_first() {
        assert_eq!(format_hex_msb_first(&[0x12, 0x34]), "0x3412");
        assert_eq!(format_hex_msb_first(&[0x0a]), "0x0A");
        assert_eq!(format_hex_msb_first(&[]), "0x");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
        assert_eq!(escape_attr("plain"), "plain");
    }

    #[test]
    fn test_format_bool() {
        assert_eq!(format_bool(true), "True");
        assert_eq!(format_bool(false), "False");
    }
}
