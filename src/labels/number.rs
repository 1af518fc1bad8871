use serde::Deserialize;

/// Significant digits used by the compact format.
const COMPACT_PRECISION: usize = 6;

/// How numeric label fields are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// C `%g`: six significant digits, trailing zeros trimmed, exponent form
    /// below 1e-4 and from 1e6 upward. Matches label files produced by
    /// earlier tooling byte for byte.
    #[default]
    Compact,
    /// Shortest representation that parses back to the same `f64`.
    Exact,
}

impl NumberFormat {
    pub fn format(self, value: f64) -> String {
        match self {
            NumberFormat::Compact => format_compact(value),
            NumberFormat::Exact => format!("{}", value),
        }
    }
}

fn format_compact(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // The exponent has to come from the rounded value, e.g. 9.9999996 -> 10.
    let scientific = format!("{:.*e}", COMPACT_PRECISION - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if exponent < -4 || exponent >= COMPACT_PRECISION as i32 {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exponent < 0 { '-' } else { '+' },
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (COMPACT_PRECISION as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(value: f64) -> String {
        NumberFormat::Compact.format(value)
    }

    #[test]
    fn compact_matches_printf_g() {
        assert_eq!(g(0.25), "0.25");
        assert_eq!(g(0.1 + 0.2), "0.3");
        assert_eq!(g(1.0), "1");
        assert_eq!(g(-0.5), "-0.5");
        assert_eq!(g(0.123456789), "0.123457");
        assert_eq!(g(0.0001), "0.0001");
        assert_eq!(g(0.00001), "1e-05");
        assert_eq!(g(100000.0), "100000");
        assert_eq!(g(1234567.0), "1.23457e+06");
        assert_eq!(g(9.9999996), "10");
        assert_eq!(g(640.0), "640");
    }

    #[test]
    fn compact_special_values() {
        assert_eq!(g(0.0), "0");
        assert_eq!(g(-0.0), "-0");
        assert_eq!(g(f64::INFINITY), "inf");
        assert_eq!(g(f64::NEG_INFINITY), "-inf");
        assert_eq!(g(f64::NAN), "nan");
    }

    #[test]
    fn exact_round_trips() {
        let value = 0.1 + 0.2;
        let text = NumberFormat::Exact.format(value);
        assert_eq!(text.parse::<f64>().unwrap(), value);
        assert_eq!(NumberFormat::Exact.format(0.25), "0.25");
        assert_eq!(NumberFormat::Exact.format(1.0), "1");
    }
}
