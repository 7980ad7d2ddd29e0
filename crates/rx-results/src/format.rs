//! Fixed-width text layout of the `.dat` streams.
//!
//! Header: a leading space, then `time(s)` and every column label
//! left-justified to 13 characters, always followed by at least one space. Rows: every value (time first) in
//! scientific notation with five decimals, right-aligned to 12 characters and
//! followed by a single space. Exponents carry a sign and at least two digits
//! (`1.00000e+00`), which keeps columns aligned for exponents below 100.

const LABEL_WIDTH: usize = 13;
const VALUE_WIDTH: usize = 12;

pub const TIME_LABEL: &str = "time(s)";

pub fn format_header<S: AsRef<str>>(columns: &[S]) -> String {
    let mut line = String::with_capacity(1 + LABEL_WIDTH * (columns.len() + 1));
    line.push(' ');
    for label in std::iter::once(TIME_LABEL).chain(columns.iter().map(AsRef::as_ref)) {
        line.push_str(&format!("{label:<width$} ", width = LABEL_WIDTH - 1));
    }
    line
}

pub fn format_row(time: f64, values: &[f64]) -> String {
    let mut line = String::with_capacity((VALUE_WIDTH + 1) * (values.len() + 1));
    for v in std::iter::once(&time).chain(values) {
        line.push_str(&format_value(*v));
        line.push(' ');
    }
    line
}

/// One value in `12.5e` layout.
pub fn format_value(v: f64) -> String {
    let text = if v.is_nan() {
        "nan".to_string()
    } else if v == f64::INFINITY {
        "inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        let raw = format!("{v:.5e}");
        match raw.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exponent.abs())
            }
            None => raw,
        }
    };
    format!("{text:>VALUE_WIDTH$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_use_signed_two_digit_exponents() {
        assert_eq!(format_value(1.0), " 1.00000e+00");
        assert_eq!(format_value(-2.5e-7), "-2.50000e-07");
        assert_eq!(format_value(0.0), " 0.00000e+00");
        assert_eq!(format_value(6.02e123), "6.02000e+123");
        assert_eq!(format_value(f64::NAN), "         nan");
    }

    #[test]
    fn header_is_left_justified() {
        let header = format_header(&["power(-)", "cdnp-000(-)"]);
        assert_eq!(header, " time(s)      power(-)     cdnp-000(-)  ");
    }

    #[test]
    fn long_labels_stay_separated() {
        let header = format_header(&["downcomer-lowerplenum", "core-hot"]);
        assert_eq!(header, " time(s)      downcomer-lowerplenum core-hot     ");
        assert_eq!(header.split_whitespace().count(), 3);
    }

    #[test]
    fn row_has_trailing_space_per_value() {
        assert_eq!(format_row(1.0, &[2.0]), " 1.00000e+00  2.00000e+00 ");
    }

    #[test]
    fn formatted_values_parse_back() {
        for v in [1.0, -3.25e-12, 7.5e8, 1.23456e-300] {
            let parsed: f64 = format_value(v).trim().parse().unwrap();
            assert!((parsed - v).abs() <= 1e-5 * v.abs());
        }
    }
}
