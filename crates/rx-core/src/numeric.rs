use crate::RxError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, RxError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RxError::NonFinite { what, value: v })
    }
}

/// Finite and strictly positive (absolute temperatures, densities, time constants).
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, RxError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(RxError::OutOfRange { what, value: v })
    }
}

/// Index of the first non-finite entry, if any.
pub fn first_non_finite(values: &[Real]) -> Option<usize> {
    values.iter().position(|v| !v.is_finite())
}

pub fn ensure_len(what: &'static str, expected: usize, actual: usize) -> Result<(), RxError> {
    if expected == actual {
        Ok(())
    } else {
        Err(RxError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Slack used when comparing a solver time against a requested end time.
pub fn time_slack(t_end: Real) -> Real {
    1e-9 * t_end.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(ensure_positive(1.0, "t").is_ok());
        assert!(matches!(
            ensure_positive(0.0, "t"),
            Err(RxError::OutOfRange { .. })
        ));
        assert!(matches!(
            ensure_positive(-3.0, "t"),
            Err(RxError::OutOfRange { .. })
        ));
        assert!(matches!(
            ensure_positive(Real::INFINITY, "t"),
            Err(RxError::NonFinite { .. })
        ));
    }

    #[test]
    fn first_non_finite_finds_index() {
        assert_eq!(first_non_finite(&[1.0, 2.0]), None);
        assert_eq!(first_non_finite(&[1.0, Real::NAN, Real::INFINITY]), Some(1));
    }

    #[test]
    fn ensure_len_reports_both_sides() {
        let err = ensure_len("state", 3, 2).unwrap_err();
        assert_eq!(
            err,
            RxError::LengthMismatch {
                what: "state",
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn time_slack_has_an_absolute_floor_near_zero() {
        assert_eq!(time_slack(0.0), 1e-9);
        assert_eq!(time_slack(0.5), 1e-9);
        assert_eq!(time_slack(-1e-3), 1e-9);
    }

    proptest! {
        #[test]
        fn time_slack_never_drops_below_floor(t in -1e9f64..1e9) {
            prop_assert!(time_slack(t) >= 1e-9);
            prop_assert_eq!(time_slack(t), time_slack(-t));
        }

        #[test]
        fn time_slack_scales_with_large_times(t in 1.0f64..1e9, k in 1.0f64..1e3) {
            let ratio = time_slack(t) / t;
            prop_assert!((ratio - 1e-9).abs() <= 1e-21);
            prop_assert!(time_slack(k * t) >= time_slack(t));
            prop_assert!(t + time_slack(t) > t);
        }
    }
}
