//! Stateless formatting helpers shared by the template functions.

/// Render a number the way template authors expect to see it: integral values
/// without a fraction, `NaN` and `Infinity` spelled out, and no negative zero.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// Round half towards positive infinity, matching `Math.round`.
pub(crate) fn round_half_up(n: f64) -> f64 {
    let floor = n.floor();
    if n - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Zero-pad to at least two digits, `None` becomes `"00"`.
pub fn pad_num(n: Option<u64>) -> String {
    match n {
        Some(n) => pad_str(&n.to_string()),
        None => "00".to_string(),
    }
}

pub(crate) fn pad_str(s: &str) -> String {
    format!("{s:0>2}")
}

/// Convert fractional minutes (e.g. a pace of `5.5` min/km) into `m:ss`, or
/// `hh:mm:ss` once the whole minutes reach an hour.
///
/// Seconds are rounded and carried into the minutes, so `4.999` reads `5:00`.
/// A missing or non-finite input yields `"0:00"`.
pub fn decimal_to_time_string(decimal_minutes: Option<f64>) -> String {
    let Some(dec) = decimal_minutes.filter(|d| d.is_finite()) else {
        return "0:00".to_string();
    };
    if dec < 0.0 {
        return format!("-{}", decimal_to_time_string(Some(-dec)));
    }

    let whole_minutes = dec.floor();
    let mut seconds = round_half_up(60.0 * (dec % 1.0)) as u64;
    let mut minutes = whole_minutes as u64;
    if seconds >= 60 {
        minutes += seconds / 60;
        seconds %= 60;
    }

    if whole_minutes >= 60.0 {
        let hours = minutes / 60;
        let minutes = minutes % 60;
        return format!("{}:{}:{}", pad_num(Some(hours)), pad_num(Some(minutes)), pad_num(Some(seconds)));
    }

    // No padding on the minutes, a pace of 5:30 should not read 05:30.
    format!("{minutes}:{}", pad_num(Some(seconds)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn rounding_matches_math_round() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(0.49999999999999994), 0.0);
        assert_eq!(round_half_up(327.8), 328.0);
        assert!(round_half_up(f64::NAN).is_nan());
    }

    #[test]
    fn pads_numbers() {
        assert_eq!(pad_num(None), "00");
        for n in 0..100u64 {
            let padded = pad_num(Some(n));
            assert!(padded.len() >= 2);
            if n < 10 {
                assert_eq!(padded, format!("0{n}"));
            } else {
                assert_eq!(padded, n.to_string());
            }
        }
        assert_eq!(pad_num(Some(123)), "123");
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(decimal_to_time_string(None), "0:00");
        assert_eq!(decimal_to_time_string(Some(0.0)), "0:00");
        assert_eq!(decimal_to_time_string(Some(5.5)), "5:30");
        assert_eq!(decimal_to_time_string(Some(12.25)), "12:15");
        assert_eq!(decimal_to_time_string(Some(59.0)), "59:00");
    }

    #[test]
    fn hours_once_past_sixty_minutes() {
        assert_eq!(decimal_to_time_string(Some(60.0)), "01:00:00");
        assert_eq!(decimal_to_time_string(Some(75.5)), "01:15:30");
        assert_eq!(decimal_to_time_string(Some(605.25)), "10:05:15");
    }

    #[test]
    fn shape_follows_whole_minutes() {
        for tenths in 0..2000u32 {
            let d = f64::from(tenths) / 10.0;
            let parts = decimal_to_time_string(Some(d)).split(':').count();
            if d.floor() < 60.0 {
                assert_eq!(parts, 2, "{d}");
            } else {
                assert_eq!(parts, 3, "{d}");
            }
        }
    }

    #[test]
    fn rounded_seconds_carry_into_minutes() {
        assert_eq!(decimal_to_time_string(Some(4.999)), "5:00");
        assert_eq!(decimal_to_time_string(Some(59.999)), "60:00");
        assert_eq!(decimal_to_time_string(Some(119.999)), "02:00:00");
    }

    #[test]
    fn odd_inputs_do_not_fail() {
        assert_eq!(decimal_to_time_string(Some(f64::NAN)), "0:00");
        assert_eq!(decimal_to_time_string(Some(-1.5)), "-1:30");
    }
}
