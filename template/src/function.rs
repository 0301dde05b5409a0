use crate::{
    format::{
        decimal_to_time_string,
        format_number,
        pad_str,
        round_half_up,
    },
    TemplateError,
    Value,
};
use chrono::{
    DateTime,
    Local,
    Utc,
};
use std::fmt::{
    self,
    Write as _,
};

/// Helpers callable from a template.
///
/// The numeric helpers also accept their `Math.` spelling so existing templates
/// like `${Math.round(speed * 3.6)}` keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
pub enum Function {
    #[strum(to_string = "round", serialize = "Math.round")]
    Round,
    #[strum(to_string = "floor", serialize = "Math.floor")]
    Floor,
    #[strum(to_string = "ceil", serialize = "Math.ceil")]
    Ceil,
    #[strum(to_string = "abs", serialize = "Math.abs")]
    Abs,
    #[strum(to_string = "min", serialize = "Math.min")]
    Min,
    #[strum(to_string = "max", serialize = "Math.max")]
    Max,
    /// `fixed(n, digits)`: fixed number of fraction digits.
    #[strum(to_string = "fixed")]
    Fixed,
    #[strum(to_string = "padNum")]
    PadNum,
    #[strum(to_string = "decimalToTimeString")]
    DecimalToTimeString,
    /// `formatDate(value, pattern)`: RFC 3339 text or epoch milliseconds in
    /// local time, `strftime` pattern defaults to `%-m/%-d/%Y`.
    #[strum(to_string = "formatDate")]
    FormatDate,
    /// `formatDuration(seconds, pattern)`: a seconds count as a time of day,
    /// pattern defaults to `%H:%M:%S`.
    #[strum(to_string = "formatDuration")]
    FormatDuration,
    #[strum(to_string = "upper")]
    Upper,
    #[strum(to_string = "lower")]
    Lower,
}

const DEFAULT_DATE_PATTERN: &str = "%-m/%-d/%Y";
const DEFAULT_DURATION_PATTERN: &str = "%H:%M:%S";
const MAX_FIXED_DIGITS: f64 = 20.0;

impl Function {
    fn arity(self) -> (usize, usize) {
        match self {
            Function::Round
            | Function::Floor
            | Function::Ceil
            | Function::Abs
            | Function::PadNum
            | Function::DecimalToTimeString
            | Function::Upper
            | Function::Lower => (1, 1),
            Function::Min | Function::Max => (1, usize::MAX),
            Function::Fixed | Function::FormatDate | Function::FormatDuration => (1, 2),
        }
    }

    pub(crate) fn check_arity(self, found: usize) -> Result<(), TemplateError> {
        let (min, max) = self.arity();
        if (min..=max).contains(&found) {
            return Ok(());
        }
        let expected = match (min, max) {
            (min, usize::MAX) => format!("at least {min}"),
            (min, max) if min == max => min.to_string(),
            (min, max) => format!("{min} to {max}"),
        };
        Err(TemplateError::Arity {
            function: self,
            expected,
            found,
        })
    }

    /// Apply the helper. Arity was checked at compile time, missing optional
    /// arguments read as `undefined`.
    pub fn call(self, args: &[Value]) -> Value {
        let arg = |index: usize| args.get(index).unwrap_or(&Value::Undefined);
        let number = |index: usize| arg(index).to_number();

        match self {
            Function::Round => Value::Number(round_half_up(number(0))),
            Function::Floor => Value::Number(number(0).floor()),
            Function::Ceil => Value::Number(number(0).ceil()),
            Function::Abs => Value::Number(number(0).abs()),
            Function::Min => Value::Number(fold_numbers(args, f64::INFINITY, f64::min)),
            Function::Max => Value::Number(fold_numbers(args, f64::NEG_INFINITY, f64::max)),
            Function::Fixed => fixed(number(0), arg(1)),
            Function::PadNum => match arg(0) {
                value if value.is_nullish() => Value::String("00".to_string()),
                value => Value::String(pad_str(&value.to_string())),
            },
            Function::DecimalToTimeString => {
                let input = arg(0);
                let minutes = (!input.is_nullish()).then(|| input.to_number());
                Value::String(decimal_to_time_string(minutes))
            }
            Function::FormatDate => format_date(arg(0), arg(1)),
            Function::FormatDuration => format_duration(arg(0), arg(1)),
            Function::Upper => Value::String(arg(0).to_string().to_uppercase()),
            Function::Lower => Value::String(arg(0).to_string().to_lowercase()),
        }
    }
}

/// `NaN` in any argument poisons the result.
fn fold_numbers(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    args.iter().map(Value::to_number).fold(init, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            pick(acc, n)
        }
    })
}

fn fixed(n: f64, digits: &Value) -> Value {
    if !n.is_finite() {
        return Value::String(format_number(n));
    }
    let digits = if digits.is_nullish() {
        0.0
    } else {
        digits.to_number()
    };
    let digits = if digits.is_nan() {
        0
    } else {
        digits.clamp(0.0, MAX_FIXED_DIGITS) as usize
    };
    let scale = 10f64.powi(digits as i32);
    let scaled = n * scale;
    // Huge values have no fraction left to round.
    if !scaled.is_finite() {
        return Value::String(format_number(n));
    }
    let rounded = round_half_up(scaled) / scale;
    let text = format!("{rounded:.digits$}");
    // "-0.0" after rounding a tiny negative number reads oddly.
    match text.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => Value::String(rest.to_string()),
        _ => Value::String(text),
    }
}

fn pattern<'a>(value: &'a Value, default: &'a str) -> &'a str {
    match value {
        Value::String(pattern) => pattern.as_str(),
        _ => default,
    }
}

fn strftime(formatted: impl fmt::Display) -> Value {
    let mut out = String::new();
    // Invalid patterns surface as a formatting error rather than a panic.
    match write!(out, "{formatted}") {
        Ok(()) => Value::String(out),
        Err(_) => Value::Undefined,
    }
}

fn format_date(value: &Value, pattern_arg: &Value) -> Value {
    let timestamp = match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|date| date.with_timezone(&Utc)),
        Value::Number(millis) if millis.is_finite() => DateTime::from_timestamp_millis(*millis as i64),
        _ => None,
    };
    let Some(timestamp) = timestamp else {
        return Value::Undefined;
    };
    let local = timestamp.with_timezone(&Local);
    strftime(local.format(pattern(pattern_arg, DEFAULT_DATE_PATTERN)))
}

fn format_duration(value: &Value, pattern_arg: &Value) -> Value {
    let seconds = value.to_number();
    if !seconds.is_finite() || seconds < 0.0 {
        return Value::Undefined;
    }
    let millis = (seconds * 1000.0) as i64;
    let Some(elapsed) = DateTime::from_timestamp_millis(millis) else {
        return Value::Undefined;
    };
    strftime(elapsed.format(pattern(pattern_arg, DEFAULT_DURATION_PATTERN)))
}
