//! Typed literal rendering.
//!
//! Every constant is written so PostgreSQL infers exactly the intended type:
//! suffix casts for the narrow and wide integers, floats and numerics,
//! prefixed literals for temporal types, `E''` strings for text.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::ast::{Interval, Value};

const MICROS_PER_SECOND: u64 = 1_000_000;
const MICROS_PER_DAY: u64 = 86_400 * MICROS_PER_SECOND;

/// Append the SQL literal for `value`.
pub fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Bool(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
        Value::Byte(v) => write_suffixed(&v.to_string(), false, "int2", out),
        Value::SByte(v) => write_suffixed(&v.to_string(), *v < 0, "int2", out),
        Value::Int16(v) => write_suffixed(&v.to_string(), *v < 0, "int2", out),
        Value::Int32(v) => out.push_str(&v.to_string()),
        Value::Int64(v) => write_suffixed(&v.to_string(), *v < 0, "int8", out),
        Value::Single(v) => write_float(f64::from(*v), &v.to_string(), "float4", out),
        Value::Double(v) => write_float(*v, &v.to_string(), "float8", out),
        Value::Decimal(v) => write_suffixed(&v.to_string(), v.is_sign_negative() && !v.is_zero(), "numeric", out),
        Value::String(s) => write_string(s, out),
        Value::Binary(bytes) => {
            out.push_str("decode('");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("', 'base64')");
        }
        Value::Guid(g) => {
            out.push('\'');
            out.push_str(&g.to_string());
            out.push_str("'::uuid");
        }
        Value::DateTime(dt) => {
            out.push_str("TIMESTAMP '");
            out.push_str(&dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string());
            out.push('\'');
        }
        Value::DateTimeOffset(dt) => {
            out.push_str("TIMESTAMP WITH TIME ZONE '");
            out.push_str(&dt.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string());
            out.push('\'');
        }
        Value::Time(interval) => {
            out.push_str("INTERVAL '");
            out.push_str(&format_interval(*interval));
            out.push('\'');
        }
    }
}

pub fn to_literal(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// `text::type`, parenthesizing negatives so the cast binds to the whole number.
fn write_suffixed(text: &str, negative: bool, ty: &str, out: &mut String) {
    if negative {
        out.push('(');
        out.push_str(text);
        out.push(')');
    } else {
        out.push_str(text);
    }
    out.push_str("::");
    out.push_str(ty);
}

fn write_float(value: f64, text: &str, ty: &str, out: &mut String) {
    if value.is_nan() {
        write_suffixed("'NaN'", false, ty, out);
    } else if value.is_infinite() {
        let text = if value > 0.0 { "'Infinity'" } else { "'-Infinity'" };
        write_suffixed(text, false, ty, out);
    } else {
        write_suffixed(text, value.is_sign_negative() && value != 0.0, ty, out);
    }
}

/// Escape-string literal: backslashes and single quotes are backslash-escaped.
pub fn write_string(s: &str, out: &mut String) {
    out.push_str("E'");
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

/// Interval in PostgreSQL's `D days HH:MM:SS.ffffff` input syntax.
pub fn format_interval(interval: Interval) -> String {
    let sign = if interval.micros < 0 { "-" } else { "" };
    let abs = interval.micros.unsigned_abs();
    let days = abs / MICROS_PER_DAY;
    let rem = abs % MICROS_PER_DAY;

    let mut parts = Vec::new();
    if days > 0 {
        let unit = if days == 1 { "day" } else { "days" };
        parts.push(format!("{sign}{days} {unit}"));
    }
    if rem > 0 || days == 0 {
        let seconds = rem / MICROS_PER_SECOND;
        let fraction = rem % MICROS_PER_SECOND;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        );
        if fraction > 0 {
            clock.push_str(&format!(".{fraction:06}"));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    #[test]
    fn test_integers() {
        assert_eq!(to_literal(&Value::Int32(-5)), "-5");
        assert_eq!(to_literal(&Value::Int64(-5)), "(-5)::int8");
        assert_eq!(to_literal(&Value::Int64(42)), "42::int8");
        assert_eq!(to_literal(&Value::Int16(7)), "7::int2");
        assert_eq!(to_literal(&Value::SByte(-1)), "(-1)::int2");
        assert_eq!(to_literal(&Value::Byte(255)), "255::int2");
    }

    #[test]
    fn test_floats() {
        assert_eq!(to_literal(&Value::Double(f64::NAN)), "'NaN'::float8");
        assert_eq!(to_literal(&Value::Double(f64::INFINITY)), "'Infinity'::float8");
        assert_eq!(to_literal(&Value::Double(f64::NEG_INFINITY)), "'-Infinity'::float8");
        assert_eq!(to_literal(&Value::Double(-1.5)), "(-1.5)::float8");
        assert_eq!(to_literal(&Value::Double(2.25)), "2.25::float8");
        assert_eq!(to_literal(&Value::Single(0.5)), "0.5::float4");
        assert_eq!(to_literal(&Value::Single(f32::NAN)), "'NaN'::float4");
    }

    #[test]
    fn test_decimal() {
        let d = Decimal::from_str("-12.50").unwrap();
        assert_eq!(to_literal(&Value::Decimal(d)), "(-12.50)::numeric");
        let d = Decimal::from_str("3.14").unwrap();
        assert_eq!(to_literal(&Value::Decimal(d)), "3.14::numeric");
    }

    #[test]
    fn test_strings_escape_backslash_and_quote() {
        assert_eq!(to_literal(&Value::from("it's")), r"E'it\'s'");
        assert_eq!(to_literal(&Value::from(r"C:\temp")), r"E'C:\\temp'");
    }

    #[test]
    fn test_misc_kinds() {
        assert_eq!(to_literal(&Value::Bool(true)), "TRUE");
        assert_eq!(to_literal(&Value::Binary(vec![1, 2, 3])), "decode('AQID', 'base64')");
        let g = Uuid::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            to_literal(&Value::Guid(g)),
            "'67e55044-10b1-426f-9247-bb680e5fe0c8'::uuid"
        );
    }

    #[test]
    fn test_temporal() {
        let dt = NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_micro_opt(23, 59, 59, 999_000)
            .unwrap();
        assert_eq!(
            to_literal(&Value::DateTime(dt)),
            "TIMESTAMP '1999-12-31T23:59:59.999000'"
        );
        let offset = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let dto = dt.and_local_timezone(offset).unwrap();
        assert_eq!(
            to_literal(&Value::DateTimeOffset(dto)),
            "TIMESTAMP WITH TIME ZONE '1999-12-31T23:59:59.999000+02:00'"
        );
    }

    #[test]
    fn test_intervals() {
        assert_eq!(format_interval(Interval::from_hms(3, 3, 0)), "03:03:00");
        assert_eq!(format_interval(Interval::from_micros(0)), "00:00:00");
        let delta = TimeDelta::days(1) + TimeDelta::microseconds(1_500_000);
        assert_eq!(format_interval(delta.into()), "1 day 00:00:01.500000");
        assert_eq!(format_interval(Interval::from_hms(-50, 0, 0)), "-2 days -02:00:00");
        assert_eq!(
            to_literal(&Value::Time(Interval::from_hms(0, 1, 0))),
            "INTERVAL '00:01:00'"
        );
    }
}
