//! The date/time builtins, backed by `oxsdatatypes` for `xsd:dateTime`
//! parsing and `time` for the wall clock.

use super::value::{ExprError, ExprResult, Value};
use oxsdatatypes::DateTime;
use quadflow_model::vocab::xsd;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// `NOW()`: the current instant as an `xsd:dateTime` literal, evaluated
/// per call.
pub(super) fn now() -> ExprResult<Value> {
    let formatted = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|_| ExprError)?;
    Ok(Value::Str(format!(
        "\"{formatted}\"^^<{}>",
        xsd::DATE_TIME
    )))
}

pub(super) fn year(value: &Value) -> ExprResult<Value> {
    Ok(Value::Integer(parse_datetime(value)?.year()))
}

pub(super) fn month(value: &Value) -> ExprResult<Value> {
    Ok(Value::Integer(i64::from(parse_datetime(value)?.month())))
}

pub(super) fn day(value: &Value) -> ExprResult<Value> {
    Ok(Value::Integer(i64::from(parse_datetime(value)?.day())))
}

pub(super) fn hours(value: &Value) -> ExprResult<Value> {
    Ok(Value::Integer(i64::from(parse_datetime(value)?.hour())))
}

pub(super) fn minutes(value: &Value) -> ExprResult<Value> {
    Ok(Value::Integer(i64::from(parse_datetime(value)?.minute())))
}

pub(super) fn seconds(value: &Value) -> ExprResult<Value> {
    let datetime = parse_datetime(value)?;
    datetime
        .second()
        .to_string()
        .parse()
        .map(Value::Double)
        .map_err(|_| ExprError)
}

/// `TZ()`: the timezone part of the lexical form — `"Z"`, `"+05:00"`, or
/// the empty string when the literal carries no timezone.
pub(super) fn tz(value: &Value) -> ExprResult<Value> {
    parse_datetime(value)?;
    let content = value.string_content()?;
    Ok(Value::simple_string(
        timezone_suffix(&content).unwrap_or(""),
    ))
}

/// `TIMEZONE()`: the timezone as an `xsd:dayTimeDuration`; a missing
/// timezone is a row-level error per SPARQL.
pub(super) fn timezone(value: &Value) -> ExprResult<Value> {
    parse_datetime(value)?;
    let content = value.string_content()?;
    let suffix = timezone_suffix(&content).ok_or(ExprError)?;
    let duration = offset_as_day_time_duration(suffix)?;
    Ok(Value::Str(format!(
        "\"{duration}\"^^<{}>",
        xsd::DAY_TIME_DURATION
    )))
}

fn parse_datetime(value: &Value) -> ExprResult<DateTime> {
    let Value::Str(raw) = value else {
        return Err(ExprError);
    };
    if !raw.starts_with('"') {
        return Err(ExprError);
    }
    let content = value.string_content()?;
    DateTime::from_str(&content).map_err(|_| ExprError)
}

/// Extracts the trailing timezone designator of an `xsd:dateTime` lexical
/// form, if any.
fn timezone_suffix(lexical: &str) -> Option<&str> {
    if lexical.ends_with('Z') {
        return Some("Z");
    }
    // ±hh:mm, always the last six characters when present. The date part
    // also contains '-', so only the tail position counts.
    if lexical.len() >= 6 {
        let tail = &lexical[lexical.len() - 6..];
        let bytes = tail.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            return Some(tail);
        }
    }
    None
}

fn offset_as_day_time_duration(suffix: &str) -> ExprResult<String> {
    if suffix == "Z" || suffix == "+00:00" || suffix == "-00:00" {
        return Ok("PT0S".to_owned());
    }
    let negative = suffix.starts_with('-');
    let hours: u32 = suffix[1..3].parse().map_err(|_| ExprError)?;
    let minutes: u32 = suffix[4..6].parse().map_err(|_| ExprError)?;
    let mut duration = String::new();
    if negative {
        duration.push('-');
    }
    duration.push_str("PT");
    if hours > 0 {
        duration.push_str(&format!("{hours}H"));
    }
    if minutes > 0 || hours == 0 {
        duration.push_str(&format!("{minutes}M"));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(lexical: &str) -> Value {
        Value::Str(format!("\"{lexical}\"^^<{}>", xsd::DATE_TIME))
    }

    #[test]
    fn component_extraction() {
        let value = datetime("2011-01-10T14:45:13.815-05:00");
        assert_eq!(year(&value).unwrap(), Value::Integer(2011));
        assert_eq!(month(&value).unwrap(), Value::Integer(1));
        assert_eq!(day(&value).unwrap(), Value::Integer(10));
        assert_eq!(hours(&value).unwrap(), Value::Integer(14));
        assert_eq!(minutes(&value).unwrap(), Value::Integer(45));
        assert_eq!(seconds(&value).unwrap(), Value::Double(13.815));
    }

    #[test]
    fn timezone_forms() {
        assert_eq!(
            tz(&datetime("2011-01-10T14:45:13Z")).unwrap(),
            Value::simple_string("Z")
        );
        assert_eq!(
            tz(&datetime("2011-01-10T14:45:13-05:00")).unwrap(),
            Value::simple_string("-05:00")
        );
        assert_eq!(
            tz(&datetime("2011-01-10T14:45:13")).unwrap(),
            Value::simple_string("")
        );
        assert_eq!(
            timezone(&datetime("2011-01-10T14:45:13Z")).unwrap(),
            Value::Str(format!("\"PT0S\"^^<{}>", xsd::DAY_TIME_DURATION))
        );
        assert_eq!(
            timezone(&datetime("2011-01-10T14:45:13-05:00")).unwrap(),
            Value::Str(format!("\"-PT5H\"^^<{}>", xsd::DAY_TIME_DURATION))
        );
        assert!(timezone(&datetime("2011-01-10T14:45:13")).is_err());
    }

    #[test]
    fn year_on_a_plain_string_is_an_error() {
        assert!(year(&Value::simple_string("not a date")).is_err());
        assert!(year(&Value::Integer(2020)).is_err());
    }

    #[test]
    fn now_produces_a_datetime_literal() {
        let Value::Str(raw) = now().unwrap() else {
            panic!("NOW() must be a literal");
        };
        assert!(raw.ends_with(&format!("^^<{}>", xsd::DATE_TIME)));
    }
}
