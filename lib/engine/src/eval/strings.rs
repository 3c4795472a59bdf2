//! The string builtins. String-returning operations preserve the language
//! tag or datatype suffix of their primary argument.

use super::value::{ExprError, ExprResult, Value};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

pub(super) fn strlen(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    Ok(Value::Integer(content.chars().count() as i64))
}

pub(super) fn ucase(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    Ok(Value::string_with_suffix(
        &content.to_uppercase(),
        value.literal_suffix(),
    ))
}

pub(super) fn lcase(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    Ok(Value::string_with_suffix(
        &content.to_lowercase(),
        value.literal_suffix(),
    ))
}

/// `SUBSTR`: 1-based start, code-point indexed.
pub(super) fn substr(
    value: &Value,
    start: &Value,
    length: Option<&Value>,
) -> ExprResult<Value> {
    let content = value.string_content()?;
    let start = usize::try_from(start.as_integer()?).map_err(|_| ExprError)?;
    let length = match length {
        Some(length) => Some(usize::try_from(length.as_integer()?).map_err(|_| ExprError)?),
        None => None,
    };

    // Slice on char indices, not byte indices.
    let mut start_iter = content
        .char_indices()
        .skip(start.checked_sub(1).ok_or(ExprError)?)
        .peekable();
    let result = if let Some((start_position, _)) = start_iter.peek().copied() {
        if let Some(length) = length {
            let mut end_iter = start_iter.skip(length).peekable();
            if let Some((end_position, _)) = end_iter.peek() {
                &content[start_position..*end_position]
            } else {
                &content[start_position..]
            }
        } else {
            &content[start_position..]
        }
    } else {
        ""
    };

    Ok(Value::string_with_suffix(result, value.literal_suffix()))
}

pub(super) fn concat(args: &[ExprResult<Value>]) -> ExprResult<Value> {
    let mut result = String::new();
    let mut shared_lang: Option<Option<String>> = None;
    for arg in args {
        let value = arg.as_ref().map_err(|_| ExprError)?;
        result.push_str(&value.string_content()?);
        let lang = value.language_tag().map(str::to_owned);
        match &shared_lang {
            None => shared_lang = Some(lang),
            Some(previous) if *previous == lang => {}
            Some(_) => shared_lang = Some(None),
        }
    }
    match shared_lang.flatten() {
        Some(lang) => Ok(Value::string_with_suffix(&result, &format!("@{lang}"))),
        None => Ok(Value::simple_string(&result)),
    }
}

pub(super) fn contains(haystack: &Value, needle: &Value) -> ExprResult<Value> {
    Ok(Value::Boolean(
        haystack
            .string_content()?
            .contains(needle.string_content()?.as_ref()),
    ))
}

pub(super) fn strstarts(value: &Value, prefix: &Value) -> ExprResult<Value> {
    Ok(Value::Boolean(
        value
            .string_content()?
            .starts_with(prefix.string_content()?.as_ref()),
    ))
}

pub(super) fn strends(value: &Value, suffix: &Value) -> ExprResult<Value> {
    Ok(Value::Boolean(
        value
            .string_content()?
            .ends_with(suffix.string_content()?.as_ref()),
    ))
}

pub(super) fn strbefore(value: &Value, needle: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    let needle = needle.string_content()?;
    match content.find(needle.as_ref()) {
        Some(index) => Ok(Value::string_with_suffix(
            &content[..index],
            value.literal_suffix(),
        )),
        None => Ok(Value::simple_string("")),
    }
}

pub(super) fn strafter(value: &Value, needle: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    let needle = needle.string_content()?;
    match content.find(needle.as_ref()) {
        Some(index) => Ok(Value::string_with_suffix(
            &content[index + needle.len()..],
            value.literal_suffix(),
        )),
        None => Ok(Value::simple_string("")),
    }
}

/// `ENCODE_FOR_URI`: RFC 3986 percent-encoding of everything outside the
/// unreserved set.
pub(super) fn encode_for_uri(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    let mut result = Vec::with_capacity(content.len());
    for c in content.bytes() {
        match c {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(c)
            }
            _ => {
                result.push(b'%');
                let high = c / 16;
                let low = c % 16;
                result.push(if high < 10 { b'0' + high } else { b'A' + (high - 10) });
                result.push(if low < 10 { b'0' + low } else { b'A' + (low - 10) });
            }
        }
    }
    let result = String::from_utf8(result).map_err(|_| ExprError)?;
    Ok(Value::simple_string(&result))
}

pub(super) fn regex_match(
    text: &Value,
    pattern: &Value,
    flags: Option<&Value>,
) -> ExprResult<Value> {
    let flags = match flags {
        Some(flags) => Some(flags.string_content()?.into_owned()),
        None => None,
    };
    let regex =
        compile_pattern(&pattern.string_content()?, flags.as_deref()).ok_or(ExprError)?;
    Ok(Value::Boolean(regex.is_match(&text.string_content()?)))
}

pub(super) fn replace(
    text: &Value,
    pattern: &Value,
    replacement: &Value,
    flags: Option<&Value>,
) -> ExprResult<Value> {
    let flags = match flags {
        Some(flags) => Some(flags.string_content()?.into_owned()),
        None => None,
    };
    let regex =
        compile_pattern(&pattern.string_content()?, flags.as_deref()).ok_or(ExprError)?;
    let content = text.string_content()?;
    let replaced = regex.replace_all(&content, replacement.string_content()?.as_ref());
    Ok(Value::string_with_suffix(&replaced, text.literal_suffix()))
}

pub(super) fn lang_matches(tag: &Value, range: &Value) -> ExprResult<Value> {
    let tag = tag.string_content()?;
    let range = range.string_content()?;
    if range.as_ref() == "*" {
        return Ok(Value::Boolean(!tag.is_empty()));
    }
    let matches = tag.len() >= range.len()
        && tag[..range.len()].eq_ignore_ascii_case(&range)
        && (tag.len() == range.len() || tag.as_bytes()[range.len()] == b'-');
    Ok(Value::Boolean(matches))
}

/// `text:match`: case-insensitive Unicode contains.
pub(super) fn text_match(text: &Value, query: &Value) -> ExprResult<Value> {
    let text = text.string_content()?.to_lowercase();
    let query = query.string_content()?.to_lowercase();
    Ok(Value::Boolean(text.contains(&query)))
}

/// Maps SPARQL regex flags onto the regex crate. The compiled program is
/// size-limited; the engine is linear-time, so no execution timeout is
/// needed on top.
fn compile_pattern(pattern: &str, flags: Option<&str>) -> Option<Regex> {
    const REGEX_SIZE_LIMIT: usize = 1_000_000;

    let mut pattern = Cow::Borrowed(pattern);
    let flags = flags.unwrap_or_default();
    if flags.contains('q') {
        pattern = regex::escape(&pattern).into();
    }
    let mut regex_builder = RegexBuilder::new(&pattern);
    regex_builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            's' => {
                regex_builder.dot_matches_new_line(true);
            }
            'm' => {
                regex_builder.multi_line(true);
            }
            'i' => {
                regex_builder.case_insensitive(true);
            }
            'x' => {
                regex_builder.ignore_whitespace(true);
            }
            'q' => (),        // Already applied above
            _ => return None, // invalid option
        }
    }
    regex_builder.build().ok()
}
