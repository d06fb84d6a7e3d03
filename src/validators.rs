use crate::Fields;
use crate::error::RuleViolation;
use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

static MAIN_NUMBERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,2}(,\s*[0-9]{1,2}){5}$").expect("main numbers pattern compiles")
});

static SPIEL77_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9](\s[0-9]){6}$").expect("spiel77 pattern compiles"));

static SUPER6_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9](\s[0-9]){5}$").expect("super6 pattern compiles"));

pub const PHONE_MIN_DIGITS: usize = 7;
pub const PHONE_MAX_DIGITS: usize = 19;

/// Trimmed and lower-cased on success.
pub fn validate_email(v: &str) -> Result<String, RuleViolation> {
    let email = v.trim();

    if email.is_empty() {
        return Err(RuleViolation::format("email must not be empty"));
    }

    if !email.contains('@') {
        return Err(RuleViolation::format("email must contain an @ symbol"));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(RuleViolation::format("email must contain only one @ symbol"));
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() {
        return Err(RuleViolation::format("email needs a name before the @"));
    }

    if !domain.contains('.') {
        return Err(RuleViolation::format("email domain must contain a dot"));
    }

    if domain.rsplit('.').next().is_none_or(str::is_empty) {
        return Err(RuleViolation::format(
            "email domain needs a valid ending after the last dot",
        ));
    }

    Ok(email.to_lowercase())
}

pub fn validate_phone(v: Option<&str>) -> Result<Option<String>, RuleViolation> {
    let phone = match v.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(phone) => phone,
    };

    let Some(digits) = phone.strip_prefix('+') else {
        return Err(RuleViolation::format(
            "phone number must start with + (e.g. +49123456789)",
        ));
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(RuleViolation::format(
            "phone number may only contain digits after the +",
        ));
    }

    let count = digits.len();
    if count < PHONE_MIN_DIGITS {
        return Err(RuleViolation::format(format!(
            "phone number too short (at least {PHONE_MIN_DIGITS} digits after +, got {count})"
        )));
    }
    if count > PHONE_MAX_DIGITS {
        return Err(RuleViolation::format(format!(
            "phone number too long (at most {PHONE_MAX_DIGITS} digits after +, got {count})"
        )));
    }

    Ok(Some(phone.to_string()))
}

/// Parse a comma- or whitespace-separated list of exactly `count` integers,
/// each within `min_val..=max_val`, optionally requiring distinct values.
pub fn validate_number_list(
    v: &str,
    count: usize,
    min_val: i64,
    max_val: i64,
    unique: bool,
) -> Result<Vec<i64>, RuleViolation> {
    let mut numbers = Vec::with_capacity(count);
    for token in v
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let n = token.parse::<i64>().map_err(|_| {
            RuleViolation::format(format!("all numbers must be integers, got '{token}' in '{v}'"))
        })?;
        numbers.push(n);
    }

    if numbers.len() != count {
        return Err(RuleViolation::format(format!(
            "must have exactly {count} numbers, got {}: '{v}'",
            numbers.len()
        )));
    }

    if let Some(n) = numbers.iter().find(|n| !(min_val..=max_val).contains(*n)) {
        return Err(RuleViolation::range(format!(
            "all numbers must be between {min_val} and {max_val}, got {n} in '{v}'"
        )));
    }

    if unique {
        let mut seen = HashSet::with_capacity(count);
        if let Some(n) = numbers.iter().find(|n| !seen.insert(**n)) {
            return Err(RuleViolation::uniqueness(format!(
                "all numbers must be unique, {n} appears more than once in '{v}'"
            )));
        }
    }

    Ok(numbers)
}

pub fn validate_main_numbers(v: &str) -> Result<[u8; 6], RuleViolation> {
    if !MAIN_NUMBERS_RE.is_match(v) {
        return Err(RuleViolation::format(format!(
            "numbers must be in format \"num, num, num, num, num, num\" \
             (e.g. \"7, 12, 16, 19, 30, 36\"), got: '{v}'"
        )));
    }

    let numbers = validate_number_list(v, 6, 1, 49, true)?;
    let mut out = [0u8; 6];
    for (slot, n) in out.iter_mut().zip(numbers) {
        *slot = u8::try_from(n)
            .map_err(|_| RuleViolation::range(format!("number {n} does not fit in 1..=49")))?;
    }
    Ok(out)
}

/// Exactly `len` single digits separated by single whitespace characters,
/// e.g. `"3 1 6 8 5 3 4"`. Only the Spiel77 (7) and Super6 (6) lengths exist.
pub fn validate_digit_sequence(v: &str, len: usize) -> Result<Vec<u8>, RuleViolation> {
    let pattern = match len {
        7 => &*SPIEL77_RE,
        6 => &*SUPER6_RE,
        other => {
            return Err(RuleViolation::format(format!(
                "no digit sequence of length {other} is defined"
            )));
        }
    };

    if !pattern.is_match(v) {
        return Err(RuleViolation::format(format!(
            "must be {len} digits separated by single spaces, got: '{v}'"
        )));
    }

    Ok(v.split_whitespace()
        .filter_map(|d| d.parse::<u8>().ok())
        .collect())
}

pub fn validate_iso_date(v: &str) -> Result<NaiveDate, RuleViolation> {
    NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").map_err(|_| {
        RuleViolation::format(format!("date must be a valid YYYY-MM-DD date, got: '{v}'"))
    })
}

/// `0..=9` as a JSON integer, a whole-number float or an integer string.
pub fn validate_single_digit(value: &Value) -> Result<u8, RuleViolation> {
    let n = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| RuleViolation::format(format!("must be an integer, got {n}")))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RuleViolation::format(format!("must be an integer, got '{s}'")))?,
        other => {
            return Err(RuleViolation::format(format!(
                "must be an integer, got {other}"
            )));
        }
    };

    if !(0..=9).contains(&n) {
        return Err(RuleViolation::range(format!(
            "must be between 0 and 9, got {n}"
        )));
    }
    Ok(n as u8)
}

pub(crate) fn text_field<'a>(
    fields: &'a Fields,
    name: &str,
) -> Option<Result<&'a str, RuleViolation>> {
    match fields.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(Ok(s.as_str())),
        Some(other) => Some(Err(RuleViolation::format(format!(
            "must be text, got {other}"
        )))),
    }
}

pub(crate) fn value_field<'a>(fields: &'a Fields, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

pub(crate) fn required_text<'a>(fields: &'a Fields, name: &str) -> Result<&'a str, RuleViolation> {
    match text_field(fields, name) {
        None => Err(RuleViolation::required(format!("{name} is required"))),
        Some(Ok(s)) if s.trim().is_empty() => {
            Err(RuleViolation::required(format!("{name} must not be empty")))
        }
        Some(result) => result,
    }
}
