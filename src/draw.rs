//! Lotto 6aus49 draw records and their create/update schema.

use crate::Fields;
use crate::error::{ErrorCollector, RuleViolation, ValidationError};
use crate::validators::{
    text_field, validate_digit_sequence, validate_iso_date, validate_main_numbers,
    validate_single_digit, value_field,
};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const SPIEL77_DIGITS: usize = 7;
pub const SUPER6_DIGITS: usize = 6;

/// The two weekdays on which Lotto 6aus49 is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawDay {
    Samstag,
    Mittwoch,
}

impl DrawDay {
    pub const ALLOWED: [&'static str; 2] = ["Samstag", "Mittwoch"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrawDay::Samstag => "Samstag",
            DrawDay::Mittwoch => "Mittwoch",
        }
    }

    pub fn weekday(&self) -> Weekday {
        match self {
            DrawDay::Samstag => Weekday::Sat,
            DrawDay::Mittwoch => Weekday::Wed,
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Sat => Some(DrawDay::Samstag),
            Weekday::Wed => Some(DrawDay::Mittwoch),
            _ => None,
        }
    }
}

impl fmt::Display for DrawDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawDay {
    type Err = RuleViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Samstag" => Ok(DrawDay::Samstag),
            "Mittwoch" => Ok(DrawDay::Mittwoch),
            other => Err(RuleViolation::format(format!(
                "draw_day must be one of [{}], got: '{other}'",
                DrawDay::ALLOWED.join(", ")
            ))),
        }
    }
}

/// One validated draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub date: NaiveDate,
    pub draw_day: DrawDay,
    pub numbers: [u8; 6],
    pub super_number: u8,
    pub spiel77: [u8; SPIEL77_DIGITS],
    pub super6: [u8; SUPER6_DIGITS],
}

impl Draw {
    pub fn numbers_list(&self) -> Vec<u8> {
        self.numbers.to_vec()
    }

    pub fn spiel77_list(&self) -> Vec<u8> {
        self.spiel77.to_vec()
    }

    pub fn super6_list(&self) -> Vec<u8> {
        self.super6.to_vec()
    }

    /// Main numbers in their stored text form, `"7, 12, 16, 19, 30, 36"`.
    pub fn numbers_text(&self) -> String {
        join(&self.numbers, ", ")
    }

    pub fn spiel77_text(&self) -> String {
        join(&self.spiel77, " ")
    }

    pub fn super6_text(&self) -> String {
        join(&self.super6, " ")
    }

    /// German display date, `DD.MM.YYYY`.
    pub fn formatted_date(&self) -> String {
        self.date.format("%d.%m.%Y").to_string()
    }

    pub fn is_saturday_draw(&self) -> bool {
        self.draw_day == DrawDay::Samstag
    }

    pub fn is_wednesday_draw(&self) -> bool {
        self.draw_day == DrawDay::Mittwoch
    }

    /// The raw field map this draw would have been submitted as.
    pub fn to_fields(&self) -> Fields {
        let value = json!({
            "date": self.date.format("%Y-%m-%d").to_string(),
            "draw_day": self.draw_day.as_str(),
            "numbers": self.numbers_text(),
            "super_number": self.super_number,
            "spiel77": self.spiel77_text(),
            "super6": self.super6_text(),
        });
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }
}

fn join(digits: &[u8], sep: &str) -> String {
    digits
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// A partial change to a stored draw. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrawUpdate {
    pub draw_day: Option<DrawDay>,
    pub numbers: Option<[u8; 6]>,
    pub super_number: Option<u8>,
    pub spiel77: Option<[u8; SPIEL77_DIGITS]>,
    pub super6: Option<[u8; SUPER6_DIGITS]>,
}

impl DrawUpdate {
    pub fn is_empty(&self) -> bool {
        self.draw_day.is_none()
            && self.numbers.is_none()
            && self.super_number.is_none()
            && self.spiel77.is_none()
            && self.super6.is_none()
    }

    pub fn apply_to(&self, draw: &mut Draw) {
        if let Some(day) = self.draw_day {
            draw.draw_day = day;
        }
        if let Some(numbers) = self.numbers {
            draw.numbers = numbers;
        }
        if let Some(n) = self.super_number {
            draw.super_number = n;
        }
        if let Some(digits) = self.spiel77 {
            draw.spiel77 = digits;
        }
        if let Some(digits) = self.super6 {
            draw.super6 = digits;
        }
    }
}

/// Validation for draw create and update requests.
pub struct DrawSchema;

impl DrawSchema {
    /// Validate a complete draw. Every field is required.
    pub fn create(fields: &Fields) -> Result<Draw, ValidationError> {
        let mut errors = ErrorCollector::new();

        let date = errors.check("date", required(fields, "date").and_then(validate_iso_date));
        let draw_day = errors.check("draw_day", required(fields, "draw_day").and_then(parse_day));
        let numbers = errors.check(
            "numbers",
            required(fields, "numbers").and_then(validate_main_numbers),
        );
        let super_number = errors.check(
            "super_number",
            value_field(fields, "super_number")
                .ok_or_else(|| RuleViolation::required("super_number is required"))
                .and_then(validate_single_digit),
        );
        let spiel77 = errors.check(
            "spiel77",
            required(fields, "spiel77").and_then(digits::<SPIEL77_DIGITS>),
        );
        let super6 = errors.check(
            "super6",
            required(fields, "super6").and_then(digits::<SUPER6_DIGITS>),
        );

        match (date, draw_day, numbers, super_number, spiel77, super6) {
            (
                Some(date),
                Some(draw_day),
                Some(numbers),
                Some(super_number),
                Some(spiel77),
                Some(super6),
            ) if errors.is_empty() => Ok(Draw {
                date,
                draw_day,
                numbers,
                super_number,
                spiel77,
                super6,
            }),
            _ => {
                let err = errors.into_error();
                debug!(errors = err.errors().len(), "draw rejected");
                Err(err)
            }
        }
    }

    /// Validate a partial draw change. Absent or `null` fields stay unset.
    ///
    /// The draw date identifies the record and is never part of an update.
    pub fn update(fields: &Fields) -> Result<DrawUpdate, ValidationError> {
        let mut errors = ErrorCollector::new();

        let update = DrawUpdate {
            draw_day: errors.check_opt(
                "draw_day",
                text_field(fields, "draw_day").map(|r| r.and_then(parse_day)),
            ),
            numbers: errors.check_opt(
                "numbers",
                text_field(fields, "numbers").map(|r| r.and_then(validate_main_numbers)),
            ),
            super_number: errors.check_opt(
                "super_number",
                value_field(fields, "super_number").map(validate_single_digit),
            ),
            spiel77: errors.check_opt(
                "spiel77",
                text_field(fields, "spiel77").map(|r| r.and_then(digits::<SPIEL77_DIGITS>)),
            ),
            super6: errors.check_opt(
                "super6",
                text_field(fields, "super6").map(|r| r.and_then(digits::<SUPER6_DIGITS>)),
            ),
        };

        if errors.is_empty() {
            Ok(update)
        } else {
            let err = errors.into_error();
            debug!(errors = err.errors().len(), "draw update rejected");
            Err(err)
        }
    }
}

fn required<'a>(fields: &'a Fields, name: &str) -> Result<&'a str, RuleViolation> {
    text_field(fields, name)
        .unwrap_or_else(|| Err(RuleViolation::required(format!("{name} is required"))))
}

fn parse_day(s: &str) -> Result<DrawDay, RuleViolation> {
    s.parse()
}

fn digits<const N: usize>(s: &str) -> Result<[u8; N], RuleViolation> {
    let digits = validate_digit_sequence(s, N)?;
    <[u8; N]>::try_from(digits)
        .map_err(|_| RuleViolation::format(format!("must have exactly {N} digits, got: '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fields must be an object"),
        }
    }

    fn sample() -> Fields {
        fields(json!({
            "date": "2025-06-21",
            "draw_day": "Samstag",
            "numbers": "7, 12, 16, 19, 30, 36",
            "super_number": 7,
            "spiel77": "3 1 6 8 5 3 4",
            "super6": "8 5 3 8 4 9"
        }))
    }

    #[test]
    fn create_normalizes_a_valid_draw() {
        let draw = DrawSchema::create(&sample()).unwrap();
        assert_eq!(draw.date, NaiveDate::from_ymd_opt(2025, 6, 21).unwrap());
        assert_eq!(draw.draw_day, DrawDay::Samstag);
        assert_eq!(draw.numbers, [7, 12, 16, 19, 30, 36]);
        assert_eq!(draw.super_number, 7);
        assert_eq!(draw.spiel77, [3, 1, 6, 8, 5, 3, 4]);
        assert_eq!(draw.super6, [8, 5, 3, 8, 4, 9]);
        assert_eq!(draw.formatted_date(), "21.06.2025");
        assert!(draw.is_saturday_draw());
        assert!(!draw.is_wednesday_draw());
    }

    #[test]
    fn create_names_allowed_days() {
        let mut input = sample();
        input.insert("draw_day".into(), json!("Freitag"));
        let err = DrawSchema::create(&input).unwrap_err();
        let day = err.field("draw_day").unwrap();
        assert!(day.message.contains("Samstag"));
        assert!(day.message.contains("Mittwoch"));
    }

    #[test]
    fn draw_day_is_case_sensitive() {
        let mut input = sample();
        input.insert("draw_day".into(), json!("samstag"));
        assert!(DrawSchema::create(&input).is_err());
    }

    #[test]
    fn create_reports_every_missing_field() {
        let err = DrawSchema::create(&Fields::new()).unwrap_err();
        for field in ["date", "draw_day", "numbers", "super_number", "spiel77", "super6"] {
            assert!(err.has(field, ErrorKind::RequiredField), "{field}");
        }
    }

    #[test]
    fn create_aggregates_mixed_errors() {
        let mut input = sample();
        input.insert("numbers".into(), json!("7, 7, 16, 19, 30, 36"));
        input.insert("super_number".into(), json!(12));
        input.insert("super6".into(), json!("8 5 3"));
        let err = DrawSchema::create(&input).unwrap_err();
        assert_eq!(err.errors().len(), 3);
        assert!(err.has("numbers", ErrorKind::Uniqueness));
        assert!(err.has("super_number", ErrorKind::Range));
        assert!(err.has("super6", ErrorKind::Format));
    }

    #[test]
    fn super_number_as_string_or_whole_float() {
        let mut input = sample();
        input.insert("super_number".into(), json!("3"));
        assert_eq!(DrawSchema::create(&input).unwrap().super_number, 3);

        input.insert("super_number".into(), json!(5.0));
        assert_eq!(DrawSchema::create(&input).unwrap().super_number, 5);
    }

    #[test]
    fn revalidating_a_draw_is_stable() {
        let draw = DrawSchema::create(&sample()).unwrap();
        let again = DrawSchema::create(&draw.to_fields()).unwrap();
        assert_eq!(draw, again);
        assert_eq!(draw.to_fields(), again.to_fields());
    }

    #[test]
    fn compact_numbers_normalize_to_canonical_text() {
        let mut input = sample();
        input.insert("numbers".into(), json!("7,12,16,19,30,36"));
        let draw = DrawSchema::create(&input).unwrap();
        assert_eq!(draw.numbers_text(), "7, 12, 16, 19, 30, 36");
    }

    #[test]
    fn update_with_no_fields_is_empty() {
        let update = DrawSchema::update(&Fields::new()).unwrap();
        assert!(update.is_empty());

        let nulls = fields(json!({ "numbers": null, "super6": null }));
        assert!(DrawSchema::update(&nulls).unwrap().is_empty());
    }

    #[test]
    fn update_applies_only_set_fields() {
        let mut draw = DrawSchema::create(&sample()).unwrap();
        let update = DrawSchema::update(&fields(json!({
            "draw_day": "Mittwoch",
            "super_number": 0
        })))
        .unwrap();
        update.apply_to(&mut draw);

        assert_eq!(draw.draw_day, DrawDay::Mittwoch);
        assert_eq!(draw.super_number, 0);
        assert_eq!(draw.numbers, [7, 12, 16, 19, 30, 36]);
    }

    #[test]
    fn update_uses_the_same_rules() {
        let err = DrawSchema::update(&fields(json!({
            "draw_day": "Sonntag",
            "spiel77": "1 2 3 4 5 6 77"
        })))
        .unwrap_err();
        assert!(err.has("draw_day", ErrorKind::Format));
        assert!(err.has("spiel77", ErrorKind::Format));
    }

    #[test]
    fn update_ignores_date() {
        let update = DrawSchema::update(&fields(json!({ "date": "not a date" }))).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn weekday_mapping() {
        assert_eq!(DrawDay::from_weekday(Weekday::Sat), Some(DrawDay::Samstag));
        assert_eq!(DrawDay::from_weekday(Weekday::Wed), Some(DrawDay::Mittwoch));
        assert_eq!(DrawDay::from_weekday(Weekday::Fri), None);
        assert_eq!(DrawDay::Mittwoch.weekday(), Weekday::Wed);
    }
}
