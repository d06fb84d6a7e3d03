use crate::draw::DrawDay;
use chrono::{Datelike, Days, NaiveDate};
use std::collections::HashSet;

/// Every Wednesday and Saturday between `start` and `end`, inclusive.
pub fn generate_draw_dates(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| DrawDay::from_weekday(d.weekday()).is_some())
        .collect()
}

/// Draw days between the oldest and newest of `existing` that have no record.
pub fn missing_draw_dates(existing: &[NaiveDate]) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (existing.iter().min(), existing.iter().max()) else {
        return Vec::new();
    };
    let known: HashSet<&NaiveDate> = existing.iter().collect();
    generate_draw_dates(*first, *last)
        .into_iter()
        .filter(|d| !known.contains(d))
        .collect()
}

/// The next draw date strictly after `date`.
pub fn next_draw_date(date: NaiveDate) -> Option<NaiveDate> {
    let tomorrow = date.checked_add_days(Days::new(1))?;
    generate_draw_dates(tomorrow, tomorrow.checked_add_days(Days::new(7))?)
        .into_iter()
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn draw_dates_are_wednesdays_and_saturdays() {
        let dates = generate_draw_dates(d("2025-06-16"), d("2025-06-29"));
        assert_eq!(
            dates,
            vec![d("2025-06-18"), d("2025-06-21"), d("2025-06-25"), d("2025-06-28")]
        );
    }

    #[test]
    fn gaps_between_known_draws() {
        let missing = missing_draw_dates(&[d("2025-06-28"), d("2025-06-18")]);
        assert_eq!(missing, vec![d("2025-06-21"), d("2025-06-25")]);
        assert!(missing_draw_dates(&[]).is_empty());
    }

    #[test]
    fn next_draw() {
        assert_eq!(next_draw_date(d("2025-06-21")), Some(d("2025-06-25")));
        assert_eq!(next_draw_date(d("2025-06-24")), Some(d("2025-06-25")));
    }
}
