//! Saved draw analyses. Only the storage shape lives here; the statistics
//! themselves are computed elsewhere.

use crate::error::{ErrorCollector, RuleViolation, ValidationError};
use crate::simulation::check_name;
use crate::user::Requester;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    FrequentlySeen,
    RarelySeen,
    Overdue,
    Pattern,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::FrequentlySeen => "frequently_seen",
            AnalysisType::RarelySeen => "rarely_seen",
            AnalysisType::Overdue => "overdue",
            AnalysisType::Pattern => "pattern",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AnalysisType::FrequentlySeen => "Häufige Zahlen",
            AnalysisType::RarelySeen => "Seltene Zahlen",
            AnalysisType::Overdue => "Überfällige Zahlen",
            AnalysisType::Pattern => "Muster-Analyse",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = RuleViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frequently_seen" => Ok(AnalysisType::FrequentlySeen),
            "rarely_seen" => Ok(AnalysisType::RarelySeen),
            "overdue" => Ok(AnalysisType::Overdue),
            "pattern" => Ok(AnalysisType::Pattern),
            other => Err(RuleViolation::format(format!(
                "analysis_type must be one of [frequently_seen, rarely_seen, overdue, pattern], got: '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Option<i64>,
    pub user_clerk_id: String,
    pub analysis_type: AnalysisType,
    pub analysis_name: String,
    pub parameters: Value,
    pub results_json: Value,
    pub chart_data: Value,
    pub is_admin_analysis: bool,
    pub is_public: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AnalysisRecord {
    pub fn new(
        user_clerk_id: &str,
        analysis_type: &str,
        analysis_name: &str,
        parameters: Value,
        results_json: Value,
        chart_data: Value,
        created_at: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let mut errors = ErrorCollector::new();
        let kind = errors.check("analysis_type", analysis_type.parse::<AnalysisType>());
        errors.check("analysis_name", check_name(analysis_name));

        match kind {
            Some(analysis_type) if errors.is_empty() => Ok(Self {
                id: None,
                user_clerk_id: user_clerk_id.to_string(),
                analysis_type,
                analysis_name: analysis_name.trim().to_string(),
                parameters,
                results_json,
                chart_data,
                is_admin_analysis: false,
                is_public: false,
                created_at,
                updated_at: created_at,
            }),
            _ => Err(errors.into_error()),
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.analysis_type.display_name()
    }

    pub fn draws_analyzed_count(&self) -> u64 {
        self.results_json
            .pointer("/metadata/total_draws_analyzed")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn top_6_numbers(&self) -> Vec<u8> {
        self.results_json
            .pointer("/top_numbers/top_6")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_u64)
                    .filter_map(|n| u8::try_from(n).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_chart_data(&self) -> bool {
        match self.chart_data.get("data") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn can_user_access(&self, requester: &Requester) -> bool {
        requester.can_access(&self.user_clerk_id, self.is_public)
    }

    pub fn touch(&mut self, now: NaiveDateTime) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 22)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn accessors_read_the_results_shape() {
        let record = AnalysisRecord::new(
            "user_1",
            "frequently_seen",
            "Top Zahlen 2024",
            json!({"draw_count": 104}),
            json!({
                "top_numbers": {"top_6": [6, 49, 31, 26, 33, 38]},
                "metadata": {"total_draws_analyzed": 104}
            }),
            json!({"data": [{"number": 6, "count": 21}]}),
            now(),
        )
        .unwrap();

        assert_eq!(record.display_name(), "Häufige Zahlen");
        assert_eq!(record.draws_analyzed_count(), 104);
        assert_eq!(record.top_6_numbers(), vec![6, 49, 31, 26, 33, 38]);
        assert!(record.has_chart_data());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let record = AnalysisRecord::new(
            "user_1",
            "overdue",
            "leer",
            json!({}),
            json!({}),
            json!({"data": []}),
            now(),
        )
        .unwrap();
        assert_eq!(record.draws_analyzed_count(), 0);
        assert!(record.top_6_numbers().is_empty());
        assert!(!record.has_chart_data());
        assert_eq!(record.display_name(), "Überfällige Zahlen");
    }

    #[test]
    fn unknown_type_and_blank_name_are_reported_together() {
        let err = AnalysisRecord::new(
            "user_1",
            "horoscope",
            "",
            json!({}),
            json!({}),
            json!({}),
            now(),
        )
        .unwrap_err();
        assert!(err.has("analysis_type", ErrorKind::Format));
        assert!(err.has("analysis_name", ErrorKind::RequiredField));
    }
}
