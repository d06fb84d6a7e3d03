//! Simulation parameters and saved simulation results. [`validate`] is a
//! predicate and never fails.

use crate::error::{ErrorCollector, ErrorKind, RuleViolation, ValidationError};
use crate::user::Requester;
use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const MAX_SIMULATIONS: i64 = 500;
pub const WEIGHT_SUM_MIN: f64 = 0.95;
pub const WEIGHT_SUM_MAX: f64 = 1.05;
pub const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationType {
    Random,
    FrequencyBased,
    OverdueBased,
    MixedStrategy,
    MonteCarlo,
}

impl SimulationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationType::Random => "random",
            SimulationType::FrequencyBased => "frequency_based",
            SimulationType::OverdueBased => "overdue_based",
            SimulationType::MixedStrategy => "mixed_strategy",
            SimulationType::MonteCarlo => "monte_carlo",
        }
    }
}

impl fmt::Display for SimulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationType {
    type Err = RuleViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SimulationType::Random),
            "frequency_based" => Ok(SimulationType::FrequencyBased),
            "overdue_based" => Ok(SimulationType::OverdueBased),
            "mixed_strategy" => Ok(SimulationType::MixedStrategy),
            "monte_carlo" => Ok(SimulationType::MonteCarlo),
            other => Err(RuleViolation::new(
                ErrorKind::UnknownDiscriminant,
                format!("unknown simulation_type '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "simulation_type", rename_all = "snake_case")]
pub enum SimulationParameters {
    Random {
        number_of_simulations: u16,
    },
    FrequencyBased {
        number_of_simulations: u16,
        number_of_past_draws: Value,
        strategy: Value,
    },
    OverdueBased {
        number_of_simulations: u16,
        minimum_days_overdue: Value,
        number_of_past_draws: Value,
    },
    MixedStrategy {
        number_of_simulations: u16,
        number_of_past_draws: Value,
        strategy_weights: Weights,
    },
    MonteCarlo {
        number_of_simulations: u16,
        iterations: Value,
        strategy_distribution: Weights,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Weights(Vec<(String, f64)>);

impl Weights {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(n, w)| (n.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, w)| w).sum()
    }
}

impl Serialize for Weights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, weight) in &self.0 {
            map.serialize_entry(name, weight)?;
        }
        map.end()
    }
}

impl SimulationParameters {
    /// Parse `parameters` for the given strategy.
    ///
    /// An unrecognized `simulation_type` is not an error: only the common
    /// rule applies and the result is a [`SimulationParameters::Random`].
    pub fn parse(simulation_type: &str, parameters: &Value) -> Option<Self> {
        let params = parameters.as_object()?;
        let number_of_simulations = simulation_count(params)?;

        let kind = match simulation_type.parse::<SimulationType>() {
            Ok(kind) => kind,
            Err(violation) => {
                debug!(kind = %violation.kind, "{}; applying common rules only", violation);
                SimulationType::Random
            }
        };

        let parsed = match kind {
            SimulationType::Random => SimulationParameters::Random {
                number_of_simulations,
            },
            SimulationType::FrequencyBased => SimulationParameters::FrequencyBased {
                number_of_simulations,
                number_of_past_draws: present(params, "number_of_past_draws")?,
                strategy: present(params, "strategy")?,
            },
            SimulationType::OverdueBased => SimulationParameters::OverdueBased {
                number_of_simulations,
                minimum_days_overdue: present(params, "minimum_days_overdue")?,
                number_of_past_draws: present(params, "number_of_past_draws")?,
            },
            SimulationType::MixedStrategy => SimulationParameters::MixedStrategy {
                number_of_simulations,
                number_of_past_draws: present(params, "number_of_past_draws")?,
                strategy_weights: weights(params, "strategy_weights")?,
            },
            SimulationType::MonteCarlo => SimulationParameters::MonteCarlo {
                number_of_simulations,
                iterations: present(params, "iterations")?,
                strategy_distribution: weights(params, "strategy_distribution")?,
            },
        };
        Some(parsed)
    }

    pub fn simulation_type(&self) -> SimulationType {
        match self {
            SimulationParameters::Random { .. } => SimulationType::Random,
            SimulationParameters::FrequencyBased { .. } => SimulationType::FrequencyBased,
            SimulationParameters::OverdueBased { .. } => SimulationType::OverdueBased,
            SimulationParameters::MixedStrategy { .. } => SimulationType::MixedStrategy,
            SimulationParameters::MonteCarlo { .. } => SimulationType::MonteCarlo,
        }
    }

    pub fn number_of_simulations(&self) -> u16 {
        match self {
            SimulationParameters::Random {
                number_of_simulations,
            }
            | SimulationParameters::FrequencyBased {
                number_of_simulations,
                ..
            }
            | SimulationParameters::OverdueBased {
                number_of_simulations,
                ..
            }
            | SimulationParameters::MixedStrategy {
                number_of_simulations,
                ..
            }
            | SimulationParameters::MonteCarlo {
                number_of_simulations,
                ..
            } => *number_of_simulations,
        }
    }
}

/// Whether `parameters` are acceptable for `simulation_type`.
pub fn validate(simulation_type: &str, parameters: &Value) -> bool {
    SimulationParameters::parse(simulation_type, parameters).is_some()
}

fn simulation_count(params: &Map<String, Value>) -> Option<u16> {
    let n = params.get("number_of_simulations")?.as_i64()?;
    if !(1..=MAX_SIMULATIONS).contains(&n) {
        return None;
    }
    u16::try_from(n).ok()
}

// Only presence is checked; any JSON value, `null` included, is kept as is.
fn present(params: &Map<String, Value>, key: &str) -> Option<Value> {
    params.get(key).cloned()
}

fn weights(params: &Map<String, Value>, key: &str) -> Option<Weights> {
    let map = params.get(key)?.as_object()?;
    let weights = map
        .iter()
        .map(|(name, weight)| Some((name.clone(), weight.as_f64()?)))
        .collect::<Option<Vec<_>>>()
        .map(Weights)?;
    (WEIGHT_SUM_MIN..=WEIGHT_SUM_MAX)
        .contains(&weights.total())
        .then_some(weights)
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub simulation_type: String,
    pub user_input: Value,
    /// `"Sim_1" -> [6 numbers]`, in generation order.
    pub simulations: Vec<(String, Vec<u8>)>,
    pub summary_statistics: Value,
    pub execution_info: Option<Value>,
    pub analysis_base_data: Option<Value>,
}

impl SimulationResult {
    pub fn to_value(&self) -> Value {
        let simulations: Map<String, Value> = self
            .simulations
            .iter()
            .map(|(id, numbers)| (id.clone(), json!(numbers)))
            .collect();

        let mut result = json!({
            "simulation_type": self.simulation_type,
            "user_input": self.user_input,
            "simulations": simulations,
            "summary_statistics": self.summary_statistics,
        });
        if let Some(obj) = result.as_object_mut() {
            if let Some(info) = self.execution_info.as_ref().filter(|v| is_truthy(v)) {
                obj.insert("execution_info".into(), info.clone());
            }
            if let Some(base) = self.analysis_base_data.as_ref().filter(|v| is_truthy(v)) {
                obj.insert("analysis_base_data".into(), base.clone());
            }
        }
        result
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: Option<i64>,
    pub user_clerk_id: String,
    pub simulation_type: String,
    pub simulation_name: String,
    pub parameters: Value,
    pub results_json: Value,
    pub execution_metadata: Value,
    pub is_admin_simulation: bool,
    pub is_public: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl SimulationRecord {
    pub fn new(
        user_clerk_id: &str,
        simulation_type: &str,
        simulation_name: &str,
        parameters: Value,
        results_json: Value,
        created_at: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let mut errors = ErrorCollector::new();
        errors.check("simulation_name", check_name(simulation_name));
        errors.check("simulation_type", check_type_len(simulation_type));
        if !validate(simulation_type, &parameters) {
            errors.check::<()>(
                "parameters",
                Err(RuleViolation::format(format!(
                    "parameters are not valid for simulation_type '{simulation_type}'"
                ))),
            );
        }
        if !errors.is_empty() {
            return Err(errors.into_error());
        }

        Ok(Self {
            id: None,
            user_clerk_id: user_clerk_id.to_string(),
            simulation_type: simulation_type.to_string(),
            simulation_name: simulation_name.trim().to_string(),
            parameters,
            results_json,
            execution_metadata: json!({}),
            is_admin_simulation: false,
            is_public: false,
            created_at,
            updated_at: None,
        })
    }

    pub fn can_user_access(&self, requester: &Requester) -> bool {
        requester.can_access(&self.user_clerk_id, self.is_public)
    }

    pub fn simulation_count(&self) -> usize {
        match self.results_json.get("simulations") {
            Some(Value::Object(map)) => map.len(),
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        }
    }

    pub fn has_results(&self) -> bool {
        self.results_json.get("simulations").is_some()
    }

    /// `"Sim_1: [1, 2, 3, 4, 5, 6]"` per simulation.
    pub fn results_display(&self) -> Vec<String> {
        let Some(Value::Object(simulations)) = self.results_json.get("simulations") else {
            return Vec::new();
        };
        simulations
            .iter()
            .filter_map(|(id, numbers)| {
                let items = numbers.as_array()?;
                let rendered = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("{id}: [{rendered}]"))
            })
            .collect()
    }

    pub fn summary_statistics(&self) -> Value {
        self.result_section("summary_statistics")
    }

    pub fn execution_info(&self) -> Value {
        self.result_section("execution_info")
    }

    pub fn analysis_base_data(&self) -> Value {
        self.result_section("analysis_base_data")
    }

    fn result_section(&self, key: &str) -> Value {
        self.results_json
            .get(key)
            .cloned()
            .unwrap_or_else(|| json!({}))
    }

    pub fn update_metadata_on_save(&mut self, now: NaiveDateTime) {
        self.updated_at = Some(now);
        if !self.execution_metadata.is_object() {
            self.execution_metadata = json!({});
        }
        let count = self.simulation_count();
        let has_results = self.has_results();
        if let Some(meta) = self.execution_metadata.as_object_mut() {
            meta.insert(
                "last_saved_at".into(),
                json!(now.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            );
            meta.insert("simulation_count".into(), json!(count));
            meta.insert("has_results".into(), json!(has_results));
        }
    }
}

pub(crate) fn check_name(name: &str) -> Result<(), RuleViolation> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RuleViolation::required("name must not be empty"));
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(RuleViolation::range(format!(
            "name must be at most {MAX_NAME_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

fn check_type_len(simulation_type: &str) -> Result<(), RuleViolation> {
    if simulation_type.is_empty() || simulation_type.chars().count() > 50 {
        return Err(RuleViolation::format(
            "simulation_type must be between 1 and 50 characters",
        ));
    }
    Ok(())
}
