use anyhow::Result;
use chrono::NaiveDate;
use lotto6::database::{self, now};
use lotto6::{
    AnalysisRecord, ContactSchema, DrawSchema, Fields, Requester, SimulationParameters,
    SimulationRecord, StoreError, StoreResult, ValidationError, simulation,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

fn str_arg<'a>(arguments: &'a HashMap<String, Value>, name: &str) -> Result<&'a str> {
    arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing {} parameter", name))
}

fn date_arg(arguments: &HashMap<String, Value>, name: &str) -> Result<NaiveDate> {
    let raw = str_arg(arguments, name)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("{} must be a YYYY-MM-DD date, got {}", name, raw))
}

fn fields_arg(arguments: &HashMap<String, Value>, name: &str) -> Result<Fields> {
    match arguments.get(name) {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(anyhow::anyhow!("{} parameter must be an object", name)),
        None => Err(anyhow::anyhow!("Missing {} parameter", name)),
    }
}

/// The caller's identity, as handed over by whoever authenticated them.
fn requester_arg(arguments: &HashMap<String, Value>) -> Requester {
    let is_admin = arguments
        .get("is_admin")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    match arguments.get("user_id").and_then(|v| v.as_str()) {
        Some(id) if !id.is_empty() => Requester::User {
            clerk_user_id: id.to_string(),
            is_admin,
        },
        _ => Requester::Anonymous,
    }
}

fn validation_failure(err: &ValidationError) -> String {
    json!({
        "success": false,
        "errors": err.errors()
    })
    .to_string()
}

/// Validation failures become a regular tool answer; everything else is a
/// tool error.
fn respond<T: Serialize>(outcome: StoreResult<T>, key: &str) -> Result<String> {
    match outcome {
        Ok(value) => {
            let mut body = json!({ "success": true });
            body[key] = serde_json::to_value(value)?;
            Ok(body.to_string())
        }
        Err(StoreError::Validation(err)) => Ok(validation_failure(&err)),
        Err(e) => Err(e.into()),
    }
}

pub struct DrawUseCase {
    connection: Arc<rusqlite::Connection>,
}

impl DrawUseCase {
    pub fn new(connection: Arc<rusqlite::Connection>) -> Self {
        Self { connection }
    }

    pub async fn validate_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let fields = fields_arg(arguments, "fields")?;
        respond(DrawSchema::create(&fields).map_err(StoreError::from), "draw")
    }

    pub async fn create_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let fields = fields_arg(arguments, "fields")?;
        let outcome = DrawSchema::create(&fields)
            .map_err(StoreError::from)
            .and_then(|draw| database::insert_draw(&self.connection, &draw));
        respond(outcome, "result")
    }

    pub async fn update_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let date = date_arg(arguments, "date")?;
        let fields = fields_arg(arguments, "fields")?;
        let outcome = DrawSchema::update(&fields)
            .map_err(StoreError::from)
            .and_then(|update| database::update_draw(&self.connection, date, &update));
        respond(outcome, "result")
    }

    pub async fn get_draw_by_date(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let date = date_arg(arguments, "date")?;
        let result = database::get_draw_by_date(&self.connection, date)?;

        Ok(json!({
            "success": true,
            "result": result
        })
        .to_string())
    }

    pub async fn get_latest_draws(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let limit = arguments
            .get("limit")
            .and_then(|v| v.as_u64())
            .and_then(|l| u32::try_from(l).ok())
            .unwrap_or(10);

        let results = database::get_latest_draws(&self.connection, limit)?;

        Ok(json!({
            "success": true,
            "results": results
        })
        .to_string())
    }

    pub async fn get_draws_by_date_range(
        &self,
        arguments: &HashMap<String, Value>,
    ) -> Result<String> {
        let start_date = date_arg(arguments, "start_date")?;
        let end_date = date_arg(arguments, "end_date")?;

        let results = database::get_draws_by_date_range(&self.connection, start_date, end_date)?;

        Ok(json!({
            "success": true,
            "results": results
        })
        .to_string())
    }

    pub async fn create_database(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        database::create_database_with_connection(&self.connection)?;

        Ok(json!({
            "success": true,
            "message": "Database created successfully"
        })
        .to_string())
    }
}

pub struct ContactUseCase {
    connection: Arc<rusqlite::Connection>,
}

impl ContactUseCase {
    pub fn new(connection: Arc<rusqlite::Connection>) -> Self {
        Self { connection }
    }

    pub async fn submit_contact_message(
        &self,
        arguments: &HashMap<String, Value>,
    ) -> Result<String> {
        let fields = fields_arg(arguments, "fields")?;
        let requester = requester_arg(arguments);

        let outcome = ContactSchema::create(&fields, requester.user_id())
            .map_err(StoreError::from)
            .and_then(|message| database::insert_contact_message(&self.connection, &message));
        respond(outcome, "result")
    }
}

pub struct SimulationUseCase {
    connection: Arc<rusqlite::Connection>,
}

impl SimulationUseCase {
    pub fn new(connection: Arc<rusqlite::Connection>) -> Self {
        Self { connection }
    }

    pub async fn validate_simulation_parameters(
        &self,
        arguments: &HashMap<String, Value>,
    ) -> Result<String> {
        let simulation_type = str_arg(arguments, "simulation_type")?;
        let parameters = arguments.get("parameters").cloned().unwrap_or(Value::Null);

        let valid = simulation::validate(simulation_type, &parameters);
        let parsed = SimulationParameters::parse(simulation_type, &parameters);

        Ok(json!({
            "success": true,
            "valid": valid,
            "parameters": parsed
        })
        .to_string())
    }

    pub async fn save_simulation(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let requester = requester_arg(arguments);
        let simulation_type = str_arg(arguments, "simulation_type")?;
        let simulation_name = str_arg(arguments, "simulation_name")?;
        let parameters = arguments.get("parameters").cloned().unwrap_or(Value::Null);
        let results = arguments.get("results").cloned().unwrap_or_else(|| json!({}));
        let is_public = arguments
            .get("is_public")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let outcome = SimulationRecord::new(
            requester.user_id().unwrap_or_default(),
            simulation_type,
            simulation_name,
            parameters,
            results,
            now(),
        )
        .map_err(StoreError::from)
        .and_then(|mut record| {
            record.is_public = is_public;
            database::save_simulation(&self.connection, &requester, record)
        });
        respond(outcome, "result")
    }

    pub async fn list_simulations(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let requester = requester_arg(arguments);
        let results = database::list_simulations(&self.connection, &requester)?;

        let summaries: Vec<Value> = results
            .iter()
            .map(|sim| {
                json!({
                    "simulation": sim,
                    "simulation_count": sim.simulation_count(),
                    "display": sim.results_display(),
                })
            })
            .collect();

        Ok(json!({
            "success": true,
            "results": summaries
        })
        .to_string())
    }
}

pub struct AnalysisUseCase {
    connection: Arc<rusqlite::Connection>,
}

impl AnalysisUseCase {
    pub fn new(connection: Arc<rusqlite::Connection>) -> Self {
        Self { connection }
    }

    pub async fn save_analysis(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let requester = requester_arg(arguments);
        let analysis_type = str_arg(arguments, "analysis_type")?;
        let analysis_name = str_arg(arguments, "analysis_name")?;
        let section = |name: &str| arguments.get(name).cloned().unwrap_or_else(|| json!({}));
        let is_public = arguments
            .get("is_public")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let outcome = AnalysisRecord::new(
            requester.user_id().unwrap_or_default(),
            analysis_type,
            analysis_name,
            section("parameters"),
            section("results"),
            section("chart_data"),
            now(),
        )
        .map_err(StoreError::from)
        .and_then(|mut record| {
            record.is_public = is_public;
            database::save_analysis(&self.connection, &requester, record)
        });
        respond(outcome, "result")
    }

    pub async fn list_analyses(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let requester = requester_arg(arguments);
        let results = database::list_analyses(&self.connection, &requester)?;

        let summaries: Vec<Value> = results
            .iter()
            .map(|analysis| {
                json!({
                    "analysis": analysis,
                    "display_name": analysis.display_name(),
                    "draws_analyzed": analysis.draws_analyzed_count(),
                    "top_6": analysis.top_6_numbers(),
                })
            })
            .collect();

        Ok(json!({
            "success": true,
            "results": summaries
        })
        .to_string())
    }
}
