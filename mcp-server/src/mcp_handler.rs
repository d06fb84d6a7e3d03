use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::use_cases::{AnalysisUseCase, ContactUseCase, DrawUseCase, SimulationUseCase};

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, serde::Deserialize)]
struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    fn failure(id: Option<Value>, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
            id,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

pub struct MCPHandler {
    draw_use_case: Arc<DrawUseCase>,
    contact_use_case: Arc<ContactUseCase>,
    simulation_use_case: Arc<SimulationUseCase>,
    analysis_use_case: Arc<AnalysisUseCase>,
}

impl MCPHandler {
    pub fn new(
        draw_use_case: Arc<DrawUseCase>,
        contact_use_case: Arc<ContactUseCase>,
        simulation_use_case: Arc<SimulationUseCase>,
        analysis_use_case: Arc<AnalysisUseCase>,
    ) -> Self {
        Self {
            draw_use_case,
            contact_use_case,
            simulation_use_case,
            analysis_use_case,
        }
    }

    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    let error_response = JsonRpcResponse::failure(
                        None,
                        PARSE_ERROR,
                        "Parse error".to_string(),
                        Some(json!(e.to_string())),
                    );
                    writeln!(writer, "{}", serde_json::to_string(&error_response)?)?;
                    writer.flush()?;
                    continue;
                }
            };

            // Notifications never get an answer.
            if request.id.is_none() || request.method.starts_with("notifications/") {
                if request.method == "notifications/initialized" {
                    info!("🎰 Client initialized");
                }
                continue;
            }

            let response = self.handle_request(request).await;
            writeln!(writer, "{}", serde_json::to_string(&response)?)?;
            writer.flush()?;
        }

        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": tools() })),
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            _ => JsonRpcResponse::failure(
                Some(request.id.unwrap_or(json!(1))),
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
                None,
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("🎰 Initializing Lotto 6aus49 MCP server");
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "lotto6-mcp-server",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let id = Some(id.unwrap_or(json!(1)));

        let Some(params) = params else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params".to_string(), None);
        };

        let Some(tool_name) = params.get("name").and_then(|n| n.as_str()) else {
            return JsonRpcResponse::failure(
                id,
                INVALID_PARAMS,
                "Missing tool name".to_string(),
                None,
            );
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let arguments_map: HashMap<String, Value> = match serde_json::from_value(arguments) {
            Ok(map) => map,
            Err(e) => {
                return JsonRpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    format!("arguments must be an object: {}", e),
                    None,
                );
            }
        };

        match self.execute_tool(tool_name, &arguments_map).await {
            Ok(content) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                }),
            ),
            Err(e) => {
                warn!(tool = tool_name, "tool failed: {:#}", e);
                JsonRpcResponse::failure(
                    id,
                    INTERNAL_ERROR,
                    format!("Tool execution error: {}", e),
                    None,
                )
            }
        }
    }

    async fn execute_tool(
        &self,
        tool_name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<String> {
        match tool_name {
            "validate_draw" => self.draw_use_case.validate_draw(arguments).await,
            "create_draw" => self.draw_use_case.create_draw(arguments).await,
            "update_draw" => self.draw_use_case.update_draw(arguments).await,
            "get_draw_by_date" => self.draw_use_case.get_draw_by_date(arguments).await,
            "get_latest_draws" => self.draw_use_case.get_latest_draws(arguments).await,
            "get_draws_by_date_range" => self.draw_use_case.get_draws_by_date_range(arguments).await,
            "submit_contact_message" => {
                self.contact_use_case.submit_contact_message(arguments).await
            }
            "validate_simulation_parameters" => {
                self.simulation_use_case
                    .validate_simulation_parameters(arguments)
                    .await
            }
            "save_simulation" => self.simulation_use_case.save_simulation(arguments).await,
            "list_simulations" => self.simulation_use_case.list_simulations(arguments).await,
            "save_analysis" => self.analysis_use_case.save_analysis(arguments).await,
            "list_analyses" => self.analysis_use_case.list_analyses(arguments).await,
            "create_database" => self.draw_use_case.create_database(arguments).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }
}

fn date_property(description: &str) -> Value {
    json!({
        "type": "string",
        "description": format!("{} in YYYY-MM-DD format", description)
    })
}

fn requester_properties() -> serde_json::Map<String, Value> {
    let properties = json!({
        "user_id": {
            "type": "string",
            "description": "Authenticated user id; omit for anonymous callers"
        },
        "is_admin": {
            "type": "boolean",
            "description": "Whether the authenticated user is an administrator"
        }
    });
    match properties {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn with_requester(mut schema: Value) -> Value {
    if let Some(Value::Object(properties)) = schema.get_mut("properties") {
        properties.extend(requester_properties());
    }
    schema
}

fn tools() -> Vec<Tool> {
    let draw_fields = json!({
        "type": "object",
        "description": "Raw draw fields: date, draw_day, numbers, super_number, spiel77, super6"
    });

    vec![
        Tool {
            name: "validate_draw",
            description: "Validate raw draw fields without storing them",
            input_schema: json!({
                "type": "object",
                "properties": { "fields": draw_fields },
                "required": ["fields"]
            }),
        },
        Tool {
            name: "create_draw",
            description: "Validate a Lotto 6aus49 draw and store it",
            input_schema: json!({
                "type": "object",
                "properties": { "fields": draw_fields },
                "required": ["fields"]
            }),
        },
        Tool {
            name: "update_draw",
            description: "Apply a partial update to the draw stored for a date",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "date": date_property("Draw date"),
                    "fields": {
                        "type": "object",
                        "description": "Any subset of draw_day, numbers, super_number, spiel77, super6"
                    }
                },
                "required": ["date", "fields"]
            }),
        },
        Tool {
            name: "get_draw_by_date",
            description: "Get the draw stored for a specific date",
            input_schema: json!({
                "type": "object",
                "properties": { "date": date_property("Draw date") },
                "required": ["date"]
            }),
        },
        Tool {
            name: "get_latest_draws",
            description: "Get the most recent draws",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Number of draws to return (default: 10)"
                    }
                }
            }),
        },
        Tool {
            name: "get_draws_by_date_range",
            description: "Get draws within a date range, inclusive",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "start_date": date_property("Start date"),
                    "end_date": date_property("End date")
                },
                "required": ["start_date", "end_date"]
            }),
        },
        Tool {
            name: "submit_contact_message",
            description: "Validate and store a contact form message",
            input_schema: with_requester(json!({
                "type": "object",
                "properties": {
                    "fields": {
                        "type": "object",
                        "description": "first_name, last_name, email, phone (optional), message"
                    }
                },
                "required": ["fields"]
            })),
        },
        Tool {
            name: "validate_simulation_parameters",
            description: "Check simulation parameters against the rules for their type",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "simulation_type": {
                        "type": "string",
                        "description": "random, frequency_based, overdue_based, mixed_strategy or monte_carlo"
                    },
                    "parameters": { "type": "object" }
                },
                "required": ["simulation_type", "parameters"]
            }),
        },
        Tool {
            name: "save_simulation",
            description: "Save a simulation run for the calling user",
            input_schema: with_requester(json!({
                "type": "object",
                "properties": {
                    "simulation_type": { "type": "string" },
                    "simulation_name": { "type": "string" },
                    "parameters": { "type": "object" },
                    "results": { "type": "object" },
                    "is_public": { "type": "boolean" }
                },
                "required": ["simulation_type", "simulation_name", "parameters", "user_id"]
            })),
        },
        Tool {
            name: "list_simulations",
            description: "List the simulations visible to the caller",
            input_schema: with_requester(json!({
                "type": "object",
                "properties": {}
            })),
        },
        Tool {
            name: "save_analysis",
            description: "Save a draw analysis for the calling user",
            input_schema: with_requester(json!({
                "type": "object",
                "properties": {
                    "analysis_type": {
                        "type": "string",
                        "description": "frequently_seen, rarely_seen, overdue or pattern"
                    },
                    "analysis_name": { "type": "string" },
                    "parameters": { "type": "object" },
                    "results": { "type": "object" },
                    "chart_data": { "type": "object" },
                    "is_public": { "type": "boolean" }
                },
                "required": ["analysis_type", "analysis_name", "user_id"]
            })),
        },
        Tool {
            name: "list_analyses",
            description: "List the analyses visible to the caller",
            input_schema: with_requester(json!({
                "type": "object",
                "properties": {}
            })),
        },
        Tool {
            name: "create_database",
            description: "Create the Lotto 6aus49 tables if they do not exist",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_tool_has_an_object_schema() {
        let tools = tools();
        assert_eq!(tools.len(), 13);
        for tool in &tools {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        }
    }

    #[test]
    fn requester_fields_are_added_to_owned_tools() {
        let tools = tools();
        let save = tools.iter().find(|t| t.name == "save_simulation").unwrap();
        assert!(save.input_schema["properties"]["user_id"].is_object());
        assert!(save.input_schema["properties"]["is_admin"].is_object());

        let create = tools.iter().find(|t| t.name == "create_draw").unwrap();
        assert!(create.input_schema["properties"].get("user_id").is_none());
    }
}
