//! Drives the JSON-RPC loop with an in-memory store and captured output.

use lotto6_mcp::connection::in_memory;
use lotto6_mcp::{AnalysisUseCase, ContactUseCase, DrawUseCase, MCPHandler, SimulationUseCase};
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;

async fn run(requests: &[Value]) -> Vec<Value> {
    let input = requests
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    run_raw(&input).await
}

async fn run_raw(input: &str) -> Vec<Value> {
    let conn = Arc::new(in_memory().unwrap());
    let handler = MCPHandler::new(
        Arc::new(DrawUseCase::new(Arc::clone(&conn))),
        Arc::new(ContactUseCase::new(Arc::clone(&conn))),
        Arc::new(SimulationUseCase::new(Arc::clone(&conn))),
        Arc::new(AnalysisUseCase::new(Arc::clone(&conn))),
    );

    let mut output = Vec::new();
    handler
        .serve(Cursor::new(input.to_string()), &mut output)
        .await
        .unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn call(id: u64, tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments }
    })
}

/// The JSON document a tool returned as its text content.
fn tool_body(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

fn draw_fields() -> Value {
    json!({
        "date": "2025-06-21",
        "draw_day": "Samstag",
        "numbers": "7, 12, 16, 19, 30, 36",
        "super_number": 4,
        "spiel77": "3 1 6 8 5 3 4",
        "super6": "8 5 3 8 4 9"
    })
}

#[tokio::test]
async fn initialize_and_list_tools() {
    let responses = run(&[
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    ])
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(
        responses[0]["result"]["serverInfo"]["name"],
        "lotto6-mcp-server"
    );
    let tools = responses[1]["result"]["tools"].as_array().unwrap();
    assert!(tools.iter().any(|t| t["name"] == "save_simulation"));
}

#[tokio::test]
async fn protocol_errors_use_json_rpc_codes() {
    let input = [
        "{not json".to_string(),
        json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call"}).to_string(),
        call(3, "no_such_tool", json!({})).to_string(),
    ]
    .join("\n");
    let responses = run_raw(&input).await;

    assert_eq!(responses[0]["error"]["code"], -32700);
    assert!(responses[0]["id"].is_null());
    assert_eq!(responses[1]["error"]["code"], -32601);
    assert_eq!(responses[2]["error"]["code"], -32602);
    assert_eq!(responses[3]["error"]["code"], -32603);
}

#[tokio::test]
async fn draw_is_created_then_read_back() {
    let responses = run(&[
        call(1, "create_draw", json!({ "fields": draw_fields() })),
        call(2, "get_draw_by_date", json!({ "date": "2025-06-21" })),
        call(3, "create_draw", json!({ "fields": draw_fields() })),
    ])
    .await;

    assert_eq!(tool_body(&responses[0])["success"], true);

    let stored = tool_body(&responses[1]);
    assert_eq!(stored["result"]["numbers"], json!([7, 12, 16, 19, 30, 36]));
    assert_eq!(stored["result"]["draw_day"], "Samstag");

    assert_eq!(responses[2]["error"]["code"], -32603);
    let message = responses[2]["error"]["message"].as_str().unwrap();
    assert!(message.contains("already exists"));
}

#[tokio::test]
async fn invalid_draw_lists_every_field_error() {
    let mut fields = draw_fields();
    fields["draw_day"] = json!("Freitag");
    fields["numbers"] = json!("1, 2, 3, 4, 5, 50");

    let responses = run(&[call(1, "validate_draw", json!({ "fields": fields }))]).await;
    let body = tool_body(&responses[0]);

    assert_eq!(body["success"], false);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .any(|e| e["field"] == "draw_day" && e["kind"] == "format")
    );
    assert!(
        errors
            .iter()
            .any(|e| e["field"] == "numbers" && e["kind"] == "range")
    );
}

#[tokio::test]
async fn simulation_parameters_are_checked_per_type() {
    let responses = run(&[
        call(
            1,
            "validate_simulation_parameters",
            json!({
                "simulation_type": "mixed_strategy",
                "parameters": {
                    "number_of_simulations": 5,
                    "number_of_past_draws": 100,
                    "strategy_weights": {"frequency": 0.5, "overdue": 0.5}
                }
            }),
        ),
        call(
            2,
            "validate_simulation_parameters",
            json!({
                "simulation_type": "mixed_strategy",
                "parameters": {
                    "number_of_simulations": 5,
                    "number_of_past_draws": 100,
                    "strategy_weights": {"frequency": 0.5, "overdue": 0.3}
                }
            }),
        ),
    ])
    .await;

    let ok = tool_body(&responses[0]);
    assert_eq!(ok["valid"], true);
    assert_eq!(ok["parameters"]["simulation_type"], "mixed_strategy");
    assert_eq!(tool_body(&responses[1])["valid"], false);
}

#[tokio::test]
async fn saving_requires_a_user_and_respects_the_quota() {
    let save = |id: u64, name: &str, user: Option<&str>| {
        let mut arguments = json!({
            "simulation_type": "random",
            "simulation_name": name,
            "parameters": {"number_of_simulations": 2},
            "results": {"simulations": {"Sim_1": [1, 2, 3, 4, 5, 6]}}
        });
        if let Some(user) = user {
            arguments["user_id"] = json!(user);
        }
        call(id, "save_simulation", arguments)
    };

    let responses = run(&[
        save(1, "anonym", None),
        save(2, "erste", Some("user_1")),
        save(3, "zweite", Some("user_1")),
        call(4, "list_simulations", json!({ "user_id": "user_1" })),
    ])
    .await;

    assert_eq!(responses[0]["error"]["code"], -32603);
    assert_eq!(tool_body(&responses[1])["success"], true);

    let listed = tool_body(&responses[3]);
    let results = listed["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["simulation"]["simulation_name"], "zweite");
    assert_eq!(results[0]["simulation_count"], 1);
}

#[tokio::test]
async fn contact_message_ignores_user_id_in_fields() {
    let responses = run(&[call(
        1,
        "submit_contact_message",
        json!({
            "user_id": "user_7",
            "fields": {
                "first_name": "Max",
                "last_name": "Mustermann",
                "email": "max@example.de",
                "message": "Hallo",
                "user_id": "someone_else"
            }
        }),
    )])
    .await;

    let body = tool_body(&responses[0]);
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["user_id"], "user_7");
}

#[tokio::test]
async fn analysis_is_saved_and_summarised() {
    let responses = run(&[
        call(
            1,
            "save_analysis",
            json!({
                "user_id": "user_1",
                "analysis_type": "frequently_seen",
                "analysis_name": "Top Zahlen",
                "results": {
                    "top_numbers": {"top_6": [6, 49, 31, 26, 33, 38]},
                    "metadata": {"total_draws_analyzed": 104}
                }
            }),
        ),
        call(2, "list_analyses", json!({ "user_id": "user_1" })),
    ])
    .await;

    assert_eq!(tool_body(&responses[0])["success"], true);
    let listed = tool_body(&responses[1]);
    let first = &listed["results"][0];
    assert_eq!(first["display_name"], "Häufige Zahlen");
    assert_eq!(first["draws_analyzed"], 104);
    assert_eq!(first["top_6"], json!([6, 49, 31, 26, 33, 38]));
}
