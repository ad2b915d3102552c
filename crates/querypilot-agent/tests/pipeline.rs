//! End-to-end pipeline runs against a scripted model and canned tools.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use querypilot_agent::{Pipeline, StepEvent, StepSink, ToolRegistry};
use querypilot_ai::{
    ChatClient, ChatResponse, Message, ProviderError, ToolCall, ToolDefinition,
};

struct Scripted {
    responses: Mutex<VecDeque<ChatResponse>>,
}

impl Scripted {
    fn new(responses: Vec<ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl ChatClient for Scripted {
    async fn send_message(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ChatResponse, ProviderError> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted"))
    }
}

fn terminal(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.into(),
        tool_calls: Vec::new(),
    }
}

fn calls_tool(name: &str, arguments: serde_json::Value) -> ChatResponse {
    ChatResponse {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }],
    }
}

fn canned_registry(name: &str, payload: &str) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let payload = payload.to_string();
    registry.register(
        ToolDefinition {
            name: name.to_string(),
            description: "canned".into(),
            parameters: json!({"type": "object"}),
        },
        Arc::new(move |_args| {
            let payload = payload.clone();
            Box::pin(async move { Ok(payload) })
        }),
    );
    registry
}

fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<StepEvent>) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event.to_json());
    }
    events
}

#[tokio::test]
async fn show_me_all_users_streams_every_step() {
    let client = Scripted::new(vec![
        calls_tool("get_table_names", json!({"db_url": "postgres://localhost/app"})),
        calls_tool(
            "get_table_structure",
            json!({"db_url": "postgres://localhost/app", "required_tables": ["User", "Chat"]}),
        ),
        terminal("SELECT \"id\",\"username\" FROM \"User\""),
        calls_tool(
            "query",
            json!({"db_url": "postgres://localhost/app", "query": "SELECT \"id\",\"username\" FROM \"User\""}),
        ),
    ]);

    let structures = r#"[{"name":"User","columns":[{"name":"id","type":"integer"},{"name":"username","type":"text"}]},{"name":"Chat","columns":[{"name":"id","type":"integer"}]}]"#;
    let pipeline = Pipeline::new(
        client,
        canned_registry("get_table_names", r#"["User","Chat"]"#),
        canned_registry("get_table_structure", structures),
        canned_registry("query", r#"[{"id":1,"username":"ada"}]"#),
    );

    let (sink, rx) = StepSink::channel();
    pipeline
        .run("show me all users on postgres://localhost/app", &sink)
        .await
        .unwrap();

    let events = drain(rx);
    let keys: Vec<&str> = events
        .iter()
        .map(|e| e.as_object().unwrap().keys().next().unwrap().as_str())
        .collect();
    assert_eq!(
        keys,
        [
            "model_response",
            "get_table_names",
            "model_response",
            "get_table_structure",
            "generated_sql",
            "model_response",
            "query",
        ]
    );

    assert_eq!(events[1]["get_table_names"][0], "User");
    assert_eq!(events[3]["get_table_structure"][0]["name"], "User");
    assert_eq!(
        events[4]["generated_sql"],
        "SELECT \"id\",\"username\" FROM \"User\""
    );
    // Exactly one result batch.
    let query_events: Vec<_> = events
        .iter()
        .filter(|e| e.get("query").is_some())
        .collect();
    assert_eq!(query_events.len(), 1);
    assert_eq!(query_events[0]["query"][0]["username"], "ada");
}

#[tokio::test]
async fn query_execution_failure_surfaces_as_a_string_result() {
    let client = Scripted::new(vec![
        terminal("no tables worth listing"),
        terminal("no structures either"),
        terminal("SELECT broken FROM nowhere"),
        calls_tool(
            "query",
            json!({"db_url": "postgres://localhost/app", "query": "SELECT broken FROM nowhere"}),
        ),
    ]);

    let pipeline = Pipeline::new(
        client,
        canned_registry("get_table_names", "[]"),
        canned_registry("get_table_structure", "[]"),
        canned_registry(
            "query",
            "Error executing query: relation \"nowhere\" does not exist",
        ),
    );

    let (sink, rx) = StepSink::channel();
    // The run still completes successfully end-to-end.
    pipeline
        .run("break things on postgres://localhost/app", &sink)
        .await
        .unwrap();

    let events = drain(rx);
    let query_event = events.iter().find(|e| e.get("query").is_some()).unwrap();
    assert!(query_event["query"]
        .as_str()
        .unwrap()
        .starts_with("Error executing query:"));
}

#[tokio::test]
async fn discovery_without_tool_calls_skips_tool_execution() {
    let client = Scripted::new(vec![
        terminal("I already know this database"),
        terminal("and its structure"),
        terminal("SELECT 1"),
        terminal("done"),
    ]);

    let pipeline = Pipeline::new(
        client,
        canned_registry("get_table_names", "unused"),
        canned_registry("get_table_structure", "unused"),
        canned_registry("query", "unused"),
    );

    let (sink, rx) = StepSink::channel();
    pipeline.run("do nothing", &sink).await.unwrap();

    let events = drain(rx);
    // One model response per phase, the synthesized SQL, no tool outputs.
    let model_responses = events
        .iter()
        .filter(|e| e.get("model_response").is_some())
        .count();
    assert_eq!(model_responses, 3);
    assert!(events.iter().all(|e| e.get("get_table_names").is_none()));
    assert!(events.iter().any(|e| e.get("generated_sql").is_some()));
}
