// SPDX-License-Identifier: MIT

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::agent::{Agent, ChatAgent};
use crate::adk::error::BuildError;
use crate::adk::model::Model;
use crate::confluence::workflow::{
    AgentExecutor, AgentRegistry, AggregationExecutor, ExecutionEngine, Executor, RunOptions,
    StartExecutor, WorkflowBuilder, WorkflowEvent, WorkflowGraph,
};

/// Runs that arrive without a deadline still get one; a stuck provider
/// call must not pin a request handler forever.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const DEFAULT_QUESTION: &str = "Are these transactions fraudulent?";

#[derive(Clone)]
struct AppState {
    registry: AgentRegistry,
    model: Arc<dyn Model>,
}

pub async fn serve(
    port: u16,
    registry: AgentRegistry,
    model: Arc<dyn Model>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = AppState { registry, model };

    let app = Router::new()
        .route("/health-check", get(health_check))
        .route("/agents", post(create_agents))
        .route("/workflows/run", post(run_workflow))
        .route("/workflows/stream", post(stream_workflow))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct PromptDefinition {
    name: String,
    #[serde(default)]
    description: String,
    instructions: String,
    /// Optional JSON schema for structured output
    response_schema: Option<Value>,
}

#[derive(Deserialize)]
struct CreateAgentsRequest {
    prompts: Vec<PromptDefinition>,
}

async fn create_agents(
    State(state): State<AppState>,
    Json(payload): Json<CreateAgentsRequest>,
) -> Json<Value> {
    let mut created = Vec::new();

    for prompt in payload.prompts {
        let mut agent = ChatAgent::new(
            prompt.name.clone(),
            prompt.description.clone(),
            prompt.instructions.clone(),
            state.model.clone(),
        );
        if let Some(schema) = prompt.response_schema {
            agent = agent.with_response_schema(schema);
        }

        let id = state.registry.register(Arc::new(agent)).await;
        log::info!("Registered agent '{}' as {}", prompt.name, id);

        created.push(json!({
            "id": id,
            "name": prompt.name,
            "description": prompt.description,
            "instructions": prompt.instructions,
        }));
    }

    Json(json!({ "agents": created }))
}

#[derive(Deserialize)]
struct WorkflowRequest {
    agent_ids: Vec<String>,
    question: Option<String>,
    /// Arbitrary structured data serialized into the prompt
    transactions: Option<Value>,
    timeout_secs: Option<u64>,
}

impl WorkflowRequest {
    fn input_message(&self) -> String {
        let question = self.question.as_deref().unwrap_or(DEFAULT_QUESTION);
        match &self.transactions {
            Some(data) => format!("Analyze these transactions: {}. {}", data, question),
            None => question.to_string(),
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions::with_timeout(Duration::from_secs(
            self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        ))
    }
}

/// Wire a fresh fan-out/fan-in graph over the given agents. Fresh per
/// run: the aggregation barrier is single-use by contract.
fn build_workflow(agents: Vec<Arc<dyn Agent>>) -> Result<WorkflowGraph, BuildError> {
    let executors: Vec<Arc<dyn Executor>> = agents
        .into_iter()
        .map(|agent| Arc::new(AgentExecutor::new(agent)) as Arc<dyn Executor>)
        .collect();
    let names: Vec<String> = executors.iter().map(|e| e.name().to_string()).collect();
    let sources: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    let aggregator = Arc::new(AggregationExecutor::new("aggregator", executors.len()));

    WorkflowBuilder::new(Arc::new(StartExecutor::default()))
        .add_fan_out_edge("start", executors)
        .add_fan_in_edge(&sources, aggregator)
        .with_output_from("aggregator")
        .build()
}

async fn run_workflow(
    State(state): State<AppState>,
    Json(payload): Json<WorkflowRequest>,
) -> Json<Value> {
    let agents = match state.registry.resolve(&payload.agent_ids).await {
        Ok(agents) => agents,
        Err(id) => return Json(json!({ "error": format!("Unknown agent id: {}", id) })),
    };

    let graph = match build_workflow(agents) {
        Ok(graph) => graph,
        Err(e) => return Json(json!({ "error": format!("Failed to build workflow: {}", e) })),
    };

    let input = payload.input_message();
    let options = payload.run_options();

    match ExecutionEngine::run(graph, input, options).await {
        Ok(result) => Json(json!({ "result": result })),
        Err(e) => Json(json!({ "error": format!("Workflow failed: {}", e) })),
    }
}

async fn stream_workflow(
    State(state): State<AppState>,
    Json(payload): Json<WorkflowRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<WorkflowEvent>(100);

    tokio::spawn(async move {
        log::info!(
            "Starting streaming workflow over {} agents",
            payload.agent_ids.len()
        );

        let agents = match state.registry.resolve(&payload.agent_ids).await {
            Ok(agents) => agents,
            Err(id) => {
                let _ = tx
                    .send(WorkflowEvent::Error(
                        crate::adk::error::RunError::Branch {
                            node: "registry".to_string(),
                            message: format!("Unknown agent id: {}", id),
                        },
                    ))
                    .await;
                return;
            }
        };

        let graph = match build_workflow(agents) {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("Failed to build workflow: {}", e);
                let _ = tx
                    .send(WorkflowEvent::Error(
                        crate::adk::error::RunError::Branch {
                            node: "builder".to_string(),
                            message: e.to_string(),
                        },
                    ))
                    .await;
                return;
            }
        };

        let mut run =
            ExecutionEngine::stream(graph, payload.input_message(), payload.run_options());
        while let Some(event) = run.next_event().await {
            if tx.send(event).await.is_err() {
                // Client went away; stop relaying
                run.cancel();
                return;
            }
        }
        log::info!("Streaming workflow finished");
    });

    let stream =
        ReceiverStream::new(rx).map(|event| Ok(Event::default().json_data(event).unwrap()));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new().interval(std::time::Duration::from_secs(1)),
    )
}
