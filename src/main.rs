use clap::{Parser, Subcommand};
use confluence_rs::adk::agent::{Agent, ChatAgent};
use confluence_rs::adk::model::{openai::OpenAIModel, Model};
use confluence_rs::confluence::server;
use confluence_rs::confluence::workflow::{
    AgentExecutor, AgentRegistry, AggregationExecutor, ExecutionEngine, Executor, RunOptions,
    StartExecutor, WorkflowBuilder, WorkflowEvent,
};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fan a question out to several expert agents and print the
    /// aggregated answer
    Run {
        /// The question to ask
        #[arg(short, long)]
        question: String,

        /// Expert definition as "Name=instructions"; repeatable.
        /// Defaults to a physicist and a chemist.
        #[arg(short, long)]
        expert: Vec<String>,

        /// The model to use
        #[arg(short, long, default_value = "gpt-4o-mini")]
        model: String,

        /// Per-run deadline in seconds
        #[arg(short, long, default_value_t = 120)]
        timeout: u64,
    },
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
}

/// Parse an "Name=instructions" expert definition
fn parse_expert(spec: &str) -> Result<(String, String), String> {
    match spec.split_once('=') {
        Some((name, instructions)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), instructions.trim().to_string()))
        }
        _ => Err(format!(
            "Invalid expert spec '{}', expected Name=instructions",
            spec
        )),
    }
}

fn default_experts() -> Vec<(String, String)> {
    vec![
        (
            "Physicist".to_string(),
            "You are an expert in physics. You answer questions from a physics perspective."
                .to_string(),
        ),
        (
            "Chemist".to_string(),
            "You are an expert in chemistry. You answer questions from a chemistry perspective."
                .to_string(),
        ),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            question,
            expert,
            model: model_name,
            timeout,
        } => {
            let experts = if expert.is_empty() {
                default_experts()
            } else {
                expert
                    .iter()
                    .map(|spec| parse_expert(spec))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(anyhow::Error::msg)?
            };

            log::info!(
                "Running concurrent workflow with {} experts on model {}",
                experts.len(),
                model_name
            );

            let model: Arc<dyn Model> = Arc::new(OpenAIModel::new(model_name)?);

            let mut targets: Vec<Arc<dyn Executor>> = Vec::new();
            let mut names: Vec<String> = Vec::new();
            for (name, instructions) in experts {
                let agent: Arc<dyn Agent> =
                    Arc::new(ChatAgent::new(&name, "", instructions, model.clone()));
                names.push(name);
                targets.push(Arc::new(AgentExecutor::new(agent)));
            }
            let sources: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
            let aggregator = Arc::new(AggregationExecutor::new("aggregator", targets.len()));

            let graph = WorkflowBuilder::new(Arc::new(StartExecutor::default()))
                .add_fan_out_edge("start", targets)
                .add_fan_in_edge(&sources, aggregator)
                .with_output_from("aggregator")
                .build()?;

            let mut run = ExecutionEngine::stream(
                graph,
                question,
                RunOptions::with_timeout(Duration::from_secs(timeout)),
            );

            while let Some(event) = run.next_event().await {
                match event {
                    WorkflowEvent::Started => println!("Workflow execution started."),
                    WorkflowEvent::Output(output) => {
                        println!("Workflow completed with results:\n{}", output)
                    }
                    WorkflowEvent::Error(e) => anyhow::bail!("Workflow failed: {}", e),
                }
            }
        }
        Commands::Serve { port } => {
            let model_name = std::env::var("CONFLUENCE_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string());
            let model: Arc<dyn Model> = Arc::new(OpenAIModel::new(model_name)?);
            let registry = AgentRegistry::new();

            server::serve(port, registry, model)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}
