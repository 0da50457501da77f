use aiz::adk::agent::Agent;
use aiz::adk::graph::{GraphEvent, Target};
use aiz::adk::model::ProviderFactory;
use aiz::aiz::agents::{build_generator_agent, build_supervisor_agent};
use aiz::aiz::config::AppConfig;
use aiz::aiz::consent::{ConsentProvider, StaticConsent, TerminalConsent};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file (provider mapping and agent settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the model provider (anthropic, aws_bedrock)
    #[arg(long)]
    provider: Option<String>,

    /// Override the model id
    #[arg(long)]
    model_id: Option<String>,

    /// Execute without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the shell command for an objective without running it
    Generate {
        /// What you want to do, in plain words
        #[arg(short, long)]
        query: String,
    },
    /// Generate the command, confirm it and execute it
    Run {
        /// What you want to do, in plain words
        #[arg(short, long)]
        query: String,
    },
}

fn describe(event: &GraphEvent) -> String {
    match event {
        GraphEvent::NodeEntered { session, node } => format!("[{}] -> {}", session, node),
        GraphEvent::NodeExited {
            session,
            node,
            next: Target::Node(next),
        } => format!("[{}] {} done, next: {}", session, node, next),
        GraphEvent::NodeExited {
            session,
            node,
            next: Target::End,
        } => format!("[{}] {} done, finishing", session, node),
        GraphEvent::RunTerminated {
            session,
            outcome,
            error: None,
        } => format!("[{}] finished ({:?})", session, outcome),
        GraphEvent::RunTerminated {
            session,
            outcome,
            error: Some(error),
        } => format!("[{}] failed in {:?}: {}", session, outcome, error),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::from_env(),
    }
    .with_overrides(args.provider.as_deref(), args.model_id.as_deref());

    let model = ProviderFactory::new().build(&config.provider)?;
    log::info!("Using provider: {}", model.provider());

    match args.command {
        Commands::Generate { query } => {
            let agent = build_generator_agent(model, &config.settings)?;
            let command = agent.run(query).await?;
            println!("{}", command.trim());
        }
        Commands::Run { query } => {
            let consent: Arc<dyn ConsentProvider> = if args.yes {
                Arc::new(StaticConsent(true))
            } else {
                Arc::new(TerminalConsent)
            };
            let agent = build_supervisor_agent(model, consent, &config.settings)?;

            let (tx, rx) = mpsc::channel(64);
            let printer = tokio::spawn(async move {
                let mut events = ReceiverStream::new(rx);
                while let Some(event) = events.next().await {
                    eprintln!("{}", describe(&event));
                }
            });

            let answer = agent.run_stream(query, tx).await;
            let _ = printer.await;
            println!("{}", answer?);
        }
    }

    Ok(())
}
