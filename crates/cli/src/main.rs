use ai_bus_cli::{api_client::ApiClient, completions, display, interactive, oneshot};
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ai-bus")]
#[command(about = "Admin CLI for the AI Agent Collaboration Bus")]
struct Cli {
    /// Base URL of the bus's HTTP/WebSocket server
    #[arg(long, global = true, default_value = "http://localhost:8080")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message into a workspace
    Publish {
        workspace_id: String,
        to_agent: String,
        /// JSON content, or a plain string if it doesn't parse as JSON
        content: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// Stream every frame delivered to an agent's WebSocket session
    Tail { workspace_id: String, agent_id: String },
    /// Print pending/processing/dead-letter counts for an agent's inbox queue
    QueueStats { agent_id: String },
    /// Check the bus's health endpoint
    Health,
    /// Generate shell completions for this CLI
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish { workspace_id, to_agent, content, kind, mode, priority } => {
            oneshot::publish(&cli.server_url, &workspace_id, &to_agent, &content, kind, mode, priority).await?;
        }
        Commands::Tail { workspace_id, agent_id } => {
            interactive::tail(&cli.server_url, &workspace_id, &agent_id).await?;
        }
        Commands::QueueStats { agent_id } => {
            let client = ApiClient::new(&cli.server_url);
            let size = client.queue_stats(&agent_id).await?;
            display::queue_size(&agent_id, &size);
        }
        Commands::Health => {
            let client = ApiClient::new(&cli.server_url);
            let report = client.health().await?;
            display::health(&report);
        }
        Commands::Completions { shell } => {
            completions::generate(shell, Cli::command());
        }
    }

    Ok(())
}
