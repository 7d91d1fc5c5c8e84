use clap::{Parser, Subcommand};
use rst_common::with_tokio::tokio;

use prople_agentd::errors::AgentdError;
use prople_agentd::svc::server::Server;

#[derive(Parser)]
#[command(name = "agentd")]
#[command(version = "0.1")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "serve")]
    #[command(about = "Serving the agent inbound route")]
    Serve {
        #[arg(short, long, value_name = "FILE")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), AgentdError> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Serve { config } => {
            let server = Server::new(config.to_owned());
            server.serve().await?;
        }
    }

    Ok(())
}
