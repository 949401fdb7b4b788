use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the service gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000", env = "GATEWAY_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway information
    Status,
    /// Show per-service health as seen by the gateway
    Health,
    /// Check readiness (exit code 1 while not ready)
    Ready,
    /// List routes and the services behind them
    Services,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Status => "/",
            Commands::Health => "/health",
            Commands::Ready => "/ready",
            Commands::Services => "/api-docs",
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.get(url).send().await?;
    let ok = res.status().is_success();

    // /ready answers 503 with a JSON body worth showing.
    if ok || matches!(cli.command, Commands::Ready) {
        print_json(res).await?;
    } else {
        eprintln!("Error: gateway returned status {}", res.status());
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
