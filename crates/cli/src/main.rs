//! ScriptHost CLI - Command-line interface for the ScriptHost daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9537";

#[derive(Parser)]
#[command(name = "scripthost")]
#[command(about = "ScriptHost CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "SCRIPTHOST_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask running script workers to stop
    Stop {
        /// Milliseconds to wait before giving up (default: daemon setting)
        #[arg(short, long, allow_negative_numbers = true)]
        timeout_ms: Option<i64>,
    },

    /// Show supervisor status
    Status,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct StopResult {
    outcome: String,
    active_workers: u32,
    ticks_remaining: i64,
}

/// String field of an RPC result, without JSON quoting
fn text_field<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or("unknown")
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stop { timeout_ms } => {
            let params = json!({ "timeout_ms": timeout_ms });

            let result = call_rpc(&cli.rpc_url, "script.stop.v1", params).await?;
            let stop_result: StopResult = serde_json::from_value(result)?;

            match stop_result.outcome.as_str() {
                "nothing_to_stop" => println!("{}", "○ No script workers running".yellow()),
                "tightened" => println!("{}", "✓ Stop deadline tightened".green().bold()),
                _ => println!("{}", "✓ Stop requested".green().bold()),
            }
            println!();

            let table = Table::new(vec![stop_result]).to_string();
            println!("{}", table);
        }

        Commands::Status => {
            println!("{}", "Supervisor Status".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "script.status.v1", json!({})).await {
                Ok(status) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Daemon:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Owner:".bold(), text_field(&status, "owner"));
                    let phase = text_field(&status, "phase");
                    let phase = if phase == "stopping" {
                        phase.yellow()
                    } else {
                        phase.green()
                    };
                    println!("  {} {}", "Phase:".bold(), phase);
                    println!("  {} {}", "Active workers:".bold(), status["active_workers"]);
                    println!("  {} {}", "Ticks remaining:".bold(), status["ticks_remaining"]);
                    println!("  {} {}", "Timer armed:".bold(), status["timer_armed"]);
                    println!("  {} {} ms", "Poll interval:".bold(), status["poll_interval_ms"]);
                    println!("  {} {} seconds", "Uptime:".bold(), status["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Daemon:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
