use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the Admission Gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health and breaker state
    Health,
    /// View the live performance snapshot
    Metrics,
    /// Register a device
    RegisterDevice {
        owner: String,
        device_id: String,
        /// browser, mobile, hardware, or service
        #[arg(default_value = "service")]
        kind: String,
        /// Attestation statement, if any
        #[arg(long)]
        attestation: Option<String>,
    },
    /// Start a session
    StartSession {
        owner: String,
        device_id: String,
        correlation_id: String,
        /// Comma-separated scopes, e.g. wallet_read,wallet_transfer
        #[arg(long, default_value = "wallet_read")]
        scopes: String,
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },
    /// Validate a session token
    Validate {
        session_id: String,
        caller: String,
        #[arg(long, default_value = "")]
        scopes: String,
    },
    /// Revoke a session token
    Revoke { session_id: String, caller: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Metrics => {
            let res = client
                .get(format!("{}/v1/metrics/performance", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::RegisterDevice {
            owner,
            device_id,
            kind,
            attestation,
        } => {
            let proof = attestation.map(|a| json!({ "attestation": a }));
            let res = client
                .post(format!("{}/v1/devices", cli.url))
                .json(&json!({
                    "owner": owner,
                    "device_id": device_id,
                    "kind": kind,
                    "proof": proof,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::StartSession {
            owner,
            device_id,
            correlation_id,
            scopes,
            ttl_secs,
        } => {
            let res = client
                .post(format!("{}/v1/sessions", cli.url))
                .json(&json!({
                    "owner": owner,
                    "device_id": device_id,
                    "scopes": split_scopes(&scopes),
                    "ttl_secs": ttl_secs,
                    "correlation_id": correlation_id,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Validate {
            session_id,
            caller,
            scopes,
        } => {
            let res = client
                .post(format!("{}/v1/sessions/validate", cli.url))
                .json(&json!({
                    "session_id": session_id,
                    "caller": caller,
                    "required_scopes": split_scopes(&scopes),
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Revoke { session_id, caller } => {
            let res = client
                .post(format!("{}/v1/sessions/revoke", cli.url))
                .json(&json!({ "session_id": session_id, "caller": caller }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn split_scopes(scopes: &str) -> Vec<String> {
    scopes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
