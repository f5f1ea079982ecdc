use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "faucet-cli")]
#[command(about = "Operator CLI for the testnet faucet", long_about = None)]
struct Cli {
    #[arg(short, long, env = "FAUCET_URL", default_value = "http://localhost:3001")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service and per-network health
    Health,
    /// Show configured networks and the claim policy
    Networks,
    /// Submit a claim
    Claim {
        /// Recipient address
        #[arg(short, long)]
        address: String,
        /// Captcha token (the provider's test token works with the test secret)
        #[arg(short, long)]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Networks => {
            let res = client.get(format!("{}/api/networks", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Claim { address, token } => {
            let res = client
                .post(format!("{}/api/claim", base))
                .json(&json!({ "address": address, "captchaToken": token }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: faucet returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
