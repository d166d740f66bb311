use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the product gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "GATEWAY_URL", default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a product's stock
    Search {
        /// Product code
        code: String,
        /// Stock date (DD/MM/YYYY); defaults to today on the server
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Check the inventory API through the gateway
    TestConnection,
    /// Show search statistics
    Stats,
    /// Check gateway liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Search { code, date } => {
            let mut body = json!({ "productCode": code });
            if let Some(date) = date {
                body["date"] = Value::String(date);
            }
            client
                .post(format!("{}/product/search", base))
                .json(&body)
                .send()
                .await?
        }
        Commands::TestConnection => {
            client
                .get(format!("{}/product/test-connection", base))
                .send()
                .await?
        }
        Commands::Stats => client.get(format!("{}/product/stats", base)).send().await?,
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
    Ok(())
}
