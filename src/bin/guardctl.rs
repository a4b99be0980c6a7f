use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use guard_proxy::config::validation::validate_app;
use guard_proxy::config::AppConfig;

#[derive(Parser)]
#[command(name = "guardctl")]
#[command(about = "Management CLI for guard-proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GUARD_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy status
    Status,
    /// List applications with routes and live outcome counters
    Apps,
    /// Insert or replace one application from a JSON or TOML file
    Apply {
        /// Application definition (`.json` or `.toml`)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Apps => {
            let res = client
                .get(format!("{}/admin/apps", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Apply { file } => {
            let app = read_app(&file)?;
            if let Err(errors) = validate_app(&app) {
                for e in &errors {
                    eprintln!("invalid: {}", e);
                }
                return Err(format!("{} has {} error(s)", file.display(), errors.len()).into());
            }
            let res = client
                .post(format!("{}/admin/apps", cli.url))
                .headers(headers)
                .json(&app)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn read_app(path: &Path) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let app = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        _ => toml::from_str(&content)?,
    };
    Ok(app)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
