//! querypilot-server: HTTP front end for the natural-language → SQL agent.
//!
//! One endpoint takes a natural-language request (with the database URL
//! embedded in the text), runs the discovery → synthesis → execution
//! pipeline, and streams each step back as newline-delimited JSON.

mod routes;

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use querypilot_agent::Pipeline;
use querypilot_ai::{OpenAiClient, OpenAiConfig};

#[derive(Parser)]
#[command(name = "querypilot-server", about = "NL-to-SQL agent over PostgreSQL")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Workspace root — two levels up from crates/querypilot-server/
        manifest_dir.join("..").join("..").join(".env"),
        std::path::PathBuf::from(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

#[tokio::main]
async fn main() {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "querypilot=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match OpenAiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "model configuration missing");
            std::process::exit(1);
        }
    };
    tracing::info!(model = %config.model, base_url = %config.base_url, "model configured");

    let client = Arc::new(OpenAiClient::new(config));
    let pipeline = Arc::new(Pipeline::with_postgres_tools(client));
    let app = routes::router(pipeline);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind TCP listener");

    tracing::info!("querypilot-server listening on {}", addr);

    axum::serve(listener, app).await.expect("server error");
}
