//! Kiosk service entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use kiosk::{build_app, contract, Repositories};
use kiosk_config::ConfigLoader;
use kiosk_server::Server;
use kiosk_telemetry::init_logging;

/// Command-line arguments.
struct Args {
    config: Option<PathBuf>,
    print_contract: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self {
            config: None,
            print_contract: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => parsed.config = args.next().map(PathBuf::from),
                "--print-contract" => parsed.print_contract = true,
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("kiosk {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        parsed
    }
}

fn print_help() {
    println!(
        r"Kiosk - contract-validated demo REST API

USAGE:
    kiosk [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Configuration file (TOML or JSON, default: kiosk.toml if present)
        --print-contract   Print the built-in contract as JSON and exit
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    KIOSK__AUTH__TOKEN_SECRET             Token signing secret (required, at least 32 bytes)
    KIOSK__SERVER__HTTP_ADDR              Listen address (default: 0.0.0.0:3000)
    KIOSK__SERVER__REQUEST_TIMEOUT_MS     Per-request timeout (default: 30000)
    KIOSK__LOGGING__LEVEL                 Log filter (default: info)
    KIOSK__LOGGING__FORMAT                json, pretty or compact (default: json)
    KIOSK__CONTRACT__PATH                 JSON contract to serve instead of the built-in one
    KIOSK__CONTRACT__DOCS_PREFIX          Documentation path (default: /docs)

A .env file in the working directory is loaded first.
"
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_contract {
        println!("{}", serde_json::to_string_pretty(&contract::api())?);
        return Ok(());
    }

    let loader = ConfigLoader::new().with_dotenv();
    let loader = match &args.config {
        Some(path) => loader.with_file(path)?,
        None => loader.with_optional_file("kiosk.toml")?,
    };
    let config = loader
        .with_env_prefix("KIOSK")
        .load()
        .context("invalid configuration")?;

    init_logging(&config.logging.to_log_config())?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        http_addr = %config.server.http_addr,
        "starting kiosk"
    );

    let app = build_app(&config, Repositories::seeded())?;

    Server::builder(app)
        .http_addr(config.server.http_addr.clone())
        .request_timeout(Duration::from_millis(config.server.request_timeout_ms))
        .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
        .max_body_bytes(config.server.max_body_bytes)
        .build()
        .run()
        .await?;

    Ok(())
}
