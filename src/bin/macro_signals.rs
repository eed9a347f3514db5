//! Macro signals command-line entry point.
//!
//! - Monthly inflation batch run and historical backfill
//! - Daily key-events snapshot
//! - Read-only risk state and health probes
//! - Side-by-side narrative comparison for two narrative configs

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use macro_signals::{
    check_health, compare_narratives, init_logging, AppConfig, BackfillJob, BlsClient,
    CompareRequest, Credentials, FredClient, InflationJob, JsonlSignalStore, KeyEventsJob,
    LogFormat, NarrativeOrchestrator, RiskStateAggregator,
};
use macro_signals::narrative::OpenAiClient;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser)]
#[command(name = "macro_signals")]
#[command(version)]
#[command(about = "Deterministic macro signals with narrative snapshots", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "macro_signals.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<String>,

    /// Log file path (JSON lines)
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and store the latest monthly inflation signal (default)
    Run,
    /// Backfill monthly inflation signals from BLS history
    Backfill,
    /// Generate and store today's key-events snapshot
    KeyEvents,
    /// Print the composite risk state
    RiskState,
    /// Probe the signal store and the series provider
    Health,
    /// Generate narratives for two configs side by side
    Compare {
        /// Request body file (JSON); reads `--json` when absent
        #[arg(short, long)]
        input: Option<String>,
        /// Inline request body
        #[arg(long)]
        json: Option<String>,
    },
    /// Generate a sample config file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "macro_signals.toml")]
        output: String,
    },
    /// Validate config without running
    ValidateConfig,
}

// ============================================================================
// Setup
// ============================================================================

fn load_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.parse::<LogFormat>()?;
    }
    if let Some(file) = &cli.log_file {
        config.logging.log_file = Some(file.clone());
    }
    config.validate()?;
    Ok(config)
}

fn generate_sample_config(output: &str) -> Result<(), Box<dyn std::error::Error>> {
    if Path::new(output).exists() {
        return Err(format!("{output} already exists, refusing to overwrite").into());
    }
    std::fs::write(output, AppConfig::default().to_toml()?)?;
    println!("Sample config written to {output}");
    Ok(())
}

/// Process-wide clients, built once.
struct Services {
    fred: FredClient,
    bls: BlsClient,
    openai: OpenAiClient,
    store: JsonlSignalStore,
}

impl Services {
    async fn build(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let credentials = Credentials::from_env()?;
        let p = &config.providers;
        Ok(Self {
            fred: FredClient::new(
                &p.fred_base_url,
                credentials.fred_api_key.clone(),
                p.timeout(),
                p.max_retries,
            )?,
            bls: BlsClient::new(
                &p.bls_base_url,
                credentials.bls_api_key.clone(),
                config.backfill.start_year,
                p.timeout(),
                p.max_retries,
            )?,
            openai: OpenAiClient::new(
                &p.openai_base_url,
                credentials.openai_api_key.clone(),
                config.narrative.model.clone(),
                p.timeout(),
                p.max_retries,
            )?,
            store: JsonlSignalStore::open(&config.store.path).await?,
        })
    }

    fn narrator(&self, config: &AppConfig) -> NarrativeOrchestrator {
        NarrativeOrchestrator::new(Arc::new(self.openai.clone()), config.narrative.settings())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_compare_request(
    input: Option<&str>,
    json: Option<&str>,
) -> Result<CompareRequest, Box<dyn std::error::Error>> {
    let body = match (input, json) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(inline)) => inline.to_string(),
        (None, None) => return Err("compare needs --input or --json".into()),
    };
    Ok(serde_json::from_str(&body)?)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (before parsing CLI args)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::GenerateConfig { output }) => {
            return generate_sample_config(output);
        }
        Some(Commands::ValidateConfig) => {
            let config = load_config(&cli)?;
            println!("Configuration is valid:\n{:#?}", config);
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&cli)?;
    let _guards = init_logging(&config.logging, None)?;

    let services = match Services::build(&config).await {
        Ok(services) => services,
        Err(e) => {
            error!(error = %e, "Startup failed");
            return Err(e);
        }
    };
    let narrative = config.narrative.narrative_config();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let narrator = services.narrator(&config);
            let outcome = InflationJob::new(
                &services.fred,
                &services.store,
                &narrator,
                config.signal.clone(),
                narrative,
            )
            .run()
            .await?;
            print_json(&outcome)?;
        }
        Commands::Backfill => {
            let narrator = services.narrator(&config);
            info!(start_year = config.backfill.start_year, "Starting backfill");
            let report = BackfillJob::new(
                &services.bls,
                &services.fred,
                &services.store,
                &narrator,
                config.signal.clone(),
                narrative,
                config.backfill.clone(),
            )
            .run()
            .await?;
            print_json(&report)?;
        }
        Commands::KeyEvents => {
            let outcome = KeyEventsJob::new(&services.openai, &services.store)
                .run()
                .await?;
            print_json(&outcome)?;
        }
        Commands::RiskState => {
            let state = RiskStateAggregator::new(&services.store, config.signal.clone())
                .with_live_fallback(&services.fred)
                .risk_state()
                .await;
            print_json(&state)?;
        }
        Commands::Health => {
            let report = check_health(&services.store, &services.fred).await;
            print_json(&report)?;
        }
        Commands::Compare { input, json } => {
            let request = read_compare_request(input.as_deref(), json.as_deref())?;
            let response = compare_narratives(&services.narrator(&config), &request).await;
            print_json(&response)?;
        }
        Commands::GenerateConfig { .. } | Commands::ValidateConfig => {}
    }

    Ok(())
}
