//! # Email Enrich CLI
//!
//! Command-line interface for the Email Enrich library (`email_enrich_core`).
//! This binary parses arguments, sets up configuration, builds the pipeline,
//! processes contacts (either single or from a file), and handles output.

use email_enrich_core::{
    initialize_pipeline, process_contacts, status_counts, Config, ConfigBuilder, Contact,
    EnrichedContact, EnrichmentPipeline, ResolutionPath, VerificationStatus,
};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Verifies email addresses and resolves catch-all domains.",
    long_about = "Email Enrich verifies addresses in bulk and, when a domain accepts every address, asks a discovery provider which address actually belongs to the person."
)]
struct AppArgs {
    /// Path to the input JSON file containing contacts (required in file mode).
    #[arg(short, long, default_value = "input.json", env = "EMAIL_ENRICH_INPUT")]
    input: String,

    /// Path to the output JSON file where results will be saved.
    #[arg(
        short,
        long,
        default_value = "results.json",
        env = "EMAIL_ENRICH_OUTPUT"
    )]
    output: String,

    /// Full name of the person (enables single contact CLI mode). Requires --email.
    #[arg(long, env = "EMAIL_ENRICH_NAME", requires = "email")]
    name: Option<String>,

    /// Address to verify in single contact CLI mode.
    #[arg(long, env = "EMAIL_ENRICH_EMAIL", requires = "name")]
    email: Option<String>,

    /// Domain to search when escalating. Defaults to the domain part of --email.
    #[arg(long, env = "EMAIL_ENRICH_DOMAIN")]
    domain: Option<String>,

    /// Output results to standard output instead of a file (only in single contact CLI mode).
    #[arg(long, default_value = "false", env = "EMAIL_ENRICH_STDOUT")]
    stdout: bool,

    /// Path to a configuration file (TOML format) to load settings from. CLI args override file settings.
    #[arg(long, env = "EMAIL_ENRICH_CONFIG")]
    config_file: Option<String>,

    /// Maximum number of concurrent resolutions.
    #[arg(short, long, env = "EMAIL_ENRICH_CONCURRENCY")]
    concurrency: Option<usize>,

    /// API key for the verification provider.
    #[arg(long, env = "EMAIL_ENRICH_VERIFIER_API_KEY", hide_env_values = true)]
    verifier_api_key: Option<String>,

    /// Base URL of the verification provider.
    #[arg(long, env = "EMAIL_ENRICH_VERIFIER_BASE_URL")]
    verifier_base_url: Option<String>,

    /// API key for the discovery provider.
    #[arg(long, env = "EMAIL_ENRICH_DISCOVERY_API_KEY", hide_env_values = true)]
    discovery_api_key: Option<String>,

    /// Base URL of the discovery provider.
    #[arg(long, env = "EMAIL_ENRICH_DISCOVERY_BASE_URL")]
    discovery_base_url: Option<String>,

    /// Verification request timeout in seconds.
    #[arg(long, env = "EMAIL_ENRICH_VERIFIER_TIMEOUT")]
    verifier_timeout: Option<u64>,

    /// Discovery request timeout in seconds.
    #[arg(long, env = "EMAIL_ENRICH_DISCOVERY_TIMEOUT")]
    discovery_timeout: Option<u64>,

    /// Verification cache TTL in seconds.
    #[arg(long, env = "EMAIL_ENRICH_CACHE_TTL")]
    cache_ttl: Option<u64>,

    /// User agent string for provider requests.
    #[arg(long, env = "EMAIL_ENRICH_USER_AGENT")]
    user_agent: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!(
        "Email Enrich CLI v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", redacted(&args));

    let config = match build_config(&args) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Err(anyhow::anyhow!("Failed to build configuration: {}", e));
        }
    };
    tracing::debug!("Effective configuration loaded: {:?}", *config);

    let pipeline = match initialize_pipeline(&config) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            tracing::error!("Initialization error: {}", e);
            return Err(anyhow::anyhow!("Failed to initialize pipeline: {}", e));
        }
    };
    if config.discovery_api_key.is_none() {
        tracing::warn!("No discovery API key configured. Catch-all addresses will not be resolved.");
    }

    let is_cli_mode = args.name.is_some();
    let start_time = Instant::now();

    let execution_result = if is_cli_mode {
        process_cli_mode(&pipeline, &args).await
    } else {
        process_file_mode(config.clone(), pipeline, &args, start_time).await
    };

    if let Err(e) = execution_result {
        tracing::error!("Execution failed: {}", e);
        return Err(e);
    }

    if !is_cli_mode {
        tracing::info!(
            "Processing finished successfully. Total duration: {:.2?}",
            start_time.elapsed()
        );
    }

    Ok(())
}

fn build_config(args: &AppArgs) -> email_enrich_core::Result<Config> {
    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(c) = args.concurrency {
        config_builder = config_builder.max_concurrency(c);
    }
    if let Some(ref key) = args.verifier_api_key {
        config_builder = config_builder.verifier_api_key(key);
    }
    if let Some(ref url) = args.verifier_base_url {
        config_builder = config_builder.verifier_base_url(url);
    }
    if let Some(ref key) = args.discovery_api_key {
        config_builder = config_builder.discovery_api_key(key);
    }
    if let Some(ref url) = args.discovery_base_url {
        config_builder = config_builder.discovery_base_url(url);
    }
    if let Some(t) = args.verifier_timeout {
        config_builder = config_builder.verifier_timeout(Duration::from_secs(t));
    }
    if let Some(t) = args.discovery_timeout {
        config_builder = config_builder.discovery_timeout(Duration::from_secs(t));
    }
    if let Some(t) = args.cache_ttl {
        config_builder = config_builder.cache_ttl(Duration::from_secs(t));
    }
    if let Some(ref ua) = args.user_agent {
        config_builder = config_builder.user_agent(ua);
    }

    config_builder.build()
}

/// Copy of the arguments that is safe to log.
fn redacted(args: &AppArgs) -> String {
    let mask = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
    format!(
        "input={:?} output={:?} name={:?} email={:?} domain={:?} config_file={:?} concurrency={:?} verifier_api_key={:?} discovery_api_key={:?}",
        args.input,
        args.output,
        args.name,
        args.email,
        args.domain,
        args.config_file,
        args.concurrency,
        mask(&args.verifier_api_key),
        mask(&args.discovery_api_key),
    )
}

async fn process_cli_mode(pipeline: &Arc<EnrichmentPipeline>, args: &AppArgs) -> Result<()> {
    tracing::info!("Running in Single Contact CLI mode.");
    let start_time = Instant::now();
    let name = args.name.clone().unwrap_or_default();
    let email = args.email.clone().unwrap_or_default();

    let name_parts: Vec<&str> = name.split_whitespace().collect();
    let contact = Contact {
        first_name: name_parts.first().map(|s| s.to_string()),
        last_name: name_parts.last().map(|s| s.to_string()),
        full_name: Some(name.clone()),
        domain: args.domain.clone(),
        email: Some(email.clone()),
        other_fields: std::collections::HashMap::new(),
    };

    tracing::info!("Enriching Name='{}', Email='{}'", name, email);

    let mut results = process_contacts(Arc::clone(pipeline), vec![contact], 1)
        .await
        .context("Enrichment failed")?;
    let result = results
        .pop()
        .context("Pipeline returned no result for the contact")?;

    if args.stdout {
        print_cli_results(&result);
    } else {
        tracing::info!("Saving result to '{}'...", args.output);
        save_results(&[result], &args.output)?;
        tracing::info!("Result saved successfully to '{}'.", args.output);
    }
    tracing::info!("CLI mode finished. Duration: {:.2?}", start_time.elapsed());
    Ok(())
}

async fn process_file_mode(
    config: Arc<Config>,
    pipeline: Arc<EnrichmentPipeline>,
    args: &AppArgs,
    start_time: Instant,
) -> Result<()> {
    tracing::info!(
        "Running in File Processing mode. Input: '{}', Output: '{}'",
        args.input,
        args.output
    );
    let input_path = Path::new(&args.input);
    let output_path = Path::new(&args.output);

    if !input_path.is_file() {
        return Err(anyhow::anyhow!(
            "Input file not found or is not a file: {}",
            args.input
        ));
    }
    if let Some(parent_dir) = output_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            tracing::debug!("Creating output directory: {}", parent_dir.display());
            std::fs::create_dir_all(parent_dir).with_context(|| {
                format!(
                    "Failed to create output directory '{}'",
                    parent_dir.display()
                )
            })?;
        }
    }

    tracing::info!("Loading contacts from '{}'...", args.input);
    let contacts = load_contacts(&args.input)?;
    let total_records_loaded = contacts.len();
    if total_records_loaded == 0 {
        tracing::warn!(
            "Input file '{}' contains no contacts. Saving empty results file.",
            args.input
        );
        save_results(&[], &args.output)?;
        return Ok(());
    }
    tracing::info!("Loaded {} records from input file.", total_records_loaded);

    tracing::info!(
        "Starting enrichment for {} records (Concurrency: {})...",
        total_records_loaded,
        config.max_concurrency
    );
    let pb = ProgressBar::new(total_records_loaded as u64);
    pb.set_style(ProgressStyle::default_bar()
         .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | ETA: {eta} | {msg}")
         .context("Failed to set progress bar template")?
         .progress_chars("=> "));
    pb.set_message("Verifying and resolving contacts...");
    pb.enable_steady_tick(Duration::from_millis(120));

    let processed_results =
        match process_contacts(Arc::clone(&pipeline), contacts, config.max_concurrency).await {
            Ok(results) => results,
            Err(e) => {
                pb.abandon_with_message("Verification failed");
                return Err(anyhow::anyhow!("Bulk verification failed: {}", e));
            }
        };

    pb.set_position(processed_results.len() as u64);
    pb.finish_with_message(format!("Processed {} records", processed_results.len()));

    tracing::info!("Saving results to '{}'...", args.output);
    save_results(&processed_results, &args.output)?;
    tracing::info!("Results saved successfully.");

    log_summary(
        &processed_results,
        total_records_loaded,
        start_time.elapsed(),
        &pipeline,
    );

    Ok(())
}

fn load_contacts(file_path: &str) -> Result<Vec<Contact>> {
    tracing::debug!("Opening input file: {}", file_path);
    let file = File::open(file_path)
        .with_context(|| format!("Failed to open input file '{}'", file_path))?;
    let reader = BufReader::new(file);

    let records: Vec<Contact> = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse JSON from '{}'. Ensure it's an array of contact objects.",
            file_path
        )
    })?;

    Ok(records)
}

/// Saves the enriched results as pretty-printed JSON.
fn save_results(results: &[EnrichedContact], file_path: &str) -> Result<()> {
    let file = File::create(file_path)
        .with_context(|| format!("Failed to create/truncate output file '{}'", file_path))?;
    let writer = BufWriter::new(file);

    tracing::debug!(
        "Writing {} results as JSON to file: {}",
        results.len(),
        file_path
    );
    serde_json::to_writer_pretty(writer, results)
        .with_context(|| format!("Failed to serialize results to JSON for '{}'", file_path))?;

    Ok(())
}

fn log_summary(
    processed_results: &[EnrichedContact],
    original_total: usize,
    duration: Duration,
    pipeline: &EnrichmentPipeline,
) {
    let counts = status_counts(processed_results);
    let count = |status: VerificationStatus| counts.get(&status).copied().unwrap_or(0);
    let escalated = processed_results
        .iter()
        .filter(|r| r.resolution.as_ref().map(|res| res.path) == Some(ResolutionPath::Escalated))
        .count();
    let skipped = processed_results
        .iter()
        .filter(|r| r.enrichment_skipped)
        .count();
    let errors = processed_results
        .iter()
        .filter(|r| r.enrichment_error.is_some())
        .count();
    let cache = pipeline.verifier().cache().stats();

    tracing::info!("-------------------- Enrichment Summary --------------------");
    tracing::info!("Total Records in Input File : {}", original_total);
    tracing::info!("  - Valid                   : {}", count(VerificationStatus::Valid));
    tracing::info!("  - Invalid                 : {}", count(VerificationStatus::Invalid));
    tracing::info!("  - Catch-all (unresolved)  : {}", count(VerificationStatus::Catchall));
    tracing::info!("  - Unknown                 : {}", count(VerificationStatus::Unknown));
    tracing::info!("  - Escalated to Discovery  : {}", escalated);
    tracing::info!("  - Skipped (Invalid Input) : {}", skipped);
    tracing::info!("  - Errors During Processing: {}", errors);
    tracing::info!("Verification Cache          : {}/{} entries", cache.len, cache.cap);
    if pipeline.orchestrator().discovery_exhausted() {
        tracing::warn!("Discovery credits ran out during this run.");
    }
    tracing::info!("Total Time Taken            : {:.2?}", duration);
    if duration.as_secs_f64() > 0.01 && !processed_results.is_empty() {
        let rate = (processed_results.len() as f64) / duration.as_secs_f64();
        tracing::info!("Processing Rate             : {:.2} records/sec", rate);
    }
    tracing::info!("------------------------------------------------------------");
}

/// Prints the result for a single contact to standard output (CLI mode).
fn print_cli_results(result: &EnrichedContact) {
    const BLUE: &str = "\x1b[34m";
    const GREEN: &str = "\x1b[32m";
    const YELLOW: &str = "\x1b[33m";
    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";

    println!("\n{BLUE}===== Email Enrich Results ====={RESET}");
    println!(
        "Name:   {}",
        result.contact_input.full_name.as_deref().unwrap_or("N/A")
    );
    println!(
        "Input:  {}",
        result.contact_input.email.as_deref().unwrap_or("N/A")
    );

    if result.enrichment_skipped {
        println!("\n{YELLOW}Status: SKIPPED{RESET}");
        println!(
            "Reason: {}",
            result.enrichment_reason.as_deref().unwrap_or("Unknown")
        );
    } else if let Some(error) = &result.enrichment_error {
        println!("\n{RED}Status: ERROR{RESET}");
        println!("Error:  {}", error);
    } else if let Some(resolution) = &result.resolution {
        let colour = match resolution.status {
            VerificationStatus::Valid => GREEN,
            VerificationStatus::Invalid => RED,
            VerificationStatus::Catchall | VerificationStatus::Unknown => YELLOW,
        };
        println!("\n{colour}Status: {}{RESET}", resolution.status);
        println!("Email:     {colour}{}{RESET}", resolution.email);
        if let Some(certainty) = resolution.certainty {
            println!("Certainty: {}", certainty);
        }
        match resolution.path {
            ResolutionPath::Direct => println!("Source:    verifier"),
            ResolutionPath::Escalated => println!("Source:    discovery (catch-all domain)"),
        }
        if let Some(reason) = &result.enrichment_reason {
            println!("Note:      {}", reason);
        }
    }

    if let Some(record) = &result.verification {
        println!("\n{BLUE}Verifier Record:{RESET}");
        println!("- state:     {}", record.state);
        println!("- sub_state: {}", record.sub_state);
    }

    println!("{BLUE}================================{RESET}\n");
}
