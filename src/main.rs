//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `cdn_radar` library that handles
//! command-line parsing, file loading, logger setup, and output writing.
//! All core functionality lives in the library crate.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use cdn_radar::geoip::GeoEnricher;
use cdn_radar::{
    classify_targets, init_logger_with, run_check, CompiledProviderDb, Config, LogFormat,
    LogLevel, ProviderDatabase, VantagePoint,
};

/// Output format for the result records.
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON array
    Json,
    /// Flattened CSV, one row per target
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "cdn_radar",
    about = "Fingerprints whether targets sit behind a CDN, WAF, or cloud provider"
)]
struct Cli {
    /// File with one target per line (domain, IP, or URL); "-" for stdin
    targets: PathBuf,

    /// Provider database JSON (cdn/waf/cloud pattern tables)
    #[arg(long)]
    provider_db: PathBuf,

    /// File with one resolver address per line
    #[arg(long)]
    resolvers: Option<PathBuf>,

    /// JSON file with vantage points: [{"city": ..., "ip": ...}, ...]
    #[arg(long)]
    vantage_points: Option<PathBuf>,

    /// MaxMind GeoLite2-City database for location labels
    #[arg(long)]
    geoip_city: Option<PathBuf>,

    /// MaxMind GeoLite2-ASN database for ASN lookups
    #[arg(long)]
    geoip_asn: Option<PathBuf>,

    /// Per-query timeout in seconds
    #[arg(long, default_value_t = 3)]
    timeout: u64,

    /// Maximum in-flight plain DNS queries
    #[arg(long, default_value_t = 50)]
    dns_concurrency: usize,

    /// Maximum in-flight EDNS probes
    #[arg(long, default_value_t = 100)]
    edns_concurrency: usize,

    /// Skip CNAME-chain and authoritative-server discovery before probing
    #[arg(long)]
    no_chain_discovery: bool,

    /// Use the system resolver for chain discovery
    #[arg(long)]
    use_system_ns: bool,

    /// Output file (stdout when omitted)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let raw_targets = read_lines(&cli.targets).context("Failed to read targets")?;
    let targets = classify_targets(&raw_targets);
    for line in &targets.invalid {
        log::warn!("Skipping invalid target: {line}");
    }

    let provider_db = ProviderDatabase::from_path(&cli.provider_db)
        .context("Failed to load provider database")?;
    let compiled = CompiledProviderDb::compile(&provider_db);

    let enricher = GeoEnricher::open(cli.geoip_city.as_deref(), cli.geoip_asn.as_deref())
        .context("Failed to open GeoIP databases")?;
    if !enricher.is_enabled() {
        log::info!("No GeoIP databases configured; ASN and keyword matching will be skipped");
    }

    let mut config = Config {
        timeout: Duration::from_secs(cli.timeout),
        dns_concurrency: cli.dns_concurrency,
        edns_concurrency: cli.edns_concurrency,
        use_chain_discovery: !cli.no_chain_discovery,
        use_system_ns: cli.use_system_ns,
        ..Config::default()
    };
    if let Some(path) = &cli.resolvers {
        config.resolvers = read_lines(path).context("Failed to read resolvers")?;
    }
    if let Some(path) = &cli.vantage_points {
        let contents = std::fs::read_to_string(path).context("Failed to read vantage points")?;
        config.vantage_points = serde_json::from_str::<Vec<VantagePoint>>(&contents)
            .context("Failed to parse vantage points")?;
    }

    match run_check(&config, targets, &compiled, &enricher, &enricher).await {
        Ok(report) => {
            let written = match cli.format {
                OutputFormat::Json => {
                    cdn_radar::export::write_json(&report.records, cli.output.as_deref())?
                }
                OutputFormat::Csv => {
                    cdn_radar::export::write_csv(&report.records, cli.output.as_deref())?
                }
            };
            eprintln!(
                "Checked {} target{} in {:.1}s ({} invalid line{} skipped)",
                written,
                if written == 1 { "" } else { "s" },
                report.elapsed_seconds,
                report.invalid.len(),
                if report.invalid.len() == 1 { "" } else { "s" },
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("cdn_radar error: {e:#}");
            process::exit(1);
        }
    }
}

/// Reads non-empty, non-comment lines from a file, or stdin for "-".
fn read_lines(path: &PathBuf) -> Result<Vec<String>> {
    let contents = if path.as_os_str() == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
