//! teda-check - verification checks for the teda ingestion workflow
//!
//! Uploads the CSV exports to object storage and probes the catalog and
//! product endpoints.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use teda_check::config::Config;
use teda_check::metrics;
use teda_check::probe::{
    Endpoint, ExpectedBody, ExpectedResponse, FailureMode, HttpTransport, Prober,
};
use teda_check::s3::{CredentialsProvider, S3ObjectStore, S3StoreConfig};
use teda_check::suite::{builtin_suite, Runner, Tag};
use teda_check::upload::Uploader;
use tracing::{info, warn};

/// teda-check - upload and endpoint checks for teda ingestion
#[derive(Parser, Debug)]
#[command(name = "teda-check")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "check.ini")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log format (pretty, json); overrides the config file
    #[arg(long)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the built-in suite
    Run {
        /// Only run cases carrying one of these tags
        #[arg(short, long = "tag")]
        tags: Vec<Tag>,

        /// Print metrics in Prometheus text format after the report
        #[arg(long)]
        metrics: bool,
    },

    /// List the scheduled cases
    Cases {
        #[arg(short, long = "tag")]
        tags: Vec<Tag>,
    },

    /// Upload files from the working directory and verify they are listed
    Upload {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// GET an endpoint once and check the outcome
    Probe {
        /// `catalog`, `product` or a full URL
        target: String,

        #[arg(long)]
        expect_status: Option<u16>,

        #[arg(long, conflicts_with = "expect_text")]
        expect_json: Option<serde_json::Value>,

        #[arg(long)]
        expect_text: Option<String>,

        /// none, timeout, read_timeout or read_error
        #[arg(long, default_value = "none")]
        expect_failure: FailureMode,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {:?}", args.config))?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    let format = args.log_format.as_deref().unwrap_or(&config.logging.format);
    teda_check::logging::init_logging(level, format)?;

    info!("Starting teda-check v{}", teda_check::VERSION);
    info!("Loaded configuration from {:?}", args.config);

    match args.command {
        Command::Run { tags, metrics } => run(&config, &tags, metrics).await,
        Command::Cases { tags } => cases(&config, &tags),
        Command::Upload { files } => upload(&config, &files).await,
        Command::Probe {
            target,
            expect_status,
            expect_json,
            expect_text,
            expect_failure,
        } => {
            let body = match (expect_json, expect_text) {
                (Some(json), _) => Some(ExpectedBody::Json(json)),
                (None, Some(text)) => Some(ExpectedBody::Text(text)),
                (None, None) => None,
            };
            let expected = ExpectedResponse {
                status: expect_status,
                body,
                failure: expect_failure,
            };
            probe(&config, &target, &expected).await
        }
    }
}

async fn connect_uploader(config: &Config) -> anyhow::Result<Uploader<S3ObjectStore>> {
    let credentials = CredentialsProvider::resolve(&config.credentials)?;
    let store = S3ObjectStore::connect(&S3StoreConfig::from(&config.storage), credentials).await;
    Ok(Uploader::new(
        store,
        &config.storage.bucket,
        config.storage.working_dir(),
    ))
}

async fn run(config: &Config, tags: &[Tag], with_metrics: bool) -> anyhow::Result<ExitCode> {
    let suite = builtin_suite(&config.endpoints)?;

    let runner = match connect_uploader(config).await {
        Ok(uploader) => Runner::new(uploader),
        Err(e) => {
            let reason = format!("{:#}", e);
            warn!(error = %reason, "Object storage unavailable, upload cases will fail");
            Runner::without_storage(reason)
        }
    };

    let report = runner.run(&suite, tags).await?;
    println!("{}", report);

    if with_metrics {
        println!();
        print!("{}", metrics::render()?);
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cases(config: &Config, tags: &[Tag]) -> anyhow::Result<ExitCode> {
    let suite = builtin_suite(&config.endpoints)?;
    for case in suite.schedule(tags)? {
        let tags: Vec<&str> = case.tags.iter().map(Tag::as_str).collect();
        println!("{} [{}]", case.name, tags.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

async fn upload(config: &Config, files: &[String]) -> anyhow::Result<ExitCode> {
    let uploader = connect_uploader(config)
        .await
        .context("object storage is not configured")?;

    let mut failed = false;
    for file in files {
        match uploader.upload_and_verify(file).await {
            Ok(listing) => println!(
                "OK       {} ({} object(s) under s3://{}/{})",
                file,
                listing.key_count,
                uploader.bucket(),
                listing.prefix
            ),
            Err(e) => {
                failed = true;
                println!("FAILED   {}: {:#}", file, anyhow::Error::new(e));
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn resolve_target<'a>(config: &'a Config, target: &'a str) -> anyhow::Result<&'a str> {
    if let Ok(endpoint) = target.parse::<Endpoint>() {
        return Ok(endpoint.url(&config.endpoints));
    }
    if target.starts_with("http://") || target.starts_with("https://") {
        return Ok(target);
    }
    bail!(
        "unknown probe target '{}': expected catalog, product or an http(s) URL",
        target
    )
}

async fn probe(
    config: &Config,
    target: &str,
    expected: &ExpectedResponse,
) -> anyhow::Result<ExitCode> {
    let url = resolve_target(config, target)?;
    let prober = Prober::new(HttpTransport::from_config(&config.endpoints)?);

    let outcome = prober.probe(url).await;
    match &outcome {
        Ok(response) => {
            println!("{} {}", response.status(), url);
            println!("{}", String::from_utf8_lossy(response.body()));
        }
        Err(e) => println!("{} {}: {}", e.kind(), url, e),
    }

    match expected.verify(&outcome) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(mismatch) => {
            eprintln!("Expectation not met: {}", mismatch);
            Ok(ExitCode::FAILURE)
        }
    }
}
