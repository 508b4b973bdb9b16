//! safelink-scan: scan QR images and classify the URLs they carry.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use safelink_scanner::presenter::{LogPresenter, Presenter, Tee};
use safelink_scanner::scan::decode::RqrrDecoder;
use safelink_scanner::scan::validate::mime_from_extension;
use safelink_scanner::scan;
use safelink_scanner::{
    CandidateFile, Classifier, DecodeError, HttpClassifier, ScanSessionController, ScannerConfig, SessionEvent,
    SessionState,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "safelink-scan")]
#[command(about = "Decode QR codes from images and check the embedded URL with the SafeLink classifier")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Classification service base URL (overrides config and SAFELINK_API_BASE).
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, decode and classify an image, printing each session event.
    Scan {
        /// Path to the image (JPG, PNG, GIF, BMP, WEBP).
        image: PathBuf,
    },

    /// Print the URL decoded from an image.
    Decode {
        image: PathBuf,
    },

    /// Classify a URL directly.
    Url {
        url: String,
    },

    /// Probe the classification service.
    Status,
}

/// Prints every session event to stdout as one JSON line.
struct JsonLines;

impl Presenter for JsonLines {
    fn present(&self, event: &SessionEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "failed to serialize event"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> CliResult<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ScannerConfig::load(cli.config.as_deref())?;
    if let Some(base) = &cli.api_base {
        config.set_api_base(base);
    }

    match cli.command {
        Commands::Scan { image } => run_scan(&config, &image).await,
        Commands::Decode { image } => run_decode(&image).await,
        Commands::Url { url } => run_url(&config, &url).await,
        Commands::Status => run_status(&config).await,
    }
}

fn controller(config: &ScannerConfig) -> CliResult<ScanSessionController<Tee<LogPresenter, JsonLines>>> {
    let classifier = HttpClassifier::new(config)?;
    Ok(ScanSessionController::new(config, Box::new(classifier), Tee(LogPresenter, JsonLines)))
}

async fn read_candidate(path: &Path) -> CliResult<CandidateFile> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_from_extension(&name).unwrap_or("application/octet-stream");
    Ok(CandidateFile::new(name, mime_type, bytes))
}

fn exit_for(state: SessionState) -> ExitCode {
    if state == SessionState::Succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn run_scan(config: &ScannerConfig, image: &Path) -> CliResult<ExitCode> {
    let ctrl = controller(config)?;
    let candidate = read_candidate(image).await?;

    let (status, _) = tokio::join!(ctrl.check_service_status(), ctrl.preload_decoder());
    if !status.is_ready() {
        tracing::warn!("classification service not ready; the scan may fail at dispatch");
    }

    if ctrl.select_file(Some(candidate)).is_err() {
        return Ok(ExitCode::FAILURE);
    }
    ctrl.start_scan().await?;
    Ok(exit_for(ctrl.state()))
}

async fn run_decode(image: &Path) -> CliResult<ExitCode> {
    let bytes = tokio::fs::read(image).await?;
    match scan::extract_url(&bytes, &RqrrDecoder) {
        Ok(url) => {
            println!("{url}");
            Ok(ExitCode::SUCCESS)
        }
        Err(DecodeError::NoQrFound) => {
            println!("ERROR: No QR code found");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            println!("ERROR: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_url(config: &ScannerConfig, url: &str) -> CliResult<ExitCode> {
    let ctrl = controller(config)?;
    ctrl.submit_url(url).await?;
    Ok(exit_for(ctrl.state()))
}

async fn run_status(config: &ScannerConfig) -> CliResult<ExitCode> {
    let status = HttpClassifier::new(config)?.service_status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(if status.is_ready() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
