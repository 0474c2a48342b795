use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use scan2redeem::application::pipeline::{Pipeline, PipelinePorts};
use scan2redeem::application::redemption::ResultView;
use scan2redeem::config::{ConfigArgs, PipelineConfig};
use scan2redeem::domain::payout::{PayoutStatus, PayoutView};
use scan2redeem::domain::token::canonicalize;
use scan2redeem::error::ServiceError;
use scan2redeem::infrastructure::camera::{ScriptedCamera, ScriptedFrame, TextRasterDetector};
use scan2redeem::infrastructure::clock::DisplayClock;
use scan2redeem::infrastructure::in_memory::{
    FetchStep, InMemoryPayoutService, InMemoryRedemptionService, LogNotifier, RecordingNavigator,
};
use scan2redeem::interfaces::csv::catalog_reader::CatalogReader;
use scan2redeem::interfaces::output::JsonLinesWriter;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the canonical redemption token of each payload
    Canonicalize {
        #[arg(required = true)]
        payloads: Vec<String>,
    },
    /// Replay a scripted camera feed and redeem the first recognised code
    Redeem {
        /// Reward catalog CSV (token, amount, brand_name, campaign_name, payout_target, expires_at)
        #[arg(long)]
        catalog: PathBuf,

        /// One decoded payload per line; `-` for a frame without a code, `~` for no new frame
        #[arg(long)]
        frames: PathBuf,

        /// Give up when no code has been recognised after this many milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Request a payout and follow its status until it settles
    Payout {
        /// Scripted status answers, e.g. `pending,processing,completed`; `error` fails a fetch
        #[arg(long, value_delimiter = ',', value_parser = parse_fetch_step, required = true)]
        statuses: Vec<FetchStep>,

        #[arg(long, default_value = "100.00")]
        amount: Decimal,

        #[arg(long, default_value = "upi")]
        method: String,
    },
}

fn parse_fetch_step(value: &str) -> std::result::Result<FetchStep, String> {
    match value.trim() {
        "error" => Ok(FetchStep::Fail(ServiceError::Unavailable(
            "scripted fetch failure".to_string(),
        ))),
        status => status.parse::<PayoutStatus>().map(FetchStep::Status),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::try_from(cli.config).into_diagnostic()?;
    let mut output = JsonLinesWriter::new(io::stdout());

    match cli.command {
        Command::Canonicalize { payloads } => {
            for payload in payloads {
                match canonicalize(&payload) {
                    Some(token) => println!("{token}"),
                    None => println!("unrecognized"),
                }
            }
        }
        Command::Redeem {
            catalog,
            frames,
            timeout_ms,
        } => {
            let redemption = InMemoryRedemptionService::new();
            let file = File::open(catalog).into_diagnostic()?;
            for entry in CatalogReader::new(file).entries() {
                match entry {
                    Ok(entry) => redemption.insert(entry).await,
                    Err(e) => warn!(error = %e, "Error reading catalog entry"),
                }
            }

            let script = fs::read_to_string(frames).into_diagnostic()?;
            let camera = ScriptedCamera::new(script.lines().map(ScriptedFrame::from_line));
            let navigator = Arc::new(RecordingNavigator::new());
            let mut pipeline = Pipeline::new(
                &config,
                PipelinePorts {
                    camera: Arc::new(camera),
                    detector: Arc::new(TextRasterDetector),
                    clock: Arc::new(DisplayClock::from_frame_rate(config.frame_rate)),
                    redemption: Arc::new(redemption),
                    payouts: Arc::new(InMemoryPayoutService::new()),
                    notifier: Arc::new(LogNotifier),
                    navigator: navigator.clone(),
                },
            );

            let attempt = tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                pipeline.redemption.scan_and_redeem(),
            )
            .await
            .map_err(|_| miette!("No QR code recognised within {timeout_ms} ms"))?;
            attempt.into_diagnostic()?;

            output
                .write(&ResultView::from_navigation(navigator.take_result_state()))
                .into_diagnostic()?;
        }
        Command::Payout {
            statuses,
            amount,
            method,
        } => {
            let settles = matches!(
                statuses.last(),
                Some(FetchStep::Status(status)) if status.is_terminal()
            );
            if !settles && config.max_consecutive_poll_errors.is_none() {
                return Err(miette!(
                    "status script must end with completed or failed, or set --max-poll-errors"
                ));
            }

            let payouts = InMemoryPayoutService::new();
            payouts.set_settlement(statuses).await;
            let pipeline = Pipeline::new(
                &config,
                PipelinePorts {
                    camera: Arc::new(ScriptedCamera::default()),
                    detector: Arc::new(TextRasterDetector),
                    clock: Arc::new(DisplayClock::from_frame_rate(config.frame_rate)),
                    redemption: Arc::new(InMemoryRedemptionService::new()),
                    payouts: Arc::new(payouts),
                    notifier: Arc::new(LogNotifier),
                    navigator: Arc::new(RecordingNavigator::new()),
                },
            );

            let (record, mut session) = pipeline
                .payouts
                .request(amount, &method)
                .await
                .into_diagnostic()?;
            info!(payout_id = %record.id, "tracking payout");
            while let Some(record) = session.next().await {
                output.write(&PayoutView::from(&record)).into_diagnostic()?;
            }
            if let Some(err) = session.failure() {
                return Err(miette!("{err}"));
            }
        }
    }

    Ok(())
}
