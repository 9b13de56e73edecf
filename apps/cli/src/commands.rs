//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use phonescout_batch::{ProgressReporter, run_batch};
use phonescout_ingest::{ColumnSelection, read_phone_file};
use phonescout_lookup::{PhoneLookup, WebDriverLookup, is_webdriver_ready};
use phonescout_shared::{
    AppConfig, BatchOptions, BatchRun, BatchStatus, LookupConfig, PhoneLookupResult, init_config,
    load_config,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Phonescout — carrier and line-type lookups for phone numbers.
#[derive(Parser)]
#[command(
    name = "phonescout",
    version,
    about = "Look up carrier, line type, and SMS gateway details for phone numbers.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Look up a single phone number.
    Lookup {
        /// Phone number to look up, any formatting.
        phone: String,

        /// Print the result as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Process a CSV of phone numbers and write a report.
    Batch {
        /// CSV file with one phone number per row.
        file: PathBuf,

        /// Column holding the numbers (auto-detected when omitted).
        #[arg(short, long)]
        column: Option<String>,

        /// Directory for the report (defaults to the configured output dir).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "phonescout=info",
        1 => "phonescout=debug",
        _ => "phonescout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Lookup { phone, json } => cmd_lookup(&phone, json).await,
        Command::Batch { file, column, out } => cmd_batch(&file, column.as_deref(), out).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_lookup(phone: &str, json: bool) -> Result<()> {
    let config = load_config()?;
    let lookup_config = LookupConfig::from(&config);

    if !is_webdriver_ready(&lookup_config.webdriver_url).await {
        info!(
            url = %lookup_config.webdriver_url,
            "WebDriver endpoint not answering yet, session setup will retry"
        );
    }

    let engine = WebDriverLookup::from_config(lookup_config);
    let cancel = cancel_on_ctrl_c();

    let spinner = lookup_spinner(format!("Looking up {phone}"));
    let result = engine.lookup(phone, &cancel).await;
    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("  Phone:    {}", result.phone);
    if result.is_ok() {
        println!("  Date:     {}", result.report_date);
        println!("  Type:     {}", result.line_type);
        println!("  Company:  {}", result.company);
        println!("  Location: {}", result.location);
        println!("  Mobile:   {}", if result.is_mobile { "yes" } else { "no" });
        if !result.sms_gateway.is_empty() {
            println!("  Gateway:  {}", result.sms_gateway);
        }
    } else {
        println!("  Error:    {}", result.error);
    }
    println!();

    Ok(())
}

async fn cmd_batch(file: &Path, column: Option<&str>, out: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let lookup_config = LookupConfig::from(&config);

    let mut options = BatchOptions::from(&config);
    if let Some(dir) = out {
        options.output_dir = dir;
    }

    let input = read_phone_file(file, column)?;
    if input.selection == ColumnSelection::FirstColumnFallback {
        println!(
            "No phone column recognized; using the first column '{}'.",
            input.source_column
        );
    }

    if !is_webdriver_ready(&lookup_config.webdriver_url).await {
        info!(
            url = %lookup_config.webdriver_url,
            "WebDriver endpoint not answering yet, session setup will retry"
        );
    }

    let total = input.phones.len();
    info!(
        file = %file.display(),
        column = %input.source_column,
        total,
        "starting batch"
    );

    let lookup: Arc<dyn PhoneLookup> = Arc::new(WebDriverLookup::from_config(lookup_config));
    let cancel = cancel_on_ctrl_c();
    let progress = CliProgress::new(total as u64);

    let run = run_batch(lookup, input.phones, &options, &progress, &cancel).await;

    let failed = run.results.iter().filter(|r| !r.is_ok()).count();

    println!();
    match run.status {
        BatchStatus::Completed => println!("  Batch completed!"),
        _ => println!("  Batch stopped early."),
    }
    println!("  Batch:     {}", run.id);
    println!("  Column:    {}", input.source_column);
    println!("  Processed: {}/{}", run.completed_count, run.total);
    println!("  Failed:    {failed}");
    if let Some(path) = &run.report_path {
        println!("  Report:    {}", path.display());
    }
    if let Some(finished) = run.finished_at {
        let elapsed = (finished - run.started_at).num_milliseconds() as f64 / 1000.0;
        println!("  Time:      {elapsed:.1}s");
    }
    println!();

    if run.status == BatchStatus::Failed {
        let cause = run.error.unwrap_or_else(|| "batch failed".to_string());
        return Err(eyre!("{cause}"));
    }

    Ok(())
}

/// Cancellation token tripped by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing the current item");
            token.cancel();
        }
    });
    cancel
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn lookup_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message);
    spinner
}

/// CLI progress reporter drawing an indicatif bar over the batch.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn batch_started(&self, _run: &BatchRun) {}

    fn item_completed(&self, result: &PhoneLookupResult, _completed: usize, _total: usize) {
        let outcome = if result.is_ok() {
            result.line_type.clone()
        } else {
            result.error.clone()
        };
        self.bar.set_message(format!("{} {outcome}", result.phone));
        self.bar.inc(1);
    }

    fn batch_finished(&self, _run: &BatchRun) {
        self.bar.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
