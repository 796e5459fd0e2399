//! CLI that performs a DCF valuation of one or more securities.
//!
//! The year argument selects the most recent fiscal year end reports and is
//! also the date of the intrinsic price: valuing AAPL for 2018 produces the
//! price of AAPL as of Q4 2018. Each valued security becomes one worksheet of
//! `dcf-{year}.xlsx` in the output directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgGroup, Parser, error::ErrorKind};
use dcf::{
    CachedProvider, DEFAULT_DISCOUNT_RATE, DEFAULT_LONG_TERM_GROWTH_RATE, DEFAULT_MAX_SIZE_BYTES,
    DcfError, FinancialCache, FinancialDataProvider, INTRINIO_BASE_URL, IntrinioProvider,
    JimmyModel, JimmyReportWorksheet, NoopCache, SqliteCache, Symbol, ValuationModel,
    WorkbookReport,
};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for invalid command line arguments.
const INVALID_ARGUMENTS: i32 = -1;

/// Long options that are also accepted with a single leading dash.
const SINGLE_DASH_OPTIONS: [&str; 2] = ["ticker", "ticker-file"];

#[derive(Parser, Debug)]
#[command(name = "valuate-security")]
#[command(about = "Performs a DCF analysis of a stock and returns the intrinsic price", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("tickers").required(true).args(["ticker", "ticker_file"])))]
struct Cli {
    /// Year of the most recent year end financial statements
    year: i32,

    /// Ticker symbol
    #[arg(long)]
    ticker: Option<String>,

    /// File containing one ticker symbol per line
    #[arg(long)]
    ticker_file: Option<PathBuf>,

    /// Intrinio API key
    #[arg(long, env = "INTRINIO_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Intrinio API root
    #[arg(long, default_value = INTRINIO_BASE_URL)]
    base_url: String,

    /// Directory holding the financial data cache
    #[arg(long, default_value = "./financial-data/")]
    cache_dir: PathBuf,

    /// Maximum size of the financial data cache, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE_BYTES)]
    cache_size_bytes: u64,

    /// Disable the financial data cache
    #[arg(long)]
    no_cache: bool,

    /// Directory reports are written to
    #[arg(long, default_value = "./reports/")]
    output_dir: PathBuf,

    /// Jimmy DCF report template
    #[arg(long, default_value = "./templates/dcf_jimmy_template.xlsx")]
    template: PathBuf,

    /// Discount rate (cost of capital)
    #[arg(long, default_value_t = DEFAULT_DISCOUNT_RATE)]
    discount_rate: f64,

    /// Long term growth rate
    #[arg(long, default_value_t = DEFAULT_LONG_TERM_GROWTH_RATE)]
    growth_rate: f64,

    /// Log at debug level, including the full valuation results
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            eprintln!("Invalid Parameters. {e}");
            std::process::exit(INVALID_ARGUMENTS);
        }
    };

    init_tracing(cli.verbose);

    debug!(
        ticker = ?cli.ticker,
        ticker_file = ?cli.ticker_file,
        year = cli.year,
        "Parameters"
    );

    let tickers = match load_tickers(&cli) {
        Ok(tickers) => tickers,
        Err(e) => {
            eprintln!("Could not run script, because: {e}");
            std::process::exit(INVALID_ARGUMENTS);
        }
    };

    match run(&cli, &tickers).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Rewrites `-ticker` and `-ticker-file` (with or without `=value`) to their
/// double-dash form so clap does not read them as short flag clusters.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s) if is_single_dash_option(s) => OsString::from(format!("-{s}")),
            _ => arg,
        })
        .collect()
}

fn is_single_dash_option(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    SINGLE_DASH_OPTIONS.contains(&name)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Tickers from `--ticker` or `--ticker-file`.
fn load_tickers(cli: &Cli) -> dcf::Result<Vec<Symbol>> {
    match (&cli.ticker, &cli.ticker_file) {
        (Some(ticker), None) => Ok(vec![Symbol::new(ticker.as_str())]),
        (None, Some(path)) => read_ticker_file(path),
        _ => Err(DcfError::validation(
            "Must supply either 'ticker' or 'ticker-file' parameter",
        )),
    }
}

fn read_ticker_file(path: &Path) -> dcf::Result<Vec<Symbol>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        DcfError::validation(format!("Could not read ticker file {}", path.display()))
            .with_cause(e)
    })?;
    Ok(parse_tickers(&contents))
}

/// One ticker per line; blank lines are skipped.
fn parse_tickers(contents: &str) -> Vec<Symbol> {
    contents
        .lines()
        .map(Symbol::new)
        .filter(|symbol| !symbol.is_empty())
        .collect()
}

async fn run(cli: &Cli, tickers: &[Symbol]) -> dcf::Result<()> {
    let cache: Arc<dyn FinancialCache> = if cli.no_cache {
        Arc::new(NoopCache::new())
    } else {
        Arc::new(SqliteCache::open(&cli.cache_dir, cli.cache_size_bytes)?)
    };

    let intrinio = IntrinioProvider::new(cli.api_key.as_str()).with_base_url(cli.base_url.as_str());
    let provider = CachedProvider::new(intrinio, cache);

    let worksheet = JimmyReportWorksheet::new(&cli.template)?;
    let mut report = WorkbookReport::new(&cli.output_dir)?;
    let today = chrono::Local::now().date_naive();

    for symbol in tickers {
        match valuate(&provider, symbol, cli, today).await {
            Ok(model) => {
                report.add_worksheet(worksheet.clone(), symbol.as_str(), model.results().clone());
            }
            Err(e) => {
                warn!("Could not valuate {symbol}, {} because: {e}", cli.year);
            }
        }
    }

    if report.is_empty() {
        warn!("No securities were valued, skipping report");
        return Ok(());
    }

    report.generate_report(&format!("dcf-{}.xlsx", cli.year))?;
    for (ticker, price) in report.price_dict() {
        debug!(ticker, price, "Reported intrinsic price");
    }
    Ok(())
}

async fn valuate(
    provider: &dyn FinancialDataProvider,
    symbol: &Symbol,
    cli: &Cli,
    today: chrono::NaiveDate,
) -> dcf::Result<JimmyModel> {
    let latest_price = provider.latest_close_price(symbol, today).await?;

    let mut model = JimmyModel::new(symbol.clone(), cli.year)?
        .with_discount_rate(cli.discount_rate)
        .with_growth_rate(cli.growth_rate);
    let dcf_price = model.calculate_price(provider).await?;

    info!("Ticker: {symbol}, Intrinsic Price: {dcf_price:.6}, Current Price: {latest_price:.6}");

    if tracing::enabled!(Level::DEBUG) {
        match serde_json::to_string_pretty(model.results()) {
            Ok(json) => debug!("{json}"),
            Err(e) => warn!("Could not format valuation results: {e}"),
        }
    }

    Ok(model)
}
