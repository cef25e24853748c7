use crate::config::{Config, Provider, APP_NAME, CONFIG_NAME};
use crate::portfolio::Portfolio;
use crate::quotes::eastmoney::EastmoneySnapshot;
use crate::quotes::manual::{self, ManualQuotes};
use crate::quotes::sina::SinaFeed;
use crate::quotes::yahoo::YahooSource;
use crate::quotes::{QuoteService, QuoteSource, Refresh};
use crate::store::HoldingsStore;

use clap::{arg, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use eyre::{eyre, WrapErr};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod advisory;
mod config;
mod error;
mod fee;
mod holding;
mod portfolio;
mod quotes;
mod store;
mod valuation;

fn with_shared_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(<FILE> "JSON file with your holdings")
            .required(false)
            .default_value(""),
    )
    .arg(
        Arg::new("quote")
            .long("quote")
            .short('q')
            .value_name("SYMBOL=PCT")
            .help("Manual percent change for a proxy, overrides fetched quotes")
            .action(ArgAction::Append),
    )
    .arg(
        Arg::new("provider")
            .long("provider")
            .value_name("NAME")
            .help("Quote provider: manual, sina, eastmoney or yahoo"),
    )
    .arg(
        Arg::new("without")
            .long("without")
            .value_name("FUND")
            .help("Leave a fund out of this session")
            .action(ArgAction::Append),
    )
    .arg(
        Arg::new("force")
            .long("force")
            .help("Bypass the quote cache")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("demo")
            .long("demo")
            .help("Use the built-in demo holdings")
            .action(ArgAction::SetTrue),
    )
}

fn cli() -> Command {
    Command::new("fundwatch_rs")
        .about("Estimate intraday fund NAV from proxy quotes and track redemption-fee windows")
        .arg_required_else_help(true)
        .subcommand(Command::new("config").about("Print the path to the config file"))
        .subcommand(with_shared_args(
            Command::new("estimate").about("Show estimated NAV, value and fee status per holding"),
        ))
        .subcommand(with_shared_args(
            Command::new("allocation").about("Show the off-exchange / on-exchange split"),
        ))
        .subcommand(with_shared_args(
            Command::new("advice").about("Show lock-in and volatility advisories"),
        ))
        .subcommand(with_shared_args(
            Command::new("watch")
                .about("Re-estimate the portfolio periodically")
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .value_name("SECS")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("60"),
                ),
        ))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the session store from `--demo`, the FILE argument or the
/// configured holdings file, then drops any `--without` funds.
fn load_store(matches: &ArgMatches, cfg: &Config) -> eyre::Result<Option<HoldingsStore>> {
    let mut store = if matches.get_flag("demo") {
        HoldingsStore::demo()
    } else {
        let mut filename = String::new();
        // try to get filename as argument
        if let Ok(Some(f)) = matches.try_get_one::<String>("FILE") {
            filename = f.to_string();
        }
        // if no argument is given, try to get filename from config
        if filename.is_empty() {
            filename.clone_from(&cfg.holdings_file);
        }
        if filename.is_empty() {
            return Ok(None);
        }
        HoldingsStore::from_records(holding::from_file(&filename)?)?
    };

    if let Some(names) = matches.get_many::<String>("without") {
        for name in names {
            if store.remove(name).is_none() {
                warn!("No holding named {name} to leave out");
            }
        }
    }
    if store.is_empty() {
        warn!("Holdings table is empty");
    }
    info!("Loaded {} holdings", store.len());
    Ok(Some(store))
}

fn manual_quotes(matches: &ArgMatches, cfg: &Config) -> eyre::Result<ManualQuotes> {
    let mut quotes = ManualQuotes::new(cfg.manual_quotes.clone());
    if let Some(entries) = matches.get_many::<String>("quote") {
        for entry in entries {
            let (symbol, pct) =
                manual::parse_entry(entry).ok_or_else(|| eyre!("Invalid --quote '{entry}', expected SYMBOL=PCT"))?;
            quotes.set(&symbol, pct);
        }
    }
    Ok(quotes)
}

fn build_source(provider: Provider, cfg: &Config, manual: &ManualQuotes) -> eyre::Result<Box<dyn QuoteSource>> {
    let timeout = cfg.request_timeout();
    let source: Box<dyn QuoteSource> = match provider {
        Provider::Manual => Box::new(manual.clone()),
        Provider::Sina => Box::new(SinaFeed::new(timeout)?),
        Provider::Eastmoney => Box::new(EastmoneySnapshot::new(timeout)?),
        Provider::Yahoo => Box::new(YahooSource::new()?),
    };
    Ok(source)
}

fn build_service(matches: &ArgMatches, cfg: &Config) -> eyre::Result<QuoteService> {
    let provider = match matches.get_one::<String>("provider") {
        Some(name) => name.parse::<Provider>().map_err(|e| eyre!(e))?,
        None => cfg.provider,
    };
    let overrides = manual_quotes(matches, cfg)?;
    let source = build_source(provider, cfg, &overrides)?;
    Ok(QuoteService::new(source, cfg.cache_ttl(), cfg.request_timeout(), overrides))
}

// returns a portfolio valued with the latest proxy quotes
async fn create_live_portfolio(
    store: &HoldingsStore,
    service: &QuoteService,
    cfg: &Config,
    force: bool,
) -> (Portfolio, Refresh) {
    let refresh = service.refresh(&store.proxy_symbols(), force).await;
    let portfolio = Portfolio::derive(store, &refresh.snapshot, &cfg.valuation_params());
    (portfolio, refresh)
}

fn print_warnings(refresh: &Refresh) {
    for warning in &refresh.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

/// Refreshes every `every` until `shutdown` resolves; returns the number
/// of refresh cycles that ran.
async fn watch<F>(
    store: &HoldingsStore,
    service: &QuoteService,
    cfg: &Config,
    every: Duration,
    force: bool,
    shutdown: F,
) -> eyre::Result<usize>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut interval = tokio::time::interval(every);
    let mut force_next = force;
    let mut cycles = 0;
    // one future for the whole loop so a signal during a refresh is kept
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.wrap_err("Failed to listen for Ctrl-C")?;
                info!("Stopping watch after {cycles} refreshes");
                return Ok(cycles);
            }
            _ = interval.tick() => {
                let (portfolio, refresh) = create_live_portfolio(store, service, cfg, force_next).await;
                force_next = false;
                cycles += 1;
                println!(
                    "{} via {} ({} cached)",
                    refresh.fetched_at.format("%Y-%m-%d %H:%M:%S").to_string().bold(),
                    service.source_name(),
                    refresh.cached
                );
                portfolio.print(true);
                portfolio.print_summary(&cfg.currency);
                print_warnings(&refresh);
            }
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();

    let cfg: Config = confy::load(APP_NAME, CONFIG_NAME).wrap_err("Failed to load config")?;
    cfg.validate().wrap_err("Invalid config")?;

    let matches = cli().get_matches();

    if let Some(_matches) = matches.subcommand_matches("config") {
        let path = confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?;
        println!("Your config file is located here: \n{}", path.display());
    }

    for subcommand in ["estimate", "allocation", "advice", "watch"].iter() {
        if let Some(matches) = matches.subcommand_matches(subcommand) {
            let Some(store) = load_store(matches, &cfg)? else {
                // no argument, no config and no demo: print help
                cli().print_help()?;
                return Ok(());
            };
            let service = build_service(matches, &cfg)?;
            let force = matches.get_flag("force");

            if *subcommand == "watch" {
                let secs = matches.get_one::<u64>("interval").copied().unwrap_or(60);
                let shutdown = tokio::signal::ctrl_c();
                watch(&store, &service, &cfg, Duration::from_secs(secs), force, shutdown).await?;
                return Ok(());
            }

            let (portfolio, refresh) = create_live_portfolio(&store, &service, &cfg, force).await;
            match *subcommand {
                "estimate" => {
                    portfolio.print(true);
                    portfolio.print_summary(&cfg.currency);
                }
                "allocation" => {
                    portfolio.draw_pie_chart();
                    portfolio.print_allocation();
                }
                "advice" => {
                    portfolio.print_advice(&cfg.thresholds());
                }
                _ => (),
            }
            print_warnings(&refresh);
        }
    }
    Ok(())
}
