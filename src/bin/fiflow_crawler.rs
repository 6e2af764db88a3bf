use fiflow_crawler::config::Config;
use fiflow_crawler::models::trigger::{TriggerEvent, TriggerResponse};
use fiflow_crawler::scrapers::{HttpFetcher, NaverScraper};
use fiflow_crawler::services::{BatchRunner, PersistenceAdapter, SymbolCollector};
use fiflow_crawler::store::{ArrowStore, MemoryStore, RecordStore};
use fiflow_crawler::util::{self, arrow_utils};

use anyhow::Context;
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{info, warn};
use std::io::Read;
use std::sync::Arc;

fn split_list(value: Option<&str>) -> Option<Vec<String>> {
    value.map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

fn open_store(config: &Config, dry_run: bool) -> anyhow::Result<Arc<dyn RecordStore + Send + Sync>> {
    if dry_run {
        info!("Dry run: records are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    }
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("cannot create data dir {}", config.data_dir))?;
    Ok(Arc::new(ArrowStore::open(&config.data_dir)?))
}

fn build_scraper(config: &Config) -> anyhow::Result<Arc<NaverScraper>> {
    let fetcher = Arc::new(HttpFetcher::new(config)?);
    Ok(Arc::new(NaverScraper::new(fetcher, config)))
}

fn build_runner(config: &Config, matches: &ArgMatches) -> anyhow::Result<BatchRunner> {
    let store = open_store(config, matches.is_present("dry-run"))?;
    let collector = SymbolCollector::new(build_scraper(config)?);
    let mut runner = BatchRunner::new(collector, PersistenceAdapter::new(store), config);
    if let Some(date) = matches.value_of("date") {
        runner = runner.with_date(util::parse_iso_date(date)?);
    }
    Ok(runner)
}

fn print_response(response: &TriggerResponse) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

fn read_event(path: Option<&str>) -> anyhow::Result<String> {
    let mut raw = String::new();
    match path {
        Some(path) => {
            raw = std::fs::read_to_string(path).with_context(|| format!("cannot read event file {}", path))?;
        }
        None => {
            std::io::stdin().read_to_string(&mut raw)?;
        }
    }
    Ok(raw)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let app = App::new("fiflow_crawler")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Korean stock quote / index crawler")
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory of market.arrow / index.arrow (overrides FIFLOW_DATA_DIR)")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("dry-run")
                .long("dry-run")
                .help("Keep records in memory instead of writing the store")
                .takes_value(false)
                .global(true),
        )
        .arg(
            Arg::with_name("date")
                .short('d')
                .long("date")
                .value_name("DATE")
                .help("Date to stamp records with (YYYY-MM-DD, default: today in Seoul)")
                .takes_value(true)
                .global(true),
        );

    let app = app
        .subcommand(
            SubCommand::with_name("crawl")
                .about("Collect quotes for symbols and upsert them")
                .arg(
                    Arg::with_name("symbols")
                        .short('s')
                        .long("symbols")
                        .value_name("SYMBOLS")
                        .help("Comma separated symbols (default: every symbol in the store)")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("market-hours-only")
                        .long("market-hours-only")
                        .help("Skip the run outside of 09:00-16:00 KST on weekdays")
                        .takes_value(false),
                ),
        )
        .subcommand(
            SubCommand::with_name("index")
                .about("Collect market index snapshots")
                .arg(
                    Arg::with_name("indices")
                        .short('i')
                        .long("indices")
                        .value_name("INDICES")
                        .help("Comma separated index codes (default: KOSPI,KOSDAQ,KPI200)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("handle")
                .about("Run a trigger event: {\"symbols\"?: [..], \"indices\"?: [..]}")
                .arg(
                    Arg::with_name("event")
                        .short('e')
                        .long("event")
                        .value_name("FILE")
                        .help("Event JSON file (default: stdin)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("realtime")
                .about("Print the realtime quote of one symbol")
                .arg(
                    Arg::with_name("symbol")
                        .short('s')
                        .long("symbol")
                        .value_name("SYMBOL")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("explore")
                .about("Dump stored market records as NDJSON")
                .arg(
                    Arg::with_name("symbol")
                        .short('s')
                        .long("symbol")
                        .value_name("SYMBOL")
                        .help("Only symbols containing this text")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("limit")
                        .short('l')
                        .long("limit")
                        .value_name("LIMIT")
                        .help("Limit the number of records to display")
                        .takes_value(true)
                        .default_value("10"),
                ),
        );

    let matches = app.get_matches();

    let mut config = Config::from_env()?;
    let data_dir = matches
        .subcommand()
        .and_then(|(_, sub)| sub.value_of("data-dir"))
        .or_else(|| matches.value_of("data-dir"));
    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }

    if let Some(matches) = matches.subcommand_matches("crawl") {
        if matches.is_present("market-hours-only") && !util::is_market_open(&util::seoul_now()) {
            info!("Market is closed, nothing to do");
            return Ok(());
        }
        let runner = build_runner(&config, matches)?;
        let symbols = split_list(matches.value_of("symbols"));
        let response = match runner.run_markets(symbols).await {
            Ok(statuses) => TriggerResponse::ok(statuses),
            Err(e) => TriggerResponse::error(e.to_string()),
        };
        print_response(&response)?;
    } else if let Some(matches) = matches.subcommand_matches("index") {
        let runner = build_runner(&config, matches)?;
        let statuses = runner.run_indices(split_list(matches.value_of("indices"))).await;
        print_response(&TriggerResponse::ok(statuses))?;
    } else if let Some(matches) = matches.subcommand_matches("handle") {
        let raw = read_event(matches.value_of("event"))?;
        let response = match serde_json::from_str::<TriggerEvent>(if raw.trim().is_empty() { "{}" } else { raw.as_str() }) {
            Ok(event) => build_runner(&config, matches)?.handle(event).await,
            Err(e) => {
                warn!("Invalid trigger event: {}", e);
                TriggerResponse::error(format!("invalid event: {}", e))
            }
        };
        print_response(&response)?;
    } else if let Some(matches) = matches.subcommand_matches("realtime") {
        let symbol = matches.value_of("symbol").context("--symbol is required")?;
        let quote = build_scraper(&config)?.fetch_realtime_quote(symbol).await?;
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else if let Some(matches) = matches.subcommand_matches("explore") {
        let symbol_filter = matches.value_of("symbol");
        let limit = parse_limit(matches.value_of("limit"))?;

        let store = ArrowStore::open(&config.data_dir)?;
        let rows = store.market_rows().await;
        info!("Found {} market records in {}", rows.len(), store.market_path().display());

        let filtered: Vec<_> = rows
            .into_iter()
            .filter(|row| symbol_filter.map_or(true, |s| row.symbol.contains(s)))
            .take(limit)
            .collect();
        info!("Showing {} records", filtered.len());

        let batch = arrow_utils::market_rows_to_record_batch(&filtered)?;
        arrow_utils::write_ndjson(&batch, std::io::stdout().lock())?;
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}

/// `--limit` 缺省为 10，无法解析时报错
fn parse_limit(raw: Option<&str>) -> anyhow::Result<usize> {
    match raw {
        None => Ok(10),
        Some(value) => value
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid --limit {:?}", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_parses() {
        assert_eq!(parse_limit(None).unwrap(), 10);
        assert_eq!(parse_limit(Some("3")).unwrap(), 3);
    }

    #[test]
    fn bad_limit_is_an_error() {
        let err = parse_limit(Some("abc")).unwrap_err();
        assert!(err.to_string().contains("invalid --limit \"abc\""));
        assert!(parse_limit(Some("-1")).is_err());
    }
}
