//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use entsoe_core::{
    DataQuery, EntsoeClient, ProgressReporter, QueryResult, RequestState, TimeWindow,
};
use entsoe_guide::{FetchOptions, fetch_catalog};
use entsoe_resolver::{FuzzyMatch, Resolution, Resolver};
use entsoe_shared::{
    AppConfig, Catalog, ClientConfig, config_dir, init_config, load_config, validate_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use url::Url;

/// File name of the catalog snapshot in the config directory.
const CATALOG_SNAPSHOT: &str = "catalog.json";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// entsoe: query the ENTSO-E Transparency Platform by name.
#[derive(Parser)]
#[command(
    name = "entsoe",
    version,
    about = "Query ENTSO-E Transparency Platform datasets using free-text names.",
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
    /// Fetch one or more datasets for one or more areas and time windows.
    Fetch {
        /// Dataset names, e.g. "actual total load".
        #[arg(required = true)]
        datasets: Vec<String>,

        /// Area as ORIGIN or ORIGIN:DESTINATION (repeatable).
        #[arg(short, long = "area", required = true)]
        areas: Vec<String>,

        /// Window start, e.g. 2021-01-01 or "2021-01-01 06:00".
        #[arg(long)]
        start: Option<String>,

        /// Window end.
        #[arg(long)]
        end: Option<String>,

        /// Additional window as START..END; either side may be empty (repeatable).
        #[arg(long = "window")]
        windows: Vec<String>,

        /// Catalog snapshot to use instead of the configured one.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Write the result table as JSON to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Resolve free text to a catalog code.
    Resolve {
        /// Text or code to resolve.
        text: String,

        /// Parameter type to resolve within.
        #[arg(short = 't', long = "type", default_value = "Areas")]
        parameter_type: String,

        /// Resolve against dataset names instead of a parameter type.
        #[arg(long)]
        dataset: bool,

        /// Catalog snapshot to use instead of the configured one.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Catalog management.
    Catalog {
        /// Catalog subcommand.
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Catalog subcommands.
#[derive(Subcommand)]
pub(crate) enum CatalogAction {
    /// Summarize parameter types and datasets.
    Show {
        /// Catalog snapshot to use instead of the configured one.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// List known areas with their codes.
    Areas {
        /// Catalog snapshot to use instead of the configured one.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Scrape the API guide and write a catalog snapshot.
    Scrape {
        /// Guide URL (defaults to the configured one).
        #[arg(long)]
        url: Option<String>,

        /// Snapshot path (defaults to the configured path or ~/.entsoe/catalog.json).
        #[arg(short, long)]
        out: Option<PathBuf>,
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
        0 => "entsoe=info",
        1 => "entsoe=debug",
        _ => "entsoe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
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
        Command::Fetch {
            datasets,
            areas,
            start,
            end,
            windows,
            catalog,
            out,
        } => {
            let mut parsed = Vec::with_capacity(windows.len() + 1);
            if start.is_some() || end.is_some() {
                parsed.push(TimeWindow::new(start.as_deref(), end.as_deref()));
            }
            for window in &windows {
                parsed.push(parse_window(window)?);
            }
            cmd_fetch(&datasets, &areas, parsed, catalog.as_deref(), out.as_deref()).await
        }
        Command::Resolve {
            text,
            parameter_type,
            dataset,
            catalog,
        } => cmd_resolve(&text, &parameter_type, dataset, catalog.as_deref()).await,
        Command::Catalog { action } => match action {
            CatalogAction::Show { catalog } => cmd_catalog_show(catalog.as_deref()).await,
            CatalogAction::Areas { catalog } => cmd_catalog_areas(catalog.as_deref()).await,
            CatalogAction::Scrape { url, out } => {
                cmd_catalog_scrape(url.as_deref(), out.as_deref()).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_fetch(
    datasets: &[String],
    areas: &[String],
    windows: Vec<TimeWindow>,
    catalog_path: Option<&Path>,
    out: Option<&Path>,
) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;

    let catalog = load_catalog(&config, catalog_path).await?;
    let client = EntsoeClient::new(ClientConfig::from(&config), catalog)?;

    let mut query = DataQuery {
        datasets: datasets.to_vec(),
        areas: Vec::new(),
        windows,
    };
    for area in areas {
        let (origin, destination) = split_area(area);
        query = query.area(origin, destination);
    }

    info!(
        datasets = ?query.datasets,
        areas = query.areas.len(),
        windows = query.windows.len(),
        "fetching dataset"
    );

    let reporter = CliProgress::new();
    let result = client.get_data(&query, &reporter).await?;

    let json = serde_json::to_string_pretty(&result.to_table())?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            eprintln!("  Result written to {}", path.display());
        }
        None => println!("{json}"),
    }
    print_summary(&result);

    Ok(())
}

async fn cmd_resolve(
    text: &str,
    parameter_type: &str,
    dataset: bool,
    catalog_path: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;
    let catalog = load_catalog(&config, catalog_path).await?;
    let resolver = Resolver::new(&catalog, config.matching);

    if dataset {
        match resolver.resolve_dataset(text) {
            FuzzyMatch::Single(name) => println!("{name}"),
            FuzzyMatch::Ambiguous(names) => {
                return Err(eyre!("'{text}' is ambiguous: {}", names.join(", ")));
            }
            FuzzyMatch::NotFound => return Err(eyre!("no dataset matches '{text}'")),
        }
        return Ok(());
    }

    match resolver.resolve(text, parameter_type) {
        Resolution::Resolved { meaning, code } => println!("{code}\t{meaning}"),
        Resolution::Unresolved => {
            return Err(eyre!("'{text}' does not resolve within '{parameter_type}'"));
        }
    }
    Ok(())
}

async fn cmd_catalog_show(catalog_path: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let catalog = load_catalog(&config, catalog_path).await?;

    println!();
    println!("  Parameter types: {}", catalog.parameters.types().len());
    for table in catalog.parameters.types() {
        println!("    {:<40} {:>5} codes", table.name, table.entries.len());
    }
    println!();
    println!("  Datasets: {}", catalog.datasets.len());
    for descriptor in &catalog.datasets {
        println!(
            "    {:<50} {}",
            descriptor.name(),
            descriptor.mandatory_fields().join(", ")
        );
    }
    println!();

    Ok(())
}

async fn cmd_catalog_areas(catalog_path: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let catalog = load_catalog(&config, catalog_path).await?;
    let client = EntsoeClient::new(ClientConfig::from(&config), catalog)?;

    let areas = client.areas();
    if areas.is_empty() {
        return Err(eyre!("catalog has no area table"));
    }
    for (code, meaning) in areas {
        println!("{code}\t{meaning}");
    }
    Ok(())
}

async fn cmd_catalog_scrape(url: Option<&str>, out: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let url = url.unwrap_or(&config.catalog.guide_url);
    let parsed_url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let path = match out {
        Some(p) => p.to_path_buf(),
        None => snapshot_path(&config)?,
    };

    let spinner = CliProgress::new();
    spinner.phase("Scraping API guide");
    let opts = FetchOptions {
        timeout_secs: config.api.timeout_secs,
    };
    let catalog = fetch_catalog(&parsed_url, &opts).await?;
    spinner.spinner.finish_and_clear();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, catalog.to_json_pretty()?)
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;

    println!();
    println!("  Catalog scraped successfully!");
    println!("  Datasets:        {}", catalog.datasets.len());
    println!("  Parameter types: {}", catalog.parameters.types().len());
    println!("  Path:            {}", path.display());
    println!();

    Ok(())
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

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Snapshot location: the configured path, else `~/.entsoe/catalog.json`.
fn snapshot_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.catalog.path {
        Some(p) => Ok(PathBuf::from(p)),
        None => Ok(config_dir()?.join(CATALOG_SNAPSHOT)),
    }
}

/// Load the catalog from an explicit path, the snapshot, or the live guide.
async fn load_catalog(config: &AppConfig, explicit: Option<&Path>) -> Result<Catalog> {
    if let Some(path) = explicit {
        return Ok(Catalog::from_json_path(path)?);
    }

    let snapshot = snapshot_path(config)?;
    if snapshot.exists() {
        debug!(path = %snapshot.display(), "loading catalog snapshot");
        return Ok(Catalog::from_json_path(&snapshot)?);
    }

    info!(url = %config.catalog.guide_url, "no catalog snapshot, scraping API guide");
    let url = Url::parse(&config.catalog.guide_url)
        .map_err(|e| eyre!("invalid guide URL '{}': {e}", config.catalog.guide_url))?;
    let opts = FetchOptions {
        timeout_secs: config.api.timeout_secs,
    };
    Ok(fetch_catalog(&url, &opts).await?)
}

/// `ORIGIN:DESTINATION` → `(origin, Some(destination))`; no colon → no destination.
fn split_area(area: &str) -> (&str, Option<&str>) {
    match area.split_once(':') {
        Some((origin, destination)) if !destination.trim().is_empty() => {
            (origin.trim(), Some(destination.trim()))
        }
        Some((origin, _)) => (origin.trim(), None),
        None => (area.trim(), None),
    }
}

/// `START..END` with either side optional.
fn parse_window(window: &str) -> Result<TimeWindow> {
    let (start, end) = window
        .split_once("..")
        .ok_or_else(|| eyre!("invalid window '{window}': expected START..END"))?;
    fn side(s: &str) -> Option<&str> {
        let s = s.trim();
        (!s.is_empty()).then_some(s)
    }
    Ok(TimeWindow::new(side(start), side(end)))
}

fn print_summary(result: &QueryResult) {
    eprintln!();
    eprintln!("  Rows:     {}", result.table.len());
    eprintln!("  Failures: {}", result.failures.len());
    for failure in &result.failures {
        eprintln!("    {} [{}]: {}", failure.dataset, failure.parameters, failure.reason);
    }
    eprintln!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn request_started(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Requesting [{current}/{total}] {label}"));
    }

    fn request_finished(&self, label: &str, state: RequestState) {
        if state == RequestState::Failure {
            self.spinner.println(format!("  failed: {label}"));
        }
    }

    fn done(&self, _result: &QueryResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_with_destination() {
        assert_eq!(split_area("DK1:DK2"), ("DK1", Some("DK2")));
        assert_eq!(split_area("Denmark"), ("Denmark", None));
        assert_eq!(split_area("DK1:"), ("DK1", None));
    }

    #[test]
    fn window_sides_are_optional() {
        assert_eq!(
            parse_window("2021-01-01..2021-01-02").unwrap(),
            TimeWindow::new(Some("2021-01-01"), Some("2021-01-02"))
        );
        assert_eq!(
            parse_window("..2021-01-02").unwrap(),
            TimeWindow::new(None, Some("2021-01-02"))
        );
        assert!(parse_window("2021-01-01").is_err());
    }

    #[test]
    fn cli_parses_fetch() {
        let cli = Cli::try_parse_from([
            "entsoe",
            "fetch",
            "actual total load",
            "day-ahead prices",
            "--area",
            "DK1",
            "--start",
            "2021-01-01",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Fetch { datasets, areas, start, .. } => {
                assert_eq!(datasets, ["actual total load", "day-ahead prices"]);
                assert_eq!(areas, ["DK1"]);
                assert_eq!(start.as_deref(), Some("2021-01-01"));
            }
            _ => panic!("expected fetch"),
        }
    }
}
