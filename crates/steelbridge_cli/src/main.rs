use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use steelbridge_core::core_api::{
    AcquireOptions, Acquirer, CatalogIndex, ConvertError, ConvertErrorCode, ConvertOptions, Engine,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Convert Forgesteel hero exports to Foundry VTT draw-steel actors")]
struct Cli {
    /// Path to the Forgesteel .ds-hero export
    #[arg(value_name = "HERO.ds-hero")]
    input: PathBuf,
    /// Path for the converted actor JSON
    #[arg(value_name = "ACTOR.json")]
    output: PathBuf,
    /// Local compendium directory (Foundry pack sources); skips cache and
    /// network when usable
    #[arg(long, value_name = "DIR")]
    compendium: Option<PathBuf>,
    /// Fail on unresolved mandatory elements instead of emitting placeholders
    #[arg(long)]
    strict: bool,
    /// Per-resolution trace in the report and debug logging
    #[arg(long, short)]
    verbose: bool,
    /// Bypass the catalog cache and refetch from the remote source
    #[arg(long = "force-refresh", visible_alias = "update-compendium")]
    force_refresh: bool,
    /// Remote fetch timeout in seconds
    #[arg(long = "fetch-timeout", default_value_t = 10)]
    fetch_timeout: u64,
    /// Emit the conversion report as JSON instead of text
    #[arg(long = "report-json")]
    report_json: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), ConvertError> {
    let bytes = fs::read(&cli.input).map_err(|e| {
        ConvertError::new(
            ConvertErrorCode::Io,
            format!("failed to read {}: {e}", cli.input.display()),
        )
    })?;

    let acquirer = Acquirer::with_http(AcquireOptions {
        compendium_path: cli.compendium.clone(),
        force_refresh: cli.force_refresh,
        fetch_timeout: Duration::from_secs(cli.fetch_timeout),
        ..AcquireOptions::default()
    })?;
    let (records, tier) = acquirer.acquire()?;
    info!(count = records.len(), tier = ?tier, "catalog ready");
    let index = CatalogIndex::build(records);

    let options = ConvertOptions {
        strict: cli.strict,
        verbose: cli.verbose,
        ..ConvertOptions::default()
    };
    let conversion = Engine::new().convert_bytes(&bytes, &index, &options)?;

    let actor = steelbridge_render::render_actor_json(&conversion.document);
    let serialized = serde_json::to_string_pretty(&actor).map_err(|e| {
        ConvertError::new(
            ConvertErrorCode::Io,
            format!("failed to serialize actor document: {e}"),
        )
    })?;
    fs::write(&cli.output, serialized).map_err(|e| {
        ConvertError::new(
            ConvertErrorCode::Io,
            format!("failed to write {}: {e}", cli.output.display()),
        )
    })?;

    if cli.report_json {
        let report = serde_json::to_string_pretty(&conversion.report).map_err(|e| {
            ConvertError::new(
                ConvertErrorCode::Io,
                format!("failed to serialize report: {e}"),
            )
        })?;
        println!("{report}");
    } else {
        print!(
            "{}",
            steelbridge_render::render_report_text(&conversion.report, cli.verbose)
        );
    }

    info!(
        items = conversion.document.items.len(),
        output = %cli.output.display(),
        "conversion complete"
    );
    Ok(())
}
