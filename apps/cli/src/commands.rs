//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use filmcatalog_core::assets::DirAssetStore;
use filmcatalog_core::graph::ContentGraph;
use filmcatalog_core::pipeline::{
    ProgressReporter, ReloadReport, SharedCatalog, SilentProgress, reload, shared_catalog,
};
use filmcatalog_core::query::{self, Scope};
use filmcatalog_core::{labels, map};
use filmcatalog_shared::{
    AppConfig, ImageMode, IngestConfig, SeasonRange, expand_home, init_config, load_config,
};
use filmcatalog_storage::{EntityKind, NullStore, Storage};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// filmcatalog: browse a TV series' filming locations.
#[derive(Parser)]
#[command(
    name = "filmcatalog",
    version,
    about = "Load and browse a catalog of seasons, episodes, and filming locations.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Catalog bundle directory (overrides `catalog.data_dir`).
    #[arg(long, global = true, env = "FILMCATALOG_DATA")]
    pub data: Option<PathBuf>,

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
    /// Reload the catalog from the bundle and mirror it into the database.
    Load {
        /// First season index to load.
        #[arg(long)]
        from: Option<u32>,

        /// Last season index to load (inclusive).
        #[arg(long)]
        to: Option<u32>,

        /// Image resolution: embedded or referenced.
        #[arg(long)]
        image_mode: Option<ImageMode>,

        /// Skip the database; load in memory only.
        #[arg(long)]
        no_store: bool,
    },

    /// List seasons.
    Seasons,

    /// List a season's episodes.
    Episodes {
        /// Season number.
        #[arg(long)]
        season: u32,
    },

    /// List filming locations, optionally narrowed to a season or episode.
    Locations {
        /// Season number.
        #[arg(long)]
        season: Option<u32>,

        /// Episode number within the season.
        #[arg(long, requires = "season")]
        episode: Option<u32>,
    },

    /// Show map pins and the region framing them.
    Map {
        /// Season number.
        #[arg(long)]
        season: Option<u32>,

        /// Episode number within the season.
        #[arg(long, requires = "season")]
        episode: Option<u32>,
    },

    /// Show recent load runs recorded in the database.
    History {
        /// Number of runs to show.
        #[arg(long, default_value = "10")]
        limit: u32,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so `--json`
/// output on stdout stays parseable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "filmcatalog=info",
        1 => "filmcatalog=debug",
        _ => "filmcatalog=trace",
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

/// Flags every command sees.
struct Context {
    json: bool,
    data: Option<PathBuf>,
    config: AppConfig,
}

impl Context {
    fn data_dir(&self) -> Result<PathBuf> {
        match &self.data {
            Some(dir) => Ok(dir.clone()),
            None => Ok(expand_home(&self.config.catalog.data_dir)?),
        }
    }

    fn db_path(&self) -> Result<PathBuf> {
        Ok(expand_home(&self.config.storage.db_path)?)
    }
}

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        json: cli.json,
        data: cli.data,
        config: load_config()?,
    };

    match cli.command {
        Command::Load {
            from,
            to,
            image_mode,
            no_store,
        } => cmd_load(&ctx, from, to, image_mode, no_store).await,
        Command::Seasons => cmd_seasons(&ctx).await,
        Command::Episodes { season } => cmd_episodes(&ctx, season).await,
        Command::Locations { season, episode } => cmd_locations(&ctx, season, episode).await,
        Command::Map { season, episode } => cmd_map(&ctx, season, episode).await,
        Command::History { limit } => cmd_history(&ctx, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&ctx).await,
        },
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

async fn cmd_load(
    ctx: &Context,
    from: Option<u32>,
    to: Option<u32>,
    image_mode: Option<ImageMode>,
    no_store: bool,
) -> Result<()> {
    let mut ingest = IngestConfig::try_from(&ctx.config)?;
    ingest.seasons = SeasonRange::new(
        from.unwrap_or(ingest.seasons.first()),
        to.unwrap_or(ingest.seasons.last()),
    )?;
    if let Some(mode) = image_mode {
        ingest.image_mode = mode;
    }

    let data_dir = ctx.data_dir()?;
    let assets = Arc::new(DirAssetStore::new(&data_dir));
    let catalog = shared_catalog();

    info!(
        data = %data_dir.display(),
        range = %ingest.seasons,
        mode = %ingest.image_mode,
        "loading catalog"
    );

    let silent = SilentProgress;
    let spinner;
    let progress: &dyn ProgressReporter = if ctx.json {
        &silent
    } else {
        spinner = CliProgress::new();
        &spinner
    };

    let (report, stored) = if ctx.config.storage.enabled && !no_store {
        let db_path = ctx.db_path()?;
        let storage = Storage::open(&db_path)
            .await
            .wrap_err_with(|| format!("failed to open catalog database {}", db_path.display()))?;

        let run_id = match storage
            .insert_ingest_run(ingest.seasons.first(), ingest.seasons.last())
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "failed to record ingest run");
                None
            }
        };

        let report = reload(&catalog, assets, &storage, &ingest, progress).await;

        if let Some(run_id) = run_id {
            if let Err(e) = storage
                .finish_ingest_run(&run_id, &report.stats().to_string())
                .await
            {
                warn!(%run_id, error = %e, "failed to finish ingest run");
            }
        }

        let mut stored = Vec::new();
        for kind in [EntityKind::Season, EntityKind::Episode, EntityKind::Location] {
            stored.push((kind, storage.count_rows(kind).await?));
        }
        (report, Some(stored))
    } else {
        (reload(&catalog, assets, &NullStore, &ingest, progress).await, None)
    };

    if ctx.json {
        return print_json(&report);
    }

    print_report(&report);
    if let Some(stored) = stored {
        let counts: Vec<String> = stored
            .iter()
            .map(|(kind, count)| format!("{count} {kind}s"))
            .collect();
        println!("  Stored:       {}", counts.join(", "));
        println!();
    }
    Ok(())
}

fn print_report(report: &ReloadReport) {
    println!();
    if report.is_clean() {
        println!("  Catalog loaded.");
    } else {
        println!("  Catalog loaded with {} issue(s).", report.issues.len());
    }
    println!("  Range:        {}", report.range);
    println!("  Seasons:      {}", report.seasons);
    println!("  Episodes:     {}", report.episodes);
    println!("  Locations:    {}", report.locations);
    println!("  Placeholders: {}", report.placeholder_images);
    println!("  Persisted:    {}", if report.persisted { "yes" } else { "no" });
    println!("  Fingerprint:  {}", &report.fingerprint[..12.min(report.fingerprint.len())]);
    println!("  Time:         {:.2}s", report.elapsed.as_secs_f64());
    for issue in &report.issues {
        let season = issue
            .season
            .map(|n| format!("season {n}"))
            .unwrap_or_else(|| "store".into());
        println!("    - [{season}] {:?}: {}", issue.stage, issue.message);
    }
    println!();
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn season_staged(&self, number: u32, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Staged [{current}/{total}] season {number}"));
    }

    fn done(&self, _report: &ReloadReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Browsing
// ---------------------------------------------------------------------------

/// Load the bundle into memory for a read-only command.
async fn load_catalog(ctx: &Context) -> Result<SharedCatalog> {
    let ingest = IngestConfig::try_from(&ctx.config)?;
    let assets = Arc::new(DirAssetStore::new(ctx.data_dir()?));
    let catalog = shared_catalog();
    let report = reload(&catalog, assets, &NullStore, &ingest, &SilentProgress).await;
    if !report.is_clean() {
        warn!(
            issues = report.issues.len(),
            last_error = report.last_error().unwrap_or_default(),
            "catalog loaded with issues"
        );
    }
    Ok(catalog)
}

/// Turn `--season`/`--episode` numbers into a scope.
fn resolve_scope(graph: &ContentGraph, season: Option<u32>, episode: Option<u32>) -> Result<Scope> {
    let Some(number) = season else {
        return Ok(Scope::All);
    };
    let (season_id, _) = query::list_seasons(graph)
        .into_iter()
        .find(|(_, s)| s.season_number == number)
        .ok_or_else(|| eyre!("season {number} is not in the catalog"))?;

    let Some(episode_number) = episode else {
        return Ok(Scope::Season(season_id));
    };
    let (episode_id, _) = query::list_episodes(graph, season_id)
        .into_iter()
        .find(|(_, e)| e.episode_number == episode_number)
        .ok_or_else(|| eyre!("season {number} has no episode {episode_number}"))?;
    Ok(Scope::Episode(episode_id))
}

async fn cmd_seasons(ctx: &Context) -> Result<()> {
    let catalog = load_catalog(ctx).await?;
    let graph = catalog.read().await;

    let rows: Vec<_> = query::list_seasons(&graph)
        .into_iter()
        .map(|(id, season)| {
            let locations = query::flatten_locations(&graph, Scope::Season(id)).len();
            json!({
                "season": season.season_number,
                "title": season.title,
                "air_date": season.air_date,
                "total_episodes": season.total_episodes,
                "episodes": graph.episode_ids(id).len(),
                "locations": locations,
                "category": query::classify_season(season).token(),
            })
        })
        .collect();

    if ctx.json {
        return print_json(&rows);
    }
    for row in &rows {
        println!(
            "  Season {:<3} {:<30} {:<10} {:>3} episodes  {:<14} [{}]",
            row["season"],
            row["title"].as_str().unwrap_or_default(),
            row["air_date"].as_str().unwrap_or_default(),
            row["episodes"],
            labels::location_count_label(row["locations"].as_u64().unwrap_or_default() as usize),
            row["category"].as_str().unwrap_or_default(),
        );
    }
    Ok(())
}

async fn cmd_episodes(ctx: &Context, season: u32) -> Result<()> {
    let catalog = load_catalog(ctx).await?;
    let graph = catalog.read().await;
    let Scope::Season(season_id) = resolve_scope(&graph, Some(season), None)? else {
        return Err(eyre!("season {season} is not in the catalog"));
    };

    let rows: Vec<_> = query::list_episodes(&graph, season_id)
        .into_iter()
        .map(|(id, episode)| {
            json!({
                "episode": episode.episode_number,
                "season_episode_number": episode.season_episode_number,
                "title": episode.title,
                "air_date": episode.air_date,
                "guest_stars": episode.guest_stars,
                "heading": labels::episode_heading(episode),
                "menu_label": labels::episode_menu_label(episode),
                "locations": graph.location_ids(id).len(),
                "category": query::classify_episode(episode).token(),
            })
        })
        .collect();

    if ctx.json {
        return print_json(&rows);
    }
    println!("  {}", labels::season_scope_label(&graph, Scope::Season(season_id)));
    for row in &rows {
        println!(
            "  {:<50} {:<14} [{}]",
            row["heading"].as_str().unwrap_or_default(),
            labels::location_count_label(row["locations"].as_u64().unwrap_or_default() as usize),
            row["category"].as_str().unwrap_or_default(),
        );
    }
    Ok(())
}

async fn cmd_locations(ctx: &Context, season: Option<u32>, episode: Option<u32>) -> Result<()> {
    let catalog = load_catalog(ctx).await?;
    let graph = catalog.read().await;
    let scope = resolve_scope(&graph, season, episode)?;

    let rows: Vec<_> = query::flatten_locations(&graph, scope)
        .into_iter()
        .map(|(id, location)| {
            json!({
                "id": id.to_string(),
                "title": location.title,
                "detail_title": labels::location_detail_title(&graph, id),
                "episode": labels::episode_info(&graph, id),
                "time_code": location.time_code,
                "info": location.info,
                "latitude": location.coordinate.latitude,
                "longitude": location.coordinate.longitude,
                "image": location.image.identifier(),
            })
        })
        .collect();

    if ctx.json {
        return print_json(&rows);
    }
    println!(
        "  {} / {}: {}",
        labels::season_scope_label(&graph, scope),
        labels::episode_scope_label(&graph, scope),
        labels::location_count_label(rows.len()),
    );
    for row in &rows {
        println!(
            "  {:<9} {:<40} ({:.4}, {:.4})  {}",
            row["time_code"].as_str().unwrap_or_default(),
            row["detail_title"].as_str().unwrap_or_default(),
            row["latitude"].as_f64().unwrap_or_default(),
            row["longitude"].as_f64().unwrap_or_default(),
            row["image"].as_str().unwrap_or_default(),
        );
    }
    Ok(())
}

async fn cmd_map(ctx: &Context, season: Option<u32>, episode: Option<u32>) -> Result<()> {
    let catalog = load_catalog(ctx).await?;
    let graph = catalog.read().await;
    let scope = resolve_scope(&graph, season, episode)?;

    let pins = map::pins_for_scope(&graph, scope);
    let region = map::frame_scope(&graph, scope).map(|r| r.with_min_span(ctx.config.map.min_span));

    if ctx.json {
        return print_json(&json!({
            "season": labels::season_scope_label(&graph, scope),
            "episode": labels::episode_scope_label(&graph, scope),
            "region": region,
            "pins": pins,
        }));
    }

    println!(
        "  {} / {}",
        labels::season_scope_label(&graph, scope),
        labels::episode_scope_label(&graph, scope)
    );
    match region {
        Some(region) => println!(
            "  Center ({:.4}, {:.4})  span {:.4}° × {:.4}°",
            region.center.latitude,
            region.center.longitude,
            region.span.latitude_delta,
            region.span.longitude_delta,
        ),
        None => println!("  No locations to frame."),
    }
    for pin in &pins {
        println!(
            "  [{:<11}] {:<40} {}",
            pin.tint_token(),
            pin.title,
            pin.coordinate
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

async fn cmd_history(ctx: &Context, limit: u32) -> Result<()> {
    let db_path = ctx.db_path()?;
    if !db_path.exists() {
        return Err(eyre!(
            "no catalog database at {}; run `filmcatalog load` first",
            db_path.display()
        ));
    }
    let storage = Storage::open_readonly(&db_path).await?;
    let runs = storage.list_ingest_runs(limit).await?;
    let stored = storage.list_seasons().await?;

    if ctx.json {
        let stored: Vec<_> = stored
            .iter()
            .map(|(number, title)| json!({ "season": number, "title": title }))
            .collect();
        return print_json(&json!({ "runs": runs, "stored_seasons": stored }));
    }
    if runs.is_empty() {
        println!("  No load runs recorded.");
        return Ok(());
    }
    if !stored.is_empty() {
        let seasons: Vec<String> = stored
            .iter()
            .map(|(number, title)| format!("{number} ({title})"))
            .collect();
        println!("  Stored seasons: {}", seasons.join(", "));
    }
    for run in &runs {
        let status = run
            .stats_json
            .as_deref()
            .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
            .and_then(|v| v["status"].as_str().map(String::from))
            .unwrap_or_else(|| "unfinished".into());
        println!(
            "  {}  seasons {}..={}  {}",
            run.started_at, run.first_season, run.last_season, status
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(ctx: &Context) -> Result<()> {
    if ctx.json {
        return print_json(&ctx.config);
    }
    let toml_str = toml::to_string_pretty(&ctx.config)?;
    println!("{toml_str}");
    Ok(())
}
