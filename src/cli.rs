use crate::{
    config::Config,
    model::RunStamp,
    pipeline::Pipeline,
    render::{ChromeRenderer, FileRenderer, Renderer},
    response::RunResponse,
    store::{MemoryStore, SqliteStore},
    util::ensure_dir,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "sismo-scrape")]
#[command(about = "Scrape the reported-earthquakes table and upsert it into a key-value store")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./sismo-scrape.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the browser binary and show where reports would be written.
    Doctor {},
    /// Render and extract without writing; print the first records.
    Preview {
        /// Read a saved HTML page instead of rendering the configured URL.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
    /// Run the pipeline once.
    Run {
        /// Write into an in-memory store instead of the configured one.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Returns whether the command succeeded; a failed run still prints its payload.
pub fn dispatch(args: Args) -> Result<bool> {
    let cfg = load_config(args.config.as_deref())?;
    let _guard = init_logging(&args, &cfg)?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Preview { input, limit } => preview(&cfg, input.as_deref(), *limit),
        Command::Run { dry_run } => run(&cfg, *dry_run),
    }
}

pub fn load_config(user: Option<&Path>) -> Result<Config> {
    let mut cfg = match resolve_config_path(user) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    cfg.apply_env()?;
    cfg.validate()?;
    Ok(cfg)
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["sismo-scrape.toml", "sismo-scrape.example.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for the JSON payload.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if cfg.logging.write_to_file && !cfg.logging.file_path.is_empty() {
        let path = Path::new(&cfg.logging.file_path);
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn print_json<T: Serialize>(cfg: &Config, value: &T) -> Result<()> {
    let out = if cfg.output.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn doctor(cfg: &Config) -> Result<bool> {
    let renderer = ChromeRenderer::new(&cfg.render);
    let (ok, browser) = match renderer.version() {
        Ok(v) => (true, serde_json::json!({ "exe": cfg.render.browser_exe, "version": v })),
        Err(e) => (
            false,
            serde_json::json!({ "exe": cfg.render.browser_exe, "error": format!("{e:#}") }),
        ),
    };
    print_json(
        cfg,
        &serde_json::json!({
            "ok": ok,
            "browser": browser,
            "url": cfg.source.url,
            "store": {
                "path": cfg.store.path,
                "table_name": cfg.store.table_name,
                "batch_size": cfg.store.batch_size,
            },
        }),
    )?;
    Ok(ok)
}

fn preview(cfg: &Config, input: Option<&Path>, limit: usize) -> Result<bool> {
    let run = RunStamp::now();
    let reports = match input {
        Some(path) => preview_with(cfg, FileRenderer::new(path), &run)?,
        None => preview_with(cfg, ChromeRenderer::new(&cfg.render), &run)?,
    };

    print_json(
        cfg,
        &serde_json::json!({
            "url": cfg.source.url,
            "count": reports.len(),
            "first": reports.iter().take(limit).collect::<Vec<_>>(),
        }),
    )?;
    Ok(true)
}

fn preview_with<R: Renderer>(
    cfg: &Config,
    renderer: R,
    run: &RunStamp,
) -> Result<Vec<crate::model::Report>> {
    let pipeline = Pipeline::new(cfg, renderer, MemoryStore::new())?;
    Ok(pipeline.preview(run)?)
}

fn run(cfg: &Config, dry_run: bool) -> Result<bool> {
    let renderer = ChromeRenderer::new(&cfg.render);

    let response: RunResponse = if dry_run {
        info!("dry run: writing to an in-memory store");
        Pipeline::new(cfg, renderer, MemoryStore::new())?.invoke()
    } else {
        let path = Path::new(&cfg.store.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        let store = SqliteStore::open(path)
            .with_context(|| format!("opening store: {}", path.display()))?;
        Pipeline::new(cfg, renderer, store)?.invoke()
    };

    print_json(cfg, &response)?;
    Ok(response.is_success())
}
