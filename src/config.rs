use crate::store::{valid_table_name, MAX_BATCH_ITEMS};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub render: Render,
    #[serde(default)]
    pub store: Store,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub output: Output,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Apply `SISMO_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SISMO_URL") {
            self.source.url = v;
        }
        if let Some(v) = lookup("SISMO_TABLE_NAME") {
            self.store.table_name = v;
        }
        if let Some(v) = lookup("SISMO_STORE_PATH") {
            self.store.path = v;
        }
        if let Some(v) = lookup("SISMO_BROWSER") {
            self.render.browser_exe = v;
        }
        if let Some(v) = lookup("SISMO_BATCH_SIZE") {
            self.store.batch_size = parse_env("SISMO_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("SISMO_SETTLE_TIMEOUT_SECONDS") {
            self.render.settle_timeout_seconds = parse_env("SISMO_SETTLE_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = lookup("SISMO_READINESS_TIMEOUT_SECONDS") {
            self.render.readiness_timeout_seconds =
                parse_env("SISMO_READINESS_TIMEOUT_SECONDS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.url)
            .with_context(|| format!("source.url is not a valid URL: {}", self.source.url))?;

        if self.source.table_selector.trim().is_empty() || self.source.row_selector.trim().is_empty()
        {
            return Err(anyhow!("source selectors must not be empty"));
        }

        if !valid_table_name(&self.store.table_name) {
            return Err(anyhow!("invalid store.table_name: {}", self.store.table_name));
        }

        if self.store.batch_size == 0 || self.store.batch_size > MAX_BATCH_ITEMS {
            return Err(anyhow!(
                "store.batch_size must be within 1..={}, got {}",
                MAX_BATCH_ITEMS,
                self.store.batch_size
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{key}={raw:?} is invalid: {e}"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub table_selector: String,
    pub row_selector: String,
}
impl Default for Source {
    fn default() -> Self {
        Self {
            url: "https://ultimosismo.igp.gob.pe/ultimo-sismo/sismos-reportados".into(),
            table_selector: "table tbody".into(),
            row_selector: "table tbody tr".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Render {
    pub browser_exe: String,
    pub extra_args: Vec<String>,
    pub settle_timeout_seconds: u64,
    pub readiness_timeout_seconds: u64,
    pub virtual_time_budget_ms: u64,
    pub poll_interval_ms: u64,
}
impl Default for Render {
    fn default() -> Self {
        Self {
            browser_exe: "chromium".into(),
            extra_args: vec!["--no-sandbox".into(), "--disable-gpu".into()],
            settle_timeout_seconds: 60,
            readiness_timeout_seconds: 30,
            virtual_time_budget_ms: 10_000,
            poll_interval_ms: 1000,
        }
    }
}

impl Render {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_seconds)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub table_name: String,
    pub path: String,
    pub batch_size: usize,
}
impl Default for Store {
    fn default() -> Self {
        Self {
            table_name: "TablaWebScrapping".into(),
            path: "data/sismos.sqlite".into(),
            batch_size: MAX_BATCH_ITEMS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "logs/sismo-scrape.log".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub print_reports: bool,
    pub pretty: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            print_reports: true,
            pretty: true,
        }
    }
}
