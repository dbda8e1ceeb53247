// src/config.rs
//! Runtime configuration from the environment (`.env` loaded by the binary).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, NaiveTime};

use crate::ingest::providers::{mediastack, newsapi};
use crate::pipeline::{DailySchedule, OrchestratorConfig};
use crate::relevance::{KeywordConfig, RelevanceFilter, Strategy};

pub const DEFAULT_DATA_DIR: &str = "data";

/// Phrases every search provider queries for.
pub const SEARCH_PHRASES: [&str; 2] = ["Túnel Santos-Guarujá", "Túnel Imerso Santos-Guarujá"];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mediastack_api_key: Option<String>,
    pub mediastack_base_url: String,
    pub newsapi_api_key: Option<String>,
    pub newsapi_base_url: String,
    pub search_phrases: Vec<String>,
    pub rss_feeds: Vec<String>,
    /// Shared secret for the admin/cron endpoints. `None` locks them.
    pub cron_secret: Option<String>,
    pub data_dir: PathBuf,
    pub strategy: Strategy,
    /// Explicit blocklist switch; `None` keeps the strategy's default.
    pub blocklist: Option<bool>,
    pub orchestrator: OrchestratorConfig,
    pub schedule: DailySchedule,
    pub scheduler_enabled: bool,
    pub log_json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mediastack_api_key: None,
            mediastack_base_url: mediastack::DEFAULT_BASE_URL.to_string(),
            newsapi_api_key: None,
            newsapi_base_url: newsapi::DEFAULT_BASE_URL.to_string(),
            search_phrases: SEARCH_PHRASES.iter().map(|s| s.to_string()).collect(),
            rss_feeds: Vec::new(),
            cron_secret: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            strategy: Strategy::default(),
            blocklist: None,
            orchestrator: OrchestratorConfig::default(),
            schedule: DailySchedule::default(),
            scheduler_enabled: true,
            log_json: false,
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_flag(key: &str, v: &str) -> Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{key}: expected a boolean, got `{other}`")),
    }
}

fn parse_num<T>(key: &str, v: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    v.trim()
        .parse::<T>()
        .with_context(|| format!("{key}: invalid number `{v}`"))
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup (env, map in tests). Unset keys keep defaults.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let var = |k: &str| non_empty(get(k));

        cfg.mediastack_api_key = var("MEDIASTACK_API_KEY");
        cfg.newsapi_api_key = var("NEWSAPI_API_KEY");
        cfg.cron_secret = var("CRON_SECRET");

        if let Some(v) = var("MEDIASTACK_BASE_URL") {
            cfg.mediastack_base_url = v;
        }
        if let Some(v) = var("NEWSAPI_BASE_URL") {
            cfg.newsapi_base_url = v;
        }
        if let Some(v) = var("NEWS_DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("NEWS_RSS_FEEDS") {
            cfg.rss_feeds = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = var("NEWS_RELEVANCE_STRATEGY") {
            cfg.strategy = v.parse().context("NEWS_RELEVANCE_STRATEGY")?;
        }
        if let Some(v) = var("NEWS_BLOCKLIST") {
            cfg.blocklist = Some(parse_flag("NEWS_BLOCKLIST", &v)?);
        }

        if let Some(v) = var("NEWS_UPDATE_TIME") {
            cfg.schedule.target = NaiveTime::parse_from_str(v.trim(), "%H:%M")
                .with_context(|| format!("NEWS_UPDATE_TIME: expected HH:MM, got `{v}`"))?;
        }
        if let Some(v) = var("NEWS_UTC_OFFSET_HOURS") {
            let hours: i32 = parse_num("NEWS_UTC_OFFSET_HOURS", &v)?;
            cfg.schedule.offset = Some(hours)
                .filter(|h| (-23..=23).contains(h))
                .and_then(|h| FixedOffset::east_opt(h * 3600))
                .ok_or_else(|| anyhow!("NEWS_UTC_OFFSET_HOURS out of range: {hours}"))?;
        }
        if let Some(v) = var("NEWS_RETRY_SECS") {
            cfg.schedule.retry_interval = Duration::from_secs(parse_num("NEWS_RETRY_SECS", &v)?);
        }
        if let Some(v) = var("NEWS_RETENTION_DAYS") {
            let days: i64 = parse_num("NEWS_RETENTION_DAYS", &v)?;
            if days < 1 {
                return Err(anyhow!("NEWS_RETENTION_DAYS must be >= 1, got {days}"));
            }
            cfg.orchestrator.retention_days = days;
        }
        if let Some(v) = var("NEWS_PROVIDER_TIMEOUT_SECS") {
            let secs: u64 = parse_num("NEWS_PROVIDER_TIMEOUT_SECS", &v)?;
            cfg.orchestrator.provider_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(v) = var("NEWS_SCHEDULER_ENABLED") {
            cfg.scheduler_enabled = parse_flag("NEWS_SCHEDULER_ENABLED", &v)?;
        }
        if let Some(v) = var("NEWS_LOG_JSON") {
            cfg.log_json = parse_flag("NEWS_LOG_JSON", &v)?;
        }

        Ok(cfg)
    }

    /// Keyword sets from TOML (or built-ins) combined with the chosen strategy.
    pub fn relevance_filter(&self) -> Result<RelevanceFilter> {
        let keywords = KeywordConfig::load_default()?;
        let filter = RelevanceFilter::new(keywords, self.strategy);
        Ok(match self.blocklist {
            Some(on) => filter.with_blocklist(on),
            None => filter,
        })
    }
}
