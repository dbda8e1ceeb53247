// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::error::ProviderError;
use crate::ingest::types::{ProviderReport, RawArticle, SourceProvider};
use crate::news::{Candidate, NO_LINK_URL};

pub const TITLE_MAX_CHARS: usize = 300;
pub const SUMMARY_MAX_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "news_candidates_total",
            "Candidates returned by providers after normalization."
        );
        describe_counter!(
            "news_provider_errors_total",
            "Provider fetch/parse errors and timeouts."
        );
        describe_histogram!("news_provider_fetch_ms", "Provider fetch time in milliseconds.");
        describe_counter!("news_rejected_total", "Candidates rejected by relevance gates.");
        describe_counter!("news_duplicates_total", "Candidates skipped as duplicates.");
        describe_counter!("news_added_total", "News items persisted.");
        describe_counter!("news_purged_total", "News items removed by retention.");
        describe_counter!("news_update_runs_total", "Update runs by outcome.");
        describe_histogram!("news_update_duration_ms", "Update run duration in milliseconds.");
        describe_gauge!(
            "news_last_update_ts",
            "Unix ts of the last successful update run."
        );
        describe_histogram!("news_rss_parse_ms", "RSS document parse time in milliseconds.");
        describe_gauge!("news_scheduler_next_run_secs", "Seconds until the next scheduled update.");
        describe_gauge!("news_retention_days", "Configured retention window in days.");
    });
}

/// Normalize text: decode entities, strip tags, fold quotes and whitespace, cap length.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. nbsp)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// Parse the date formats our providers emit into a calendar date (UTC).
pub fn parse_published_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc().date());
    }
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc2822) {
        let utc = dt.to_offset(UtcOffset::UTC);
        return NaiveDate::from_ymd_opt(utc.year(), u8::from(utc.month()) as u32, utc.day() as u32);
    }
    // "2025-09-01" or "2025-09-01 10:00:00"
    raw.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// Turn a raw record into a `Candidate`. Returns `None` for records without a title.
pub fn normalize_article(raw: RawArticle, fallback_source: &str, today: NaiveDate) -> Option<Candidate> {
    let title = normalize_text(raw.title.as_deref().unwrap_or_default(), TITLE_MAX_CHARS);
    if title.is_empty() {
        return None;
    }

    let source = raw
        .source
        .map(|s| normalize_text(&s, 120))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_source.to_string());

    let url = raw
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| NO_LINK_URL.to_string());

    let image_url = raw
        .image_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    Some(Candidate {
        title,
        source,
        published_date: raw
            .published
            .as_deref()
            .and_then(parse_published_date)
            .unwrap_or(today),
        summary: normalize_text(raw.summary.as_deref().unwrap_or_default(), SUMMARY_MAX_CHARS),
        url,
        image_url,
    })
}

/// Union of the successful providers' output plus one report per provider.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub candidates: Vec<Candidate>,
    pub reports: Vec<ProviderReport>,
}

impl Aggregation {
    pub fn failed_providers(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failure()).count()
    }
}

async fn fetch_one(
    provider: &dyn SourceProvider,
    timeout: Duration,
) -> (ProviderReport, Vec<Candidate>) {
    let t0 = Instant::now();
    let res = match tokio::time::timeout(timeout, provider.fetch_latest()).await {
        Ok(res) => res,
        Err(_) => Err(ProviderError::Timeout(timeout.as_secs())),
    };
    let elapsed_ms = t0.elapsed().as_millis() as u64;
    histogram!("news_provider_fetch_ms").record(elapsed_ms as f64);

    match res {
        Ok(items) => {
            if items.is_empty() {
                tracing::debug!(target: "ingest", provider = provider.name(), "provider returned no items");
            }
            let report = ProviderReport {
                provider: provider.name().to_string(),
                fetched: items.len(),
                elapsed_ms,
                error: None,
            };
            (report, items)
        }
        Err(e) => {
            tracing::warn!(target: "ingest", error = %e, provider = provider.name(), "provider error");
            counter!("news_provider_errors_total").increment(1);
            let report = ProviderReport {
                provider: provider.name().to_string(),
                fetched: 0,
                elapsed_ms,
                error: Some(e.to_string()),
            };
            (report, Vec::new())
        }
    }
}

/// Fan out to every provider concurrently, each under its own timeout, and
/// wait for all of them to settle. Failures never abort the batch.
pub async fn aggregate(providers: &[Arc<dyn SourceProvider>], timeout: Duration) -> Aggregation {
    ensure_metrics_described();

    let settled =
        futures::future::join_all(providers.iter().map(|p| fetch_one(p.as_ref(), timeout))).await;

    let mut out = Aggregation::default();
    for (report, mut items) in settled {
        out.candidates.append(&mut items);
        out.reports.push(report);
    }
    counter!("news_candidates_total").increment(out.candidates.len() as u64);

    tracing::info!(
        target: "ingest",
        providers = out.reports.len(),
        failed = out.failed_providers(),
        candidates = out.candidates.len(),
        "aggregation settled"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cand(title: &str) -> Candidate {
        Candidate {
            title: title.into(),
            source: "Mock".into(),
            published_date: day(2025, 9, 1),
            summary: String::new(),
            url: format!("https://example.test/{}", title.len()),
            image_url: None,
        }
    }

    struct Fixed(&'static str, Vec<Candidate>);

    #[async_trait]
    impl SourceProvider for Fixed {
        async fn fetch_latest(&self) -> Result<Vec<Candidate>, ProviderError> {
            Ok(self.1.clone())
        }
        fn name(&self) -> &'static str {
            self.0
        }
    }

    struct Broken;

    #[async_trait]
    impl SourceProvider for Broken {
        async fn fetch_latest(&self) -> Result<Vec<Candidate>, ProviderError> {
            Err(ProviderError::Api {
                status: 401,
                message: "invalid_access_key".into(),
            })
        }
        fn name(&self) -> &'static str {
            "Broken"
        }
    }

    struct Stalled;

    #[async_trait]
    impl SourceProvider for Stalled {
        async fn fetch_latest(&self) -> Result<Vec<Candidate>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![cand("never")])
        }
        fn name(&self) -> &'static str {
            "Stalled"
        }
    }

    #[test]
    fn normalize_text_strips_html_and_folds_ws() {
        let s = "<p>Túnel&nbsp;<b>Santos-Guarujá</b>   &ldquo;avança&rdquo;!</p>";
        assert_eq!(normalize_text(s, 100), r#"Túnel Santos-Guarujá "avança"!"#);
        assert_eq!(normalize_text(&"x".repeat(50), 10).len(), 10);
    }

    #[test]
    fn parses_provider_date_formats() {
        assert_eq!(
            parse_published_date("2025-09-01T23:30:00+00:00"),
            Some(day(2025, 9, 1))
        );
        assert_eq!(
            parse_published_date("2025-09-01T22:30:00-03:00"),
            Some(day(2025, 9, 2))
        );
        assert_eq!(
            parse_published_date("Mon, 01 Sep 2025 10:00:00 +0000"),
            Some(day(2025, 9, 1))
        );
        assert_eq!(parse_published_date("2025-09-01"), Some(day(2025, 9, 1)));
        assert_eq!(parse_published_date("yesterday"), None);
    }

    #[test]
    fn normalize_article_fills_defaults() {
        let today = day(2025, 9, 10);
        let raw = RawArticle {
            title: Some("  Túnel   Santos-Guarujá ".into()),
            source: None,
            published: Some("not a date".into()),
            summary: None,
            url: Some("   ".into()),
            image_url: Some(String::new()),
        };
        let c = normalize_article(raw, "MediaStack", today).expect("has title");
        assert_eq!(c.title, "Túnel Santos-Guarujá");
        assert_eq!(c.source, "MediaStack");
        assert_eq!(c.published_date, today);
        assert_eq!(c.url, NO_LINK_URL);
        assert_eq!(c.image_url, None);
        assert_eq!(c.summary, "");
    }

    #[test]
    fn normalize_article_drops_untitled() {
        let raw = RawArticle {
            title: Some("<b> </b>".into()),
            ..Default::default()
        };
        assert!(normalize_article(raw, "X", day(2025, 1, 1)).is_none());
    }

    #[tokio::test]
    async fn partial_failure_yields_union_of_successes() {
        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(Fixed("A", vec![cand("a1"), cand("a22")])),
            Arc::new(Broken),
            Arc::new(Fixed("C", vec![cand("c333")])),
        ];
        let agg = aggregate(&providers, Duration::from_secs(5)).await;

        let titles: Vec<_> = agg.candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles.len(), 3);
        for t in ["a1", "a22", "c333"] {
            assert!(titles.contains(&t), "missing {t}");
        }
        assert_eq!(agg.reports.len(), 3);
        assert_eq!(agg.failed_providers(), 1);
        let broken = agg.reports.iter().find(|r| r.provider == "Broken").unwrap();
        assert!(broken.error.as_deref().unwrap().contains("401"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_without_stalling_batch() {
        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(Stalled),
            Arc::new(Fixed("Fast", vec![cand("fast")])),
        ];
        let agg = aggregate(&providers, Duration::from_secs(2)).await;
        assert_eq!(agg.candidates.len(), 1);
        assert_eq!(agg.candidates[0].title, "fast");
        let stalled = agg.reports.iter().find(|r| r.provider == "Stalled").unwrap();
        assert_eq!(stalled.error.as_deref(), Some("timed out after 2s"));
    }

    #[tokio::test]
    async fn empty_provider_is_not_a_failure() {
        let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(Fixed("Empty", vec![]))];
        let agg = aggregate(&providers, Duration::from_secs(1)).await;
        assert!(agg.candidates.is_empty());
        assert_eq!(agg.failed_providers(), 0);
    }
}
