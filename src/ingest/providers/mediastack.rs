// src/ingest/providers/mediastack.rs
//! MediaStack `/v1/news` search provider.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::ingest::normalize_article;
use crate::ingest::types::{RawArticle, SourceProvider};
use crate::news::Candidate;

pub const DEFAULT_BASE_URL: &str = "https://api.mediastack.com/v1";
const PROVIDER_NAME: &str = "MediaStack";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Vec<Article>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    image: Option<String>,
    published_at: Option<String>,
    source: Option<String>,
    // carried by the API but unused downstream
    #[allow(dead_code)]
    author: Option<String>,
    #[allow(dead_code)]
    category: Option<String>,
}

impl From<Article> for RawArticle {
    fn from(a: Article) -> Self {
        RawArticle {
            title: a.title,
            source: a.source,
            published: a.published_at,
            summary: a.description,
            url: a.url,
            image_url: a.image,
        }
    }
}

/// Query parameters sent with every request (besides `access_key`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStackQuery {
    pub keywords: String,
    pub countries: String,
    pub languages: String,
    pub limit: u32,
    pub sort: String,
}

impl MediaStackQuery {
    /// OR-query over the canonical search phrases, Brazilian Portuguese press.
    pub fn for_phrases(phrases: &[String]) -> Self {
        Self {
            keywords: phrases.join(" OR "),
            countries: "br".into(),
            languages: "pt".into(),
            limit: 100,
            sort: "published_desc".into(),
        }
    }

    fn pairs(&self, access_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("access_key", access_key.to_string()),
            ("keywords", self.keywords.clone()),
            ("countries", self.countries.clone()),
            ("languages", self.languages.clone()),
            ("limit", self.limit.to_string()),
            ("sort", self.sort.clone()),
        ]
    }
}

pub struct MediaStackProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        base_url: String,
        access_key: Option<String>,
        query: MediaStackQuery,
    },
}

impl MediaStackProvider {
    /// Serve a canned JSON body (tests, offline demos).
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_api(
        client: reqwest::Client,
        base_url: impl Into<String>,
        access_key: Option<String>,
        query: MediaStackQuery,
    ) -> Self {
        Self {
            mode: Mode::Http {
                client,
                base_url: base_url.into(),
                access_key: access_key.filter(|k| !k.trim().is_empty()),
                query,
            },
        }
    }

    fn parse_body(body: &str) -> Result<Vec<Candidate>, ProviderError> {
        let env: Envelope =
            serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(err) = env.error {
            return Err(ProviderError::Api {
                status: 200,
                message: format!(
                    "{}: {}",
                    err.code.unwrap_or_default(),
                    err.message.unwrap_or_default()
                ),
            });
        }

        let today = chrono::Utc::now().date_naive();
        let out: Vec<Candidate> = env
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| normalize_article(a.into(), PROVIDER_NAME, today))
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for MediaStackProvider {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>, ProviderError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_body(s),

            Mode::Http {
                client,
                base_url,
                access_key,
                query,
            } => {
                let Some(key) = access_key else {
                    tracing::warn!(target: "ingest", provider = PROVIDER_NAME, "api key not configured, skipping");
                    return Ok(Vec::new());
                };

                let url = format!("{}/news", base_url.trim_end_matches('/'));
                let resp = client.get(&url).query(&query.pairs(key)).send().await?;
                let status = resp.status();
                let body = resp.text().await?;

                if !status.is_success() {
                    return Err(ProviderError::Api {
                        status: status.as_u16(),
                        message: body.chars().take(200).collect(),
                    });
                }
                let items = Self::parse_body(&body)?;
                tracing::info!(target: "ingest", provider = PROVIDER_NAME, count = items.len(), "articles fetched");
                Ok(items)
            }
        }
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
