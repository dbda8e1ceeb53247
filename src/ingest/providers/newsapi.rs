// src/ingest/providers/newsapi.rs
//! NewsAPI.org `/v2/everything` provider.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::ingest::normalize_article;
use crate::ingest::types::{RawArticle, SourceProvider};
use crate::news::Candidate;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";
const PROVIDER_NAME: &str = "NewsAPI";
const PAGE_SIZE: u32 = 20;
const CONTENT_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    source: Option<SourceRef>,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceRef {
    name: Option<String>,
}

impl From<Article> for RawArticle {
    fn from(a: Article) -> Self {
        let summary = a
            .description
            .filter(|d| !d.trim().is_empty())
            .or_else(|| {
                a.content
                    .map(|c| c.chars().take(CONTENT_SNIPPET_CHARS).collect())
            });
        RawArticle {
            title: a.title,
            source: a.source.and_then(|s| s.name),
            published: a.published_at,
            summary,
            url: a.url,
            image_url: a.url_to_image,
        }
    }
}

/// Quoted phrases joined with OR, e.g. `"A" OR "B"`.
pub fn build_query(phrases: &[String]) -> String {
    phrases
        .iter()
        .map(|p| format!("\"{}\"", p.trim_matches('"')))
        .collect::<Vec<_>>()
        .join(" OR ")
}

pub struct NewsApiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    query: String,
}

impl NewsApiProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        phrases: &[String],
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            query: build_query(phrases),
        }
    }

    fn parse_body(body: &str) -> Result<Vec<Candidate>, ProviderError> {
        let env: Envelope =
            serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        if env.status != "ok" {
            return Err(ProviderError::Api {
                status: 200,
                message: format!(
                    "{}: {}",
                    env.code.unwrap_or_default(),
                    env.message.unwrap_or_default()
                ),
            });
        }
        let today = chrono::Utc::now().date_naive();
        Ok(env
            .articles
            .into_iter()
            .filter_map(|a| normalize_article(a.into(), PROVIDER_NAME, today))
            .collect())
    }
}

#[async_trait]
impl SourceProvider for NewsApiProvider {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>, ProviderError> {
        let Some(key) = &self.api_key else {
            tracing::warn!(target: "ingest", provider = PROVIDER_NAME, "api key not configured, skipping");
            return Ok(Vec::new());
        };

        let url = format!("{}/everything", self.base_url.trim_end_matches('/'));
        let page_size = PAGE_SIZE.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("q", self.query.as_str()),
                ("language", "pt"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }
        Self::parse_body(&body)
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_quotes_each_phrase() {
        let q = build_query(&["Túnel Santos-Guarujá".into(), "\"Túnel Imerso\"".into()]);
        assert_eq!(q, r#""Túnel Santos-Guarujá" OR "Túnel Imerso""#);
    }

    #[test]
    fn parses_articles_and_falls_back_to_content() {
        let body = r#"{
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {
                    "source": {"id": null, "name": "A Tribuna"},
                    "title": "Túnel Santos-Guarujá tem nova etapa",
                    "description": null,
                    "content": "Conteúdo completo da matéria sobre o túnel",
                    "url": "https://atribuna.example/tunel",
                    "urlToImage": null,
                    "publishedAt": "2025-09-02T10:00:00Z"
                },
                {
                    "source": {"id": null, "name": "G1"},
                    "title": null,
                    "url": "https://g1.example/x",
                    "publishedAt": "2025-09-02T10:00:00Z"
                }
            ]
        }"#;
        let items = NewsApiProvider::parse_body(body).expect("parse");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "A Tribuna");
        assert_eq!(items[0].summary, "Conteúdo completo da matéria sobre o túnel");
        assert_eq!(items[0].published_date.to_string(), "2025-09-02");
    }

    #[test]
    fn error_status_maps_to_api_error() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"bad key"}"#;
        let err = NewsApiProvider::parse_body(body).unwrap_err();
        assert!(err.to_string().contains("apiKeyInvalid"));
    }
}
