// src/ingest/providers/rss.rs
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::ingest::normalize_article;
use crate::ingest::types::{RawArticle, SourceProvider};
use crate::news::Candidate;

const PROVIDER_NAME: &str = "RSS";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    enclosure: Option<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
}

/// RSS 2.0 feeds (state government portal, city halls, local press).
/// An empty feed list is a valid provider that yields nothing.
pub struct RssFeedProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        feeds: Vec<String>,
        client: reqwest::Client,
    },
}

impl RssFeedProvider {
    pub fn from_fixture(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_urls(client: reqwest::Client, feeds: Vec<String>) -> Self {
        Self {
            mode: Mode::Http { feeds, client },
        }
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<Candidate>, ProviderError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).map_err(|e| ProviderError::Parse(e.to_string()))?;

        let source = rss
            .channel
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(PROVIDER_NAME)
            .to_string();
        let today = chrono::Utc::now().date_naive();

        let out: Vec<Candidate> = rss
            .channel
            .item
            .into_iter()
            .filter_map(|it| {
                let image_url = it
                    .enclosure
                    .filter(|e| e.kind.as_deref().map_or(true, |k| k.starts_with("image/")))
                    .and_then(|e| e.url);
                let raw = RawArticle {
                    title: it.title,
                    source: Some(source.clone()),
                    published: it.pub_date,
                    summary: it.description,
                    url: it.link,
                    image_url,
                };
                normalize_article(raw, PROVIDER_NAME, today)
            })
            .collect();

        histogram!("news_rss_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssFeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>, ProviderError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),

            Mode::Http { feeds, client } => {
                let mut out = Vec::new();
                let mut first_err = None;
                for url in feeds {
                    let res = async {
                        let body = client.get(url).send().await?.text().await?;
                        Self::parse_items_from_str(&body)
                    }
                    .await;
                    match res {
                        Ok(mut items) => out.append(&mut items),
                        Err(e) => {
                            tracing::warn!(target: "ingest", error = %e, feed = %url, "rss feed error");
                            first_err.get_or_insert(e);
                        }
                    }
                }
                // only a failure when every configured feed failed
                match first_err {
                    Some(e) if out.is_empty() => Err(e),
                    _ => Ok(out),
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Governo de SP</title>
    <item>
      <title>Túnel Santos-Guarujá: contrato assinado</title>
      <link>https://www.saopaulo.sp.gov.br/noticias/tunel</link>
      <pubDate>Tue, 02 Sep 2025 14:00:00 +0000</pubDate>
      <description>&lt;p&gt;Obra&nbsp;começa em breve&lt;/p&gt;</description>
      <enclosure url="https://www.saopaulo.sp.gov.br/img/tunel.jpg" type="image/jpeg" length="1"/>
    </item>
    <item>
      <description>Sem título</description>
      <link>https://www.saopaulo.sp.gov.br/noticias/vazio</link>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn parses_feed_items() {
        let p = RssFeedProvider::from_fixture(XML);
        let items = p.fetch_latest().await.expect("parse");
        assert_eq!(items.len(), 1, "untitled item dropped");
        let it = &items[0];
        assert_eq!(it.source, "Governo de SP");
        assert_eq!(it.summary, "Obra começa em breve");
        assert_eq!(it.published_date.to_string(), "2025-09-02");
        assert_eq!(
            it.image_url.as_deref(),
            Some("https://www.saopaulo.sp.gov.br/img/tunel.jpg")
        );
    }

    #[tokio::test]
    async fn no_feeds_is_empty_not_error() {
        let p = RssFeedProvider::from_urls(reqwest::Client::new(), vec![]);
        assert!(p.fetch_latest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_xml_is_parse_error() {
        let p = RssFeedProvider::from_fixture("<rss><nochannel/></rss>");
        assert!(matches!(
            p.fetch_latest().await,
            Err(ProviderError::Parse(_))
        ));
    }
}
