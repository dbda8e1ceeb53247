// src/news.rs
//! News item model: categories, title fingerprints and read-time estimates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sentinel URL meaning "no source link available".
/// Never compared against real URLs and never subject to uniqueness.
pub const NO_LINK_URL: &str = "#";

const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Geral,
    Obra,
    Licitacao,
    Governo,
    Impacto,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Geral,
        Category::Obra,
        Category::Licitacao,
        Category::Governo,
        Category::Impacto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Geral => "geral",
            Category::Obra => "obra",
            Category::Licitacao => "licitacao",
            Category::Governo => "governo",
            Category::Impacto => "impacto",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category `{s}`"))
    }
}

/// Normalized record produced by a provider, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub source: String,
    pub published_date: NaiveDate,
    #[serde(default)]
    pub summary: String,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Candidate {
    /// Lowercased `title + " " + summary`, the text every keyword check runs on.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.title, self.summary).to_lowercase()
    }

    pub fn has_link(&self) -> bool {
        self.url != NO_LINK_URL
    }
}

/// A candidate that passed every gate and was enriched for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNewsItem {
    pub candidate: Candidate,
    pub category: Category,
    pub read_time_minutes: u32,
}

/// Persisted news entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Uuid,
    pub title: String,
    pub title_fingerprint: String,
    pub url: String,
    pub source: String,
    pub published_date: NaiveDate,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category: Category,
    pub read_time_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl NewsItem {
    pub fn from_new(new: NewNewsItem, now: DateTime<Utc>) -> Self {
        let c = new.candidate;
        Self {
            id: Uuid::new_v4(),
            title_fingerprint: title_fingerprint(&c.title),
            title: c.title,
            url: c.url,
            source: c.source,
            published_date: c.published_date,
            summary: c.summary,
            image_url: c.image_url,
            category: new.category,
            read_time_minutes: new.read_time_minutes,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn has_link(&self) -> bool {
        self.url != NO_LINK_URL
    }
}

/// Hash of the title with case and all whitespace removed (hex SHA-256).
pub fn title_fingerprint(title: &str) -> String {
    use sha2::{Digest, Sha256};
    let normalized: String = title
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    let digest = Sha256::digest(normalized.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Reading time at 200 words per minute, never less than one minute.
pub fn estimate_read_time(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_case_and_whitespace() {
        let a = title_fingerprint("Túnel Santos-Guarujá inicia obras");
        let b = title_fingerprint("  TÚNEL   santos-guarujá\tINICIA obras ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn fingerprint_differs_on_words() {
        assert_ne!(
            title_fingerprint("Túnel Santos-Guarujá inicia obras"),
            title_fingerprint("Túnel Santos-Guarujá adia obras")
        );
    }

    #[test]
    fn read_time_rounds_up_and_has_floor() {
        assert_eq!(estimate_read_time(""), 1);
        assert_eq!(estimate_read_time("uma frase curta"), 1);
        assert_eq!(estimate_read_time(&"palavra ".repeat(200)), 1);
        assert_eq!(estimate_read_time(&"palavra ".repeat(201)), 2);
    }

    #[test]
    fn category_parses_and_serializes_lowercase() {
        assert_eq!("Licitacao".parse::<Category>().unwrap(), Category::Licitacao);
        assert!("sports".parse::<Category>().is_err());
        let json = serde_json::to_string(&Category::Impacto).unwrap();
        assert_eq!(json, "\"impacto\"");
    }
}
