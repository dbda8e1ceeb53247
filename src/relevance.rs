// src/relevance.rs
//! Relevance gate: keyword groups, interchangeable relevance strategies,
//! blocklist, the strict ingestion guard and the category classifier.
//!
//! All checks run on the lowercased `title + " " + summary` and use plain
//! substring matching, so accented and unaccented spellings are listed
//! separately in the keyword sets.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;

use crate::news::{Candidate, Category};

// --- env defaults & names ---
pub const DEFAULT_KEYWORDS_PATH: &str = "config/keywords.toml";
pub const ENV_KEYWORDS_PATH: &str = "NEWS_KEYWORDS_PATH";

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    #[serde(default)]
    pub groups: KeywordGroups,
    #[serde(default = "default_blocklist")]
    pub blocklist: Vec<String>,
    #[serde(default)]
    pub guard: GuardTerms,
    #[serde(default = "default_category_rules")]
    pub categories: Vec<CategoryRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordGroups {
    pub tunnel: Vec<String>,
    pub location: Vec<String>,
    pub infrastructure: Vec<String>,
    /// Extra infrastructure terms counted only by the location-anchored strategy.
    #[serde(default = "default_legacy_infrastructure")]
    pub legacy_infrastructure: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardTerms {
    pub tunnel: Vec<String>,
    pub first_city: Vec<String>,
    pub second_city: Vec<String>,
    pub combined: Vec<String>,
}

/// Ordered rule: the first rule with a matching term decides the category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub terms: Vec<String>,
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn default_legacy_infrastructure() -> Vec<String> {
    strings(&["projeto", "investimento", "ppp", "desenvolvimento", "urbano"])
}

impl Default for KeywordGroups {
    fn default() -> Self {
        Self {
            tunnel: strings(&["túnel", "tunel", "travessia", "ligação", "submerso", "imerso"]),
            location: strings(&["santos", "guarujá", "guaruja", "porto", "baixada santista"]),
            infrastructure: strings(&[
                "obra",
                "construção",
                "infraestrutura",
                "mobilidade",
                "transporte",
                "concessão",
                "licitação",
            ]),
            legacy_infrastructure: default_legacy_infrastructure(),
        }
    }
}

impl Default for GuardTerms {
    fn default() -> Self {
        Self {
            tunnel: strings(&["túnel", "tunel"]),
            first_city: strings(&["santos"]),
            second_city: strings(&["guarujá", "guaruja"]),
            combined: strings(&["santos-guarujá", "santos guarujá", "santos-guaruja"]),
        }
    }
}

fn default_blocklist() -> Vec<String> {
    strings(&[
        "lula",
        "stf",
        "trump",
        "bolsonaro",
        "eleição",
        "eleições",
        "futebol",
        "flamengo",
        "corinthians",
        "palmeiras",
        "bbb",
        "reality",
        "fofoca",
        "celebridade",
    ])
}

fn default_category_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            category: Category::Licitacao,
            terms: strings(&["licitação", "leilão", "edital", "concorrência", "contrato"]),
        },
        CategoryRule {
            category: Category::Obra,
            terms: strings(&[
                "obra",
                "construção",
                "engenharia",
                "imerso",
                "canteiro",
                "escavação",
            ]),
        },
        CategoryRule {
            category: Category::Governo,
            terms: strings(&[
                "governo",
                "secretaria",
                "ministério",
                "estado",
                "prefeitura",
                "federal",
            ]),
        },
        CategoryRule {
            category: Category::Impacto,
            terms: strings(&[
                "impacto",
                "benefício",
                "emprego",
                "economia",
                "mobilidade",
                "trânsito",
                "tráfego",
            ]),
        },
    ]
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            groups: KeywordGroups::default(),
            blocklist: default_blocklist(),
            guard: GuardTerms::default(),
            categories: default_category_rules(),
        }
    }
}

impl KeywordConfig {
    /// Parse a TOML document; missing sections fall back to built-in defaults.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let cfg: KeywordConfig = toml::from_str(s)?;
        Ok(cfg.normalized())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keywords from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing keywords from {}", path.display()))
    }

    /// Resolution order:
    /// 1) $NEWS_KEYWORDS_PATH (must exist)
    /// 2) config/keywords.toml
    /// 3) built-in defaults
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_KEYWORDS_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("{ENV_KEYWORDS_PATH} points to non-existent path");
            }
            return Self::load_from(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_KEYWORDS_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    /// Lowercase and trim every term, dropping empties.
    fn normalized(mut self) -> Self {
        fn clean(v: &mut Vec<String>) {
            *v = v
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
        }
        clean(&mut self.groups.tunnel);
        clean(&mut self.groups.location);
        clean(&mut self.groups.infrastructure);
        clean(&mut self.groups.legacy_infrastructure);
        clean(&mut self.blocklist);
        clean(&mut self.guard.tunnel);
        clean(&mut self.guard.first_city);
        clean(&mut self.guard.second_city);
        clean(&mut self.guard.combined);
        for rule in &mut self.categories {
            clean(&mut rule.terms);
        }
        self
    }
}

fn any_term<'a>(text: &str, terms: &'a [String]) -> Option<&'a str> {
    terms.iter().map(String::as_str).find(|t| text.contains(t))
}

/* ----------------------------
Strategies
---------------------------- */

/// Which keyword groups matched a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupHits {
    pub tunnel: bool,
    pub location: bool,
    pub infrastructure: bool,
}

impl GroupHits {
    pub fn scan(groups: &KeywordGroups, text: &str) -> Self {
        Self {
            tunnel: any_term(text, &groups.tunnel).is_some(),
            location: any_term(text, &groups.location).is_some(),
            infrastructure: any_term(text, &groups.infrastructure).is_some(),
        }
    }

    pub fn count(&self) -> usize {
        [self.tunnel, self.location, self.infrastructure]
            .iter()
            .filter(|b| **b)
            .count()
    }
}

/// Boolean policy over group hits.
pub trait RelevanceClassifier: Send + Sync {
    fn name(&self) -> &'static str;
    fn accepts(&self, hits: GroupHits) -> bool;
}

/// At least two of the three groups. Canonical policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoOfThree;

impl RelevanceClassifier for TwoOfThree {
    fn name(&self) -> &'static str {
        "two_of_three"
    }

    fn accepts(&self, hits: GroupHits) -> bool {
        hits.count() >= 2
    }
}

/// `(tunnel AND location) OR (location AND infrastructure)`.
/// Legacy policy from the browser-side pipeline; the location group is mandatory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationAnchored;

impl RelevanceClassifier for LocationAnchored {
    fn name(&self) -> &'static str {
        "location_anchored"
    }

    fn accepts(&self, hits: GroupHits) -> bool {
        (hits.tunnel && hits.location) || (hits.location && hits.infrastructure)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    TwoOfThree,
    LocationAnchored,
}

impl Strategy {
    pub fn classifier(self) -> Box<dyn RelevanceClassifier> {
        match self {
            Strategy::TwoOfThree => Box::new(TwoOfThree),
            Strategy::LocationAnchored => Box::new(LocationAnchored),
        }
    }

    /// The legacy strategy always ran together with the blocklist.
    pub fn blocklist_by_default(self) -> bool {
        matches!(self, Strategy::LocationAnchored)
    }

    /// Whether `legacy_infrastructure` terms count as infrastructure hits.
    pub fn wide_infrastructure(self) -> bool {
        matches!(self, Strategy::LocationAnchored)
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "two_of_three" | "strict" => Ok(Strategy::TwoOfThree),
            "location_anchored" | "permissive" | "legacy" => Ok(Strategy::LocationAnchored),
            other => anyhow::bail!("unknown relevance strategy `{other}`"),
        }
    }
}

/* ----------------------------
Filter
---------------------------- */

/// Why a candidate was not persisted. A normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Blocked { term: String },
    NotRelevant { hits: GroupHits },
    GuardFailed { has_tunnel: bool, has_both_cities: bool },
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::Blocked { .. } => "blocked",
            Rejection::NotRelevant { .. } => "not_relevant",
            Rejection::GuardFailed { .. } => "guard_failed",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Blocked { term } => write!(f, "blocklisted term `{term}`"),
            Rejection::NotRelevant { hits } => write!(
                f,
                "not relevant (tunnel={}, location={}, infrastructure={})",
                hits.tunnel, hits.location, hits.infrastructure
            ),
            Rejection::GuardFailed {
                has_tunnel,
                has_both_cities,
            } => write!(
                f,
                "missing required keywords (tunnel={has_tunnel}, santos_guaruja={has_both_cities})"
            ),
        }
    }
}

pub struct RelevanceFilter {
    keywords: KeywordConfig,
    classifier: Box<dyn RelevanceClassifier>,
    blocklist_enabled: bool,
    wide_infrastructure: bool,
}

impl fmt::Debug for RelevanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelevanceFilter")
            .field("strategy", &self.classifier.name())
            .field("blocklist_enabled", &self.blocklist_enabled)
            .finish()
    }
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(KeywordConfig::default(), Strategy::default())
    }
}

impl RelevanceFilter {
    pub fn new(keywords: KeywordConfig, strategy: Strategy) -> Self {
        Self {
            keywords,
            classifier: strategy.classifier(),
            blocklist_enabled: strategy.blocklist_by_default(),
            wide_infrastructure: strategy.wide_infrastructure(),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn RelevanceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_blocklist(mut self, enabled: bool) -> Self {
        self.blocklist_enabled = enabled;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Blocklist (when enabled) then the configured strategy.
    pub fn check_relevance(&self, candidate: &Candidate) -> Result<(), Rejection> {
        self.check_text(&candidate.haystack())
    }

    fn check_text(&self, text: &str) -> Result<(), Rejection> {
        if self.blocklist_enabled {
            if let Some(term) = any_term(text, &self.keywords.blocklist) {
                return Err(Rejection::Blocked {
                    term: term.to_string(),
                });
            }
        }
        let mut hits = GroupHits::scan(&self.keywords.groups, text);
        if self.wide_infrastructure && !hits.infrastructure {
            hits.infrastructure =
                any_term(text, &self.keywords.groups.legacy_infrastructure).is_some();
        }
        if self.classifier.accepts(hits) {
            Ok(())
        } else {
            Err(Rejection::NotRelevant { hits })
        }
    }

    /// Final gate before persistence: a tunnel term AND both city names
    /// (or one of the combined forms).
    pub fn ingestion_guard(&self, candidate: &Candidate) -> Result<(), Rejection> {
        self.guard_text(&candidate.haystack())
    }

    fn guard_text(&self, text: &str) -> Result<(), Rejection> {
        let g = &self.keywords.guard;
        let has_tunnel = any_term(text, &g.tunnel).is_some();
        let has_both_cities = any_term(text, &g.combined).is_some()
            || (any_term(text, &g.first_city).is_some()
                && any_term(text, &g.second_city).is_some());
        if has_tunnel && has_both_cities {
            Ok(())
        } else {
            Err(Rejection::GuardFailed {
                has_tunnel,
                has_both_cities,
            })
        }
    }

    /// Relevance then guard, on one lowercased haystack.
    pub fn admit(&self, candidate: &Candidate) -> Result<(), Rejection> {
        let text = candidate.haystack();
        self.check_text(&text)?;
        self.guard_text(&text)
    }

    pub fn categorize(&self, candidate: &Candidate) -> Category {
        let text = candidate.haystack();
        self.keywords
            .categories
            .iter()
            .find(|rule| any_term(&text, &rule.terms).is_some())
            .map(|rule| rule.category)
            .unwrap_or(Category::Geral)
    }
}

/* ----------------------------
Tests
---------------------------- */
