// src/store/index.rs
//! In-memory primary map plus secondary indexes shared by every store backend.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::news::{Category, NewNewsItem, NewsItem};
use crate::store::{DuplicateKey, InsertOutcome};

/// Date index key: newest date first when iterated in reverse, then newest insert.
type DateKey = (NaiveDate, DateTime<Utc>, Uuid);

#[derive(Debug, Default)]
pub struct NewsIndex {
    items: HashMap<Uuid, NewsItem>,
    by_url: HashMap<String, Uuid>,
    by_fingerprint: HashMap<String, Uuid>,
    by_date: BTreeSet<DateKey>,
    by_category: HashMap<Category, HashSet<Uuid>>,
    by_source: HashMap<String, HashSet<Uuid>>,
}

fn date_key(item: &NewsItem) -> DateKey {
    (item.published_date, item.created_at, item.id)
}

fn lower_bound(date: NaiveDate) -> DateKey {
    (date, DateTime::<Utc>::MIN_UTC, Uuid::nil())
}

impl NewsIndex {
    /// Rebuild from persisted rows. Rows violating a uniqueness constraint are dropped.
    pub fn from_items(items: Vec<NewsItem>) -> (Self, usize) {
        let mut idx = Self::default();
        let mut dropped = 0usize;
        for item in items {
            if idx.conflict(&item).is_some() {
                dropped += 1;
                continue;
            }
            idx.put(item);
        }
        (idx, dropped)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn conflict(&self, item: &NewsItem) -> Option<DuplicateKey> {
        if item.has_link() && self.by_url.contains_key(&item.url) {
            return Some(DuplicateKey::Url);
        }
        if self.by_fingerprint.contains_key(&item.title_fingerprint) {
            return Some(DuplicateKey::Fingerprint);
        }
        None
    }

    fn put(&mut self, item: NewsItem) {
        let id = item.id;
        if item.has_link() {
            self.by_url.insert(item.url.clone(), id);
        }
        self.by_fingerprint
            .insert(item.title_fingerprint.clone(), id);
        self.by_date.insert(date_key(&item));
        self.by_category.entry(item.category).or_default().insert(id);
        self.by_source
            .entry(item.source.clone())
            .or_default()
            .insert(id);
        self.items.insert(id, item);
    }

    pub fn insert(&mut self, new: NewNewsItem, now: DateTime<Utc>) -> InsertOutcome {
        let item = NewsItem::from_new(new, now);
        if let Some(key) = self.conflict(&item) {
            return InsertOutcome::Duplicate(key);
        }
        let id = item.id;
        self.put(item);
        InsertOutcome::Inserted(id)
    }

    /// Re-insert a previously removed row (rollback path).
    pub fn restore(&mut self, item: NewsItem) {
        if self.conflict(&item).is_none() {
            self.put(item);
        }
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<NewsItem> {
        let item = self.items.remove(id)?;
        if item.has_link() && self.by_url.get(&item.url) == Some(id) {
            self.by_url.remove(&item.url);
        }
        self.by_fingerprint.remove(&item.title_fingerprint);
        self.by_date.remove(&date_key(&item));
        if let Some(set) = self.by_category.get_mut(&item.category) {
            set.remove(id);
        }
        if let Some(set) = self.by_source.get_mut(&item.source) {
            set.remove(id);
            if set.is_empty() {
                self.by_source.remove(&item.source);
            }
        }
        Some(item)
    }

    /// The sentinel URL never "exists".
    pub fn contains_url(&self, url: &str) -> bool {
        url != crate::news::NO_LINK_URL && self.by_url.contains_key(url)
    }

    pub fn get(&self, id: &Uuid) -> Option<&NewsItem> {
        self.items.get(id)
    }

    /// Up to `limit` items, newest `published_date` first.
    pub fn newest(&self, limit: usize) -> Vec<NewsItem> {
        self.by_date
            .iter()
            .rev()
            .take(limit)
            .filter_map(|(_, _, id)| self.items.get(id).cloned())
            .collect()
    }

    /// Category lookup through the category index, sorted by date afterwards.
    pub fn in_category(&self, category: Category, limit: usize) -> Vec<NewsItem> {
        let Some(ids) = self.by_category.get(&category) else {
            return Vec::new();
        };
        let mut out: Vec<NewsItem> = ids.iter().filter_map(|id| self.items.get(id).cloned()).collect();
        out.sort_by(|a, b| date_key(b).cmp(&date_key(a)));
        out.truncate(limit);
        out
    }

    /// Items with `published_date >= since`, newest first.
    pub fn since(&self, since: NaiveDate) -> Vec<NewsItem> {
        self.by_date
            .range(lower_bound(since)..)
            .rev()
            .filter_map(|(_, _, id)| self.items.get(id).cloned())
            .collect()
    }

    /// Remove every item with `published_date < cutoff`; returns the removed rows.
    pub fn purge_before(&mut self, cutoff: NaiveDate) -> Vec<NewsItem> {
        let doomed: Vec<Uuid> = self
            .by_date
            .range(..lower_bound(cutoff))
            .map(|(_, _, id)| *id)
            .collect();
        doomed.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Drop everything, returning the old rows.
    pub fn clear(&mut self) -> Vec<NewsItem> {
        let old = std::mem::take(self);
        old.items.into_values().collect()
    }

    pub fn source_counts(&self) -> BTreeMap<String, usize> {
        self.by_source
            .iter()
            .map(|(s, ids)| (s.clone(), ids.len()))
            .collect()
    }

    /// All rows, newest first (persistence order).
    pub fn snapshot(&self) -> Vec<NewsItem> {
        self.newest(usize::MAX)
    }
}
