// tests/store_contract.rs
//
// Same behavioural contract checked against both store backends.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use tunnel_news_pipeline::news::{Candidate, Category, NewNewsItem, NewsItem, NO_LINK_URL};
use tunnel_news_pipeline::store::{
    DuplicateKey, InsertOutcome, JsonFileStore, MemoryStore, MemoryWatermark, NewsStore,
    Watermark,
};

fn item(title: &str, url: &str, published: NaiveDate, category: Category) -> NewNewsItem {
    NewNewsItem {
        candidate: Candidate {
            title: title.into(),
            source: "A Tribuna".into(),
            published_date: published,
            summary: "Texto curto sobre o túnel.".into(),
            url: url.into(),
            image_url: None,
        },
        category,
        read_time_minutes: 1,
    }
}

fn days_ago(n: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(n)
}

async fn check_contract(store: &dyn NewsStore, wm: &dyn Watermark) {
    // insert idempotence
    let first = store
        .insert(item("Túnel: edital publicado", "https://a.test/edital", days_ago(1), Category::Licitacao))
        .await
        .unwrap();
    let InsertOutcome::Inserted(id) = first else {
        panic!("first insert should succeed, got {first:?}");
    };
    let again = store
        .insert(item("Túnel: edital publicado", "https://a.test/edital", days_ago(1), Category::Licitacao))
        .await
        .unwrap();
    assert_eq!(again, InsertOutcome::Duplicate(DuplicateKey::Url));

    // fingerprint stability across case/spacing
    let variant = store
        .insert(item(" TÚNEL:   edital  PUBLICADO ", "https://b.test/outro", days_ago(1), Category::Geral))
        .await
        .unwrap();
    assert_eq!(variant, InsertOutcome::Duplicate(DuplicateKey::Fingerprint));

    // sentinel exempt
    for t in ["Nota sem link 1", "Nota sem link 2"] {
        let out = store
            .insert(item(t, NO_LINK_URL, days_ago(2), Category::Geral))
            .await
            .unwrap();
        assert!(matches!(out, InsertOutcome::Inserted(_)), "{t}: {out:?}");
    }
    assert!(!store.exists(NO_LINK_URL).await.unwrap());
    assert!(store.exists("https://a.test/edital").await.unwrap());
    assert!(!store.exists("https://a.test/nope").await.unwrap());

    // pruning boundary
    store
        .insert(item("Exatamente 30 dias", "https://a.test/30", days_ago(30), Category::Obra))
        .await
        .unwrap();
    store
        .insert(item("Trinta e um dias", "https://a.test/31", days_ago(31), Category::Obra))
        .await
        .unwrap();
    assert_eq!(store.query_all(100).await.unwrap().len(), 5);

    let purged = store.purge_older_than(days_ago(30)).await.unwrap();
    assert_eq!(purged, 1);
    assert!(store.exists("https://a.test/30").await.unwrap());
    assert!(!store.exists("https://a.test/31").await.unwrap());

    // ordering and filters
    let all = store.query_all(100).await.unwrap();
    let dates: Vec<NaiveDate> = all.iter().map(|i| i.published_date).collect();
    let mut sorted = dates.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted, "newest first");
    assert_eq!(all[0].id, id);
    assert_eq!(all[0].created_at, all[0].last_updated);

    let obra = store.query_by_category(Category::Obra, 10).await.unwrap();
    assert_eq!(obra.len(), 1);
    assert_eq!(store.query_recent(days_ago(2)).await.unwrap().len(), 3);
    assert_eq!(store.query_all(2).await.unwrap().len(), 2);

    // export
    let exported: Vec<NewsItem> =
        serde_json::from_str(&store.export_json(3).await.unwrap()).unwrap();
    assert_eq!(exported.len(), 3);

    // stats and clear_all resetting the watermark
    wm.set(Utc::now()).await.unwrap();
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_news, 4);
    assert!(stats.last_update.is_some());

    store.clear_all().await.unwrap();
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_news, 0);
    assert_eq!(stats.last_update, None);
    assert!(store.query_all(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn memory_store_contract() {
    let wm = Arc::new(MemoryWatermark::new());
    let store = MemoryStore::new(wm.clone());
    check_contract(&store, wm.as_ref()).await;
}

#[tokio::test]
async fn json_file_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let wm = Arc::new(MemoryWatermark::new());
    let store = JsonFileStore::open(dir.path(), wm.clone()).await.unwrap();
    check_contract(&store, wm.as_ref()).await;

    // the emptied state is what a restart sees
    let reopened = JsonFileStore::open(dir.path(), wm).await.unwrap();
    assert_eq!(reopened.stats().await.unwrap().total_news, 0);
}
