// tests/relevance_keywords.rs
// Hand-picked headlines against the shipped keyword file, plus the
// NEWS_KEYWORDS_PATH resolution. Env-mutating tests are serialized.

use std::env;

use tunnel_news_pipeline::news::{Candidate, Category};
use tunnel_news_pipeline::relevance::{
    KeywordConfig, Rejection, RelevanceFilter, Strategy, ENV_KEYWORDS_PATH,
};

const SHIPPED: &str = include_str!("../config/keywords.toml");

fn cand(title: &str, summary: &str) -> Candidate {
    Candidate {
        title: title.into(),
        source: "Teste".into(),
        published_date: chrono::NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
        summary: summary.into(),
        url: "https://example.test/x".into(),
        image_url: None,
    }
}

fn shipped_filter(strategy: Strategy) -> RelevanceFilter {
    let kw = KeywordConfig::from_toml_str(SHIPPED).expect("shipped keywords parse");
    RelevanceFilter::new(kw, strategy)
}

#[test]
fn shipped_file_matches_built_in_behaviour() {
    let from_file = shipped_filter(Strategy::TwoOfThree);
    let built_in = RelevanceFilter::default();
    let samples = [
        cand("Túnel Santos-Guarujá recebe licença ambiental", ""),
        cand("Porto de Santos amplia terminal", "Nova área de armazenagem."),
        cand("Ligação seca: obras avançam", "Travessia entre Santos e Guarujá."),
        cand("Prefeitura de Santos anuncia asfalto", "Obra em avenida."),
        cand("Receita de feijoada", "Domingo em família."),
    ];
    for c in &samples {
        assert_eq!(
            from_file.admit(c).is_ok(),
            built_in.admit(c).is_ok(),
            "{}",
            c.title
        );
        assert_eq!(from_file.categorize(c), built_in.categorize(c), "{}", c.title);
    }
}

#[test]
fn handpicked_headlines() {
    let f = shipped_filter(Strategy::TwoOfThree);

    let ok = cand(
        "Túnel imerso Santos-Guarujá: primeiro módulo chega ao canal",
        "Estrutura pré-moldada foi rebocada pelo estuário.",
    );
    assert!(f.admit(&ok).is_ok());
    assert_eq!(f.categorize(&ok), Category::Obra);

    let unaccented = cand("Tunel entre Santos e Guaruja tem leilao marcado", "");
    assert!(f.admit(&unaccented).is_ok());

    // relevant by strategy, but no tunnel word for the guard
    let ferry = cand("Travessia Santos-Guarujá terá novas balsas", "Transporte reforçado.");
    assert!(f.check_relevance(&ferry).is_ok());
    assert!(matches!(
        f.admit(&ferry),
        Err(Rejection::GuardFailed { has_tunnel: false, .. })
    ));

    // tunnel elsewhere
    let other = cand("Túnel da Mantiqueira terá obras de manutenção", "Rodovia interditada.");
    assert!(matches!(
        f.admit(&other),
        Err(Rejection::GuardFailed { has_both_cities: false, .. })
    ));
}

#[test]
fn legacy_strategy_blocks_politics() {
    let f = shipped_filter(Strategy::LocationAnchored);
    let c = cand(
        "Bolsonaro comenta túnel Santos-Guarujá",
        "Declaração durante evento.",
    );
    assert!(matches!(f.admit(&c), Err(Rejection::Blocked { .. })));
    // canonical strategy keeps it unless the blocklist is switched on
    assert!(shipped_filter(Strategy::TwoOfThree).admit(&c).is_ok());
    assert!(shipped_filter(Strategy::TwoOfThree)
        .with_blocklist(true)
        .admit(&c)
        .is_err());
}

#[serial_test::serial]
#[test]
fn load_default_prefers_env_path() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("kw.toml");
    std::fs::write(
        &path,
        r#"
[groups]
tunnel = ["TÚNEL"]
location = ["Santos"]
infrastructure = ["obra"]
"#,
    )
    .unwrap();

    env::set_var(ENV_KEYWORDS_PATH, &path);
    let kw = KeywordConfig::load_default().expect("env path loads");
    assert_eq!(kw.groups.tunnel, vec!["túnel".to_string()]);
    // unspecified sections keep their defaults
    assert!(!kw.blocklist.is_empty());

    env::set_var(ENV_KEYWORDS_PATH, tmp.path().join("missing.toml"));
    assert!(KeywordConfig::load_default().is_err());

    env::remove_var(ENV_KEYWORDS_PATH);
}
