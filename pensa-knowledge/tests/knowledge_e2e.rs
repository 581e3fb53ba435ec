//! End-to-end tests for the knowledge engine over a static site directory.
//!
//! Each fixture writes the knowledge JSON files into a temp dir and points the
//! engine at it, so fetching goes through `FsFetcher` exactly as it would for
//! a local site build.

use std::path::Path;

use tempfile::TempDir;

use pensa_core::Settings;
use pensa_knowledge::{KnowledgeEngine, KnowledgeError, KnowledgeSettings, SourceStatus};

// -- Fixture -----------------------------------------------------------------

const LEGACY_TIER2: &str = r#"[
    {"id": 1, "content": "Tier 2 contributions are 5%"}
]"#;

const SCHEMES_TIER3: &str = r#"[
    {
        "id": 1,
        "category": "schemes",
        "title": "Tier 3",
        "content": "Tier 3 is voluntary",
        "keywords": ["voluntary", "tier3"],
        "createdAt": "2024-05-01T09:00:00Z"
    }
]"#;

const COMPANY_INFO: &str = r#"[
    {"id": 1, "category": "company", "title": "About us",
     "content": "We are a licensed corporate trustee administering pension schemes",
     "keywords": ["trustee", "licensed"], "createdAt": "2023-06-01T00:00:00Z"},
    {"id": 2, "category": "company", "title": "Leadership",
     "content": "Our board oversees every scheme we administer",
     "keywords": ["board"], "createdAt": "2023-07-01T00:00:00Z"}
]"#;

const PENSION_SCHEMES: &str = r#"[
    {"id": 1, "category": "schemes", "title": "Tier 2 occupational scheme",
     "content": "Tier 2 is a mandatory occupational pension scheme managed privately",
     "keywords": ["tier2", "mandatory"], "route": "/pension-schemes/tier-2",
     "createdAt": "2024-02-01T00:00:00Z"},
    {"id": 2, "category": "schemes", "title": "Tier 3 provident fund",
     "content": "Tier 3 is a voluntary provident fund and personal pension scheme",
     "keywords": ["tier3", "voluntary"], "route": "/pension-schemes/tier-3",
     "updatedAt": "2024-03-01T00:00:00Z"}
]"#;

const FAQS: &str = r#"[
    {"id": 1, "category": "faq", "title": "Withdrawals",
     "content": "Members can withdraw Tier 2 benefits at retirement",
     "keywords": ["withdrawal", "tier2"], "createdAt": "2024-01-15T00:00:00Z"},
    {"id": 2, "category": "faq", "content": "missing its title but still valid"},
    {"title": "no id and no content"}
]"#;

struct SiteFixture {
    settings: KnowledgeSettings,
    temp: TempDir,
}

impl SiteFixture {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pensa_knowledge=debug,warn")
            .with_test_writer()
            .try_init();

        let temp = TempDir::new().expect("tempdir");
        let settings = KnowledgeSettings {
            base_url: temp.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        Self { settings, temp }
    }

    fn write(&self, location: &str, body: &str) {
        write_file(self.temp.path(), location, body);
    }

    fn engine(&self) -> KnowledgeEngine {
        KnowledgeEngine::new(self.settings.clone()).expect("engine")
    }
}

fn write_file(root: &Path, location: &str, body: &str) {
    let path = root.join(location.trim_start_matches('/'));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dirs");
    }
    std::fs::write(path, body).expect("write fixture");
}

/// The full default source table, with one malformed and one missing file.
fn full_site() -> SiteFixture {
    let site = SiteFixture::new();
    site.write("/knowledge-base.json", LEGACY_TIER2);
    site.write("/knowledge/company-info.json", COMPANY_INFO);
    site.write("/knowledge/pension-schemes.json", PENSION_SCHEMES);
    site.write("/knowledge/services.json", "[{\"id\": 1, \"content\": ");
    site.write("/knowledge/faqs.json", FAQS);
    site
}

fn ids(items: &[pensa_knowledge::KnowledgeItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

// -- Tests -------------------------------------------------------------------

#[tokio::test]
async fn test_tier3_query_prefers_double_keyword_match() {
    let mut site = SiteFixture::new();
    site.settings.sources = vec![pensa_knowledge::KnowledgeSourceSpec::new(
        "Pension Schemes",
        "/knowledge/pension-schemes.json",
        "",
    )];
    site.write("/knowledge-base.json", LEGACY_TIER2);
    site.write("/knowledge/pension-schemes.json", SCHEMES_TIER3);
    let engine = site.engine();

    let results = engine
        .query("tier3 voluntary contributions", 1)
        .await
        .expect("query");

    assert_eq!(engine.len(), 2);
    assert_eq!(ids(engine.items()), vec!["existing_1", "new_1"]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "new_1");
    assert_eq!(results[0].title.as_deref(), Some("Tier 3"));
}

#[tokio::test]
async fn test_bad_sources_are_skipped() {
    let site = full_site();
    let engine = site.engine();

    engine.initialize().await.expect("initialize");

    let report = engine.load_report().expect("report");
    assert_eq!(report.sources.len(), 5);
    let failed: Vec<&str> = report.failures().map(|o| o.name.as_str()).collect();
    assert_eq!(failed, vec!["Services", "Contact"]);
    assert_eq!(
        report.sources[3].status,
        SourceStatus::Loaded {
            items: 2,
            skipped: 1
        }
    );

    // Legacy first, then new items newest first with undated last.
    assert_eq!(
        ids(engine.items()),
        vec![
            "existing_1",
            "new_pension_schemes_2",
            "new_pension_schemes_1",
            "new_faqs_1",
            "new_company_info_2",
            "new_company_info_1",
            "new_faqs_2",
        ]
    );
}

#[tokio::test]
async fn test_repeated_query_is_served_from_cache() {
    let site = full_site();
    let engine = site.engine();

    let first = engine.query("pension schemes", 5).await.expect("query");
    let second = engine.query("pension schemes", 5).await.expect("query");

    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
    assert_eq!(engine.cache_len().await, 1);

    engine.query("Pension Schemes ", 3).await.expect("query");
    assert_eq!(engine.cache_len().await, 2);
}

#[tokio::test]
async fn test_empty_query_is_harmless() {
    let site = full_site();
    let engine = site.engine();

    let results = engine.query("", 3).await.expect("query");
    assert_eq!(ids(&results), ids(&engine.items()[..3]));

    let whitespace = engine.query("   ", 3).await.expect("query");
    assert_eq!(results, whitespace);
}

#[tokio::test]
async fn test_explain_matches_query_order() {
    let site = full_site();
    let engine = site.engine();

    let results = engine.query("tier2 withdrawal", 3).await.expect("query");
    let explained = engine.explain("tier2 withdrawal", 3).await.expect("explain");

    assert_eq!(
        ids(&results),
        explained.iter().map(|s| s.item.id.as_str()).collect::<Vec<_>>()
    );
    assert_eq!(results[0].id, "new_faqs_1");
    for scored in &explained {
        assert!((scored.semantic + scored.keyword_boost - scored.score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_total_failure_then_recovery() {
    let site = SiteFixture::new();
    let engine = site.engine();

    let err = engine.initialize().await.expect_err("nothing to load");
    match err {
        KnowledgeError::InitFailed { legacy, sources } => {
            assert!(legacy.contains("knowledge-base.json"));
            assert!(sources.contains("FAQs"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!engine.is_initialized());

    site.write("/knowledge/faqs.json", FAQS);
    let results = engine.query("withdrawal", 1).await.expect("retry");

    assert!(engine.is_initialized());
    assert_eq!(results[0].id, "new_1");
    assert!(engine.load_report().expect("report").legacy.as_ref().expect("legacy").is_failed());
}

#[tokio::test]
async fn test_engine_from_toml_settings() {
    let site = full_site();
    let toml = format!(
        r#"
[knowledge]
base_url = "file://{}"
legacy_path = ""
parallel_fetch = true
default_limit = 2

[[knowledge.sources]]
name = "FAQs"
path = "/knowledge/faqs.json"
"#,
        site.temp.path().display()
    );
    let settings = Settings::from_toml(&toml).expect("parse settings");
    let engine = KnowledgeEngine::new(settings.knowledge_settings()).expect("engine");

    let results = engine.query_default("withdrawal").await.expect("query");

    assert_eq!(results.len(), 2);
    assert_eq!(engine.len(), 2);
    assert!(engine.load_report().expect("report").legacy.is_none());
    assert_eq!(ids(engine.items()), vec!["new_1", "new_2"]);
}
