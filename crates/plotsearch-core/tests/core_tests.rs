use plotsearch_core::config::{expand_path, resolve_with_base, Config};
use plotsearch_core::types::{MovieDoc, PlotMatch, SearchParams, MISSING_FIELD};
use std::path::Path;

#[test]
fn connection_string_requires_config_or_env() {
    // Sequenced in one test: the env var is process-global, so the
    // missing-key assertion must run before the override is set.

    // No config.toml in this crate's cwd and no APP_DATA__LANCEDB_URI yet.
    let config = Config::load().expect("load");
    let err = config
        .require::<String>("data.lancedb_uri")
        .expect_err("must fail without a connection string");
    let msg = format!("{err}");
    assert!(msg.contains("data.lancedb_uri"), "message names the key: {msg}");
    assert!(msg.contains("APP_DATA__LANCEDB_URI"), "message names the env var: {msg}");

    // The env spelling from the error message reaches the nested key.
    std::env::set_var("APP_DATA__LANCEDB_URI", "/tmp/plotsearch/lancedb");
    let config = Config::load().expect("load with env");
    let uri: String = config.require("data.lancedb_uri").expect("env override satisfies require");
    assert_eq!(uri, "/tmp/plotsearch/lancedb");
    let via_get: String = config.get("data.lancedb_uri").expect("get sees it too");
    assert_eq!(via_get, uri);
    std::env::remove_var("APP_DATA__LANCEDB_URI");
}

#[test]
fn optional_settings_fall_back_to_defaults() {
    let config = Config::load().expect("load");
    let table: String = config.get("data.movies_table").unwrap_or_else(|_| "movies".to_string());
    assert_eq!(table, "movies");
    let params = SearchParams::default();
    assert_eq!(params.limit, 4);
    assert_eq!(params.candidate_breadth, 100);
    assert_eq!(params.index_name, "plot_semantic_idx");
}

#[test]
fn missing_fields_get_display_placeholders() {
    let hit = PlotMatch { id: "m1".to_string(), title: None, plot: None, score: 0.9 };
    assert_eq!(hit.title_display(), MISSING_FIELD);
    assert_eq!(hit.plot_display(), MISSING_FIELD);

    let hit = PlotMatch {
        id: "m2".to_string(),
        title: Some("Alien".to_string()),
        plot: Some("A crew encounters something.".to_string()),
        score: 0.5,
    };
    assert_eq!(hit.title_display(), "Alien");
    assert_eq!(hit.plot_display(), "A crew encounters something.");
}

#[test]
fn movie_doc_deserializes_seed_json() {
    let json = r#"[
        {"id": "1", "title": "Star Wars", "plot": "Aliens invade Earth"},
        {"id": "2", "plot": ""},
        {"id": "3", "title": "Silent"}
    ]"#;
    let docs: Vec<MovieDoc> = serde_json::from_str(json).expect("parse");
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].title.as_deref(), Some("Star Wars"));
    assert!(docs[0].plot_embedding.is_none());
    // Present-but-empty plot stays present; the backfill filter checks
    // existence, not non-emptiness.
    assert_eq!(docs[1].plot.as_deref(), Some(""));
    assert!(docs[2].plot.is_none());
}

#[test]
fn path_helpers_expand_and_resolve() {
    std::env::set_var("PLOTSEARCH_TEST_DIR", "/tmp/plotsearch");
    let p = expand_path("${PLOTSEARCH_TEST_DIR}/db");
    assert_eq!(p, Path::new("/tmp/plotsearch/db"));
    let rel = resolve_with_base(Path::new("/base"), "data/db");
    assert_eq!(rel, Path::new("/base/data/db"));
    let abs = resolve_with_base(Path::new("/base"), "/abs/db");
    assert_eq!(abs, Path::new("/abs/db"));
}
