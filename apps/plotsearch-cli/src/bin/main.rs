use std::env;
use std::path::PathBuf;

use plotsearch_core::config::{expand_path, Config};
use plotsearch_core::types::{MovieDoc, SearchParams};
use plotsearch_embed::get_default_embedder;
use plotsearch_store::table::{append_movies, ensure_movies_table, open_db};
use plotsearch_store::{backfill_plot_embeddings, semantic_search};

const DEFAULT_QUERY: &str = "imaginary characters from outer space at war";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <run|seed> [args...]", prog);
        eprintln!("  run  [query]       backfill plot embeddings, then search (default query if omitted)");
        eprintln!("  seed <movies.json> load movie documents from a JSON array");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    // Hard startup failure before any connection attempt.
    let uri: String = config.require("data.lancedb_uri")?;
    let db_path = expand_path(&uri);
    let table: String = config.get("data.movies_table").unwrap_or_else(|_| "movies".to_string());

    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "run" => {
            let query = args.first().cloned().unwrap_or_else(|| DEFAULT_QUERY.to_string());
            let embedder = get_default_embedder()?;
            let conn = open_db(&db_path.to_string_lossy()).await?;

            let cap: usize = config.get("backfill.cap").unwrap_or(50);
            let n = backfill_plot_embeddings(&conn, &table, embedder.as_ref(), cap).await?;
            println!("Backfilled {} plot embeddings into '{}'", n, table);

            let defaults = SearchParams::default();
            let params = SearchParams {
                limit: config.get("search.limit").unwrap_or(defaults.limit),
                candidate_breadth: config
                    .get("search.candidate_breadth")
                    .unwrap_or(defaults.candidate_breadth),
                index_name: config.get("search.index_name").unwrap_or(defaults.index_name),
            };
            let hits = semantic_search(&conn, &table, embedder.as_ref(), &query, &params).await?;
            println!("\n🔍 Found {} results for: \"{}\"", hits.len(), query);
            for hit in &hits {
                println!("Movie Name: {}", hit.title_display());
                println!("Movie Plot: {}\n", hit.plot_display());
            }
        }
        "seed" => {
            let file = args.first().map(PathBuf::from).unwrap_or_else(|| {
                eprintln!("Usage: plotsearch seed <movies.json>");
                std::process::exit(1)
            });
            let raw = std::fs::read_to_string(&file)?;
            let docs: Vec<MovieDoc> = serde_json::from_str(&raw)?;
            let conn = open_db(&db_path.to_string_lossy()).await?;
            ensure_movies_table(&conn, &table).await?;
            append_movies(&conn, &table, &docs).await?;
            println!("Seeded {} movies into '{}' from {}", docs.len(), table, file.display());
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
