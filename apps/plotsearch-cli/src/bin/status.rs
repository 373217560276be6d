use plotsearch_core::config::{expand_path, Config};
use plotsearch_store::table::{movie_counts, open_db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let uri: String = config.require("data.lancedb_uri")?;
    let table: String = config.get("data.movies_table").unwrap_or_else(|_| "movies".to_string());

    let conn = open_db(&expand_path(&uri).to_string_lossy()).await?;
    let (total, embedded) = movie_counts(&conn, &table).await?;
    println!("{}: total={} with_plot_embedding={}", table, total, embedded);
    Ok(())
}
