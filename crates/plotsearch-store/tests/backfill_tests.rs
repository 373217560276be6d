use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use arrow_array::cast::AsArray;
use arrow_array::{Array, FixedSizeListArray, StringArray};
use lancedb::query::ExecutableQuery;
use lancedb::Connection;

use plotsearch_core::traits::Embedder;
use plotsearch_core::types::MovieDoc;
use plotsearch_embed::FakeEmbedder;
use plotsearch_store::backfill::backfill_plot_embeddings;
use plotsearch_store::schema::EMBEDDING_DIM;
use plotsearch_store::table::{append_movies, movie_counts, open_db};

/// Fake embedder that counts provider calls, to prove the second
/// backfill run performs none for already-embedded rows.
struct CountingEmbedder {
    inner: FakeEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self { inner: FakeEmbedder::new(EMBEDDING_DIM as usize), calls: AtomicUsize::new(0) }
    }
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }
    fn max_len(&self) -> usize {
        self.inner.max_len()
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

async fn read_embeddings(conn: &Connection, table: &str) -> anyhow::Result<HashMap<String, Option<Vec<f32>>>> {
    let t = conn.open_table(table).execute().await?;
    let mut out = HashMap::new();
    let mut stream = t.query().execute().await?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        let ids = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .expect("id col");
        let vecs = batch
            .column_by_name("plot_embedding")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .expect("plot_embedding col");
        for i in 0..batch.num_rows() {
            let v = if vecs.is_valid(i) {
                let inner = vecs.value(i);
                Some(inner.as_primitive::<arrow_array::types::Float32Type>().values().to_vec())
            } else {
                None
            };
            out.insert(ids.value(i).to_string(), v);
        }
    }
    Ok(out)
}

#[tokio::test]
async fn backfill_is_idempotent_and_skips_plotless_rows() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let conn = open_db(&tmp.path().to_string_lossy()).await?;
    let table = "movies";
    let docs = vec![
        MovieDoc::new("1", Some("War of the Worlds"), Some("Aliens invade Earth")),
        MovieDoc::new("2", Some("Heat"), Some("A thief plans one last score")),
        MovieDoc::new("3", Some("Untitled"), Some("A quiet coastal town keeps a secret")),
        MovieDoc::new("4", Some("No plot yet"), None),
    ];
    append_movies(&conn, table, &docs).await?;

    let embedder = CountingEmbedder::new();
    let processed = backfill_plot_embeddings(&conn, table, &embedder, 50).await?;
    assert_eq!(processed, 3, "only rows with a plot field are candidates");
    assert_eq!(embedder.calls(), 3);

    let first = read_embeddings(&conn, table).await?;
    for id in ["1", "2", "3"] {
        let v = first[id].as_ref().expect("embedded");
        assert_eq!(v.len(), EMBEDDING_DIM as usize, "embedding-length invariant");
    }
    assert!(first["4"].is_none(), "plotless row never selected");

    // Second run on unchanged data: no provider calls, vectors identical.
    let processed = backfill_plot_embeddings(&conn, table, &embedder, 50).await?;
    assert_eq!(processed, 0);
    assert_eq!(embedder.calls(), 3, "no additional embedding calls on rerun");
    let second = read_embeddings(&conn, table).await?;
    for id in ["1", "2", "3"] {
        assert_eq!(first[id], second[id], "embedding unchanged by rerun");
    }
    Ok(())
}

#[tokio::test]
async fn cap_bounds_the_candidate_set() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let conn = open_db(&tmp.path().to_string_lossy()).await?;
    let table = "movies";
    let docs: Vec<MovieDoc> = (0..10)
        .map(|i| {
            let plot = format!("plot number {i}");
            MovieDoc::new(format!("m{i}"), None, Some(plot.as_str()))
        })
        .collect();
    append_movies(&conn, table, &docs).await?;

    let embedder = FakeEmbedder::new(EMBEDDING_DIM as usize);
    let processed = backfill_plot_embeddings(&conn, table, &embedder, 4).await?;
    assert_eq!(processed, 4, "exactly cap-many rows visited in one run");
    let (total, embedded) = movie_counts(&conn, table).await?;
    assert_eq!(total, 10);
    assert_eq!(embedded, 4, "rows beyond the cap untouched");
    Ok(())
}

#[tokio::test]
async fn empty_but_present_plot_is_eligible() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let conn = open_db(&tmp.path().to_string_lossy()).await?;
    let table = "movies";
    let docs = vec![MovieDoc::new("e1", Some("Blank"), Some(""))];
    append_movies(&conn, table, &docs).await?;

    let embedder = FakeEmbedder::new(EMBEDDING_DIM as usize);
    let processed = backfill_plot_embeddings(&conn, table, &embedder, 50).await?;
    assert_eq!(processed, 1, "presence check, not non-empty check");
    let (_, embedded) = movie_counts(&conn, table).await?;
    assert_eq!(embedded, 1);
    Ok(())
}
