//! Idempotent embedding backfill for movie plots.
//!
//! Selection is presence-driven: `plot IS NOT NULL`, capped. Rows with an
//! existing embedding are skipped in the loop, mirroring the guard on the
//! read side rather than the filter, so the cap counts visited candidates.

use anyhow::{anyhow, Result};
use arrow_array::{Array, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Connection;
use std::sync::Arc;

use plotsearch_core::traits::Embedder;

use crate::schema::{build_embedding_update_schema, EMBEDDING_DIM};

pub async fn backfill_plot_embeddings(
    conn: &Connection,
    movies_table: &str,
    embedder: &dyn Embedder,
    cap: usize,
) -> Result<usize> {
    let t = conn.open_table(movies_table).execute().await?;

    // Candidate selection: rows whose plot field is present, in store
    // default order, bounded by the cap. Presence only; an empty string
    // still qualifies.
    let mut candidates: Vec<(String, String)> = Vec::new();
    let mut stream = t.query().only_if("plot IS NOT NULL").limit(cap).execute().await?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        let id_col = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow!("missing id"))?;
        let plot_col = batch
            .column_by_name("plot")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow!("missing plot"))?;
        let emb_col = batch
            .column_by_name("plot_embedding")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());
        for i in 0..batch.num_rows() {
            // Idempotence guard: a row that already carries an embedding
            // is never re-embedded, even if its plot changed since.
            let already = emb_col.map(|c| c.is_valid(i)).unwrap_or(false);
            if already {
                continue;
            }
            candidates.push((id_col.value(i).to_string(), plot_col.value(i).to_string()));
        }
    }
    if candidates.is_empty() {
        println!("No plots need embedding in '{}'", movies_table);
        return Ok(0);
    }

    println!("Generating embeddings for {} movie plots...", candidates.len());
    let pb = ProgressBar::new(candidates.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} plots ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    // One embed call per document, fail-fast: the first provider or
    // store error aborts the run, keeping whatever earlier iterations
    // already persisted.
    let mut ids = Vec::new();
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
    for (id, plot) in &candidates {
        let mut out = embedder.embed_batch(std::slice::from_ref(plot))?;
        let v = out.remove(0);
        if v.len() != EMBEDDING_DIM as usize {
            return Err(anyhow!("dim mismatch: got {} expected {}", v.len(), EMBEDDING_DIM));
        }
        ids.push(id.clone());
        vectors.push(Some(v.into_iter().map(Some).collect()));
        pb.inc(1);
    }
    pb.finish_with_message("embeddings computed");

    // Point replacement keyed by id. The source batch carries only
    // (id, plot_embedding), so every other stored field is untouched.
    let schema = build_embedding_update_schema();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                vectors.into_iter(),
                EMBEDDING_DIM,
            )),
        ],
    )?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    let mut mi = t.merge_insert(&["id"]);
    mi.when_matched_update_all(None);
    mi.execute(reader).await?;

    println!("All embeddings generated and stored!");
    Ok(candidates.len())
}
