//! LanceDB connection and movies-table housekeeping.
//!
//! Provides the database open function, ensure/append helpers, and row
//! counts for the status binary. Documents are only ever created through
//! the seeding path; the backfill updates rows in place.

use anyhow::Result;
use lancedb::{connect, Connection};

use arrow_array::{Array, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::query::ExecutableQuery;
use std::sync::Arc;

use plotsearch_core::types::MovieDoc;

use crate::schema::{build_movies_schema, EMBEDDING_DIM};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn ensure_movies_table(conn: &Connection, name: &str) -> Result<()> {
    let names = conn.table_names().execute().await?;
    if names.contains(&name.to_string()) {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), build_movies_schema());
    conn.create_table(name, Box::new(iter)).execute().await?;
    Ok(())
}

/// Append movies, creating the table on first use. Seeding path for the
/// CLI and tests; the procedures themselves never create documents.
pub async fn append_movies(conn: &Connection, name: &str, docs: &[MovieDoc]) -> Result<()> {
    if docs.is_empty() {
        return Ok(());
    }
    let batch = movies_to_record_batch(docs)?;
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    if conn.table_names().execute().await?.contains(&name.to_string()) {
        conn.open_table(name).execute().await?.add(reader).execute().await?;
    } else {
        conn.create_table(name, reader).execute().await?;
    }
    Ok(())
}

pub fn movies_to_record_batch(docs: &[MovieDoc]) -> Result<RecordBatch> {
    let schema = build_movies_schema();
    let mut ids = Vec::new();
    let mut titles: Vec<Option<String>> = Vec::new();
    let mut plots: Vec<Option<String>> = Vec::new();
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
    for doc in docs {
        ids.push(doc.id.clone());
        titles.push(doc.title.clone());
        plots.push(doc.plot.clone());
        vectors.push(doc.plot_embedding.as_ref().map(|v| v.iter().map(|&x| Some(x)).collect()));
    }
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(plots)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                vectors.into_iter(),
                EMBEDDING_DIM,
            )),
        ],
    )?;
    Ok(batch)
}

/// `(total rows, rows with a non-null plot_embedding)`.
pub async fn movie_counts(conn: &Connection, name: &str) -> Result<(usize, usize)> {
    let t = conn.open_table(name).execute().await?;
    let mut total = 0usize;
    let mut embedded = 0usize;
    let mut stream = t.query().execute().await?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        total += batch.num_rows();
        if let Some(col) = batch.column_by_name("plot_embedding") {
            if let Some(fsl) = col.as_any().downcast_ref::<FixedSizeListArray>() {
                for i in 0..batch.num_rows() {
                    if fsl.is_valid(i) {
                        embedded += 1;
                    }
                }
            }
        }
    }
    Ok((total, embedded))
}
