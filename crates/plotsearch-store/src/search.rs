use anyhow::Result;
use arrow_array::{Array, Float32Array, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};

use plotsearch_core::traits::Embedder;
use plotsearch_core::types::{PlotMatch, SearchParams};

/// Embed the query text and return the top-`limit` stored vectors by
/// cosine similarity. Read-only; ranking is the store's. The index named
/// in `params` is provisioned externally; without it the store falls back
/// to a flat scan, which only changes latency, not the contract.
pub async fn semantic_search(
    conn: &Connection,
    movies_table: &str,
    embedder: &dyn Embedder,
    query_text: &str,
    params: &SearchParams,
) -> Result<Vec<PlotMatch>> {
    let query_vec = embedder.embed_batch(&[query_text.to_string()])?.remove(0);
    let table = conn.open_table(movies_table).execute().await?;

    let indices = table.list_indices().await?;
    if indices.iter().any(|ix| ix.name == params.index_name) {
        println!(
            "Performing semantic search (index '{}', breadth {})...",
            params.index_name, params.candidate_breadth
        );
    } else {
        println!(
            "Index '{}' not provisioned; searching with a flat scan (breadth {})...",
            params.index_name, params.candidate_breadth
        );
    }

    // Scan up to candidate_breadth neighbors, then keep the top limit.
    let mut stream = table
        .vector_search(query_vec)?
        .distance_type(DistanceType::Cosine)
        .only_if("plot_embedding IS NOT NULL")
        .limit(params.candidate_breadth)
        .execute()
        .await?;

    let mut matches = Vec::new();
    while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
        let id_col = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow::anyhow!("missing id"))?;
        let title_col = batch
            .column_by_name("title")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>());
        let plot_col = batch
            .column_by_name("plot")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>());
        for i in 0..batch.num_rows() {
            let score = if let Some(dist) = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            {
                1.0 - dist.value(i)
            } else {
                0.5
            };
            let string_at = |col: Option<&StringArray>| -> Option<String> {
                col.and_then(|c| if c.is_valid(i) { Some(c.value(i).to_string()) } else { None })
            };
            matches.push(PlotMatch {
                id: id_col.value(i).to_string(),
                title: string_at(title_col),
                plot: string_at(plot_col),
                score,
            });
        }
    }

    // The stream is already ranked; keep the order stable on ties.
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(params.limit);
    Ok(matches)
}
