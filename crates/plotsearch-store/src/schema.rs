use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// all-MiniLM-L6-v2 output dimensionality; must match the provisioned
/// vector index.
pub const EMBEDDING_DIM: i32 = 384;

/// Full movies-table schema. `title` and `plot` are optional source
/// fields; `plot_embedding` stays null until backfilled.
pub fn build_movies_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("plot", DataType::Utf8, true),
        Field::new(
            "plot_embedding",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), EMBEDDING_DIM),
            true,
        ),
    ]))
}

/// Source schema for the backfill merge-insert: only `(id, plot_embedding)`
/// so every other stored column passes through unmodified.
pub fn build_embedding_update_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "plot_embedding",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), EMBEDDING_DIM),
            true,
        ),
    ]))
}
