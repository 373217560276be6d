pub mod backfill;
pub mod schema;
pub mod search;
pub mod table;

pub use backfill::backfill_plot_embeddings;
pub use search::semantic_search;
