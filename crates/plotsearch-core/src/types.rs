//! Domain types shared by the store and the CLI.

use serde::{Deserialize, Serialize};

pub type MovieId = String;

/// Substituted when a search hit lacks `title` or `plot`. Display-layer
/// fallback only; stored rows keep their nulls.
pub const MISSING_FIELD: &str = "N/A";

/// A movie row as stored in the movies table.
///
/// - `id`: opaque, unique, stable identifier
/// - `title`/`plot`: optional text fields
/// - `plot_embedding`: fixed-length vector, `None` until backfilled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDoc {
    pub id: MovieId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub plot_embedding: Option<Vec<f32>>,
}

impl MovieDoc {
    pub fn new(id: impl Into<MovieId>, title: Option<&str>, plot: Option<&str>) -> Self {
        Self {
            id: id.into(),
            title: title.map(str::to_string),
            plot: plot.map(str::to_string),
            plot_embedding: None,
        }
    }
}

/// Knobs for the semantic search. `candidate_breadth` is how many
/// approximate-nearest-neighbor candidates the store scans before the
/// final top-`limit` cut. `index_name` must match the index provisioned
/// by the external admin tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub limit: usize,
    pub candidate_breadth: usize,
    pub index_name: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: 4,
            candidate_breadth: 100,
            index_name: "plot_semantic_idx".to_string(),
        }
    }
}

/// One ranked search hit. `score` is store-defined; higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotMatch {
    pub id: MovieId,
    pub title: Option<String>,
    pub plot: Option<String>,
    pub score: f32,
}

impl PlotMatch {
    pub fn title_display(&self) -> &str {
        self.title.as_deref().unwrap_or(MISSING_FIELD)
    }

    pub fn plot_display(&self) -> &str {
        self.plot.as_deref().unwrap_or(MISSING_FIELD)
    }
}
