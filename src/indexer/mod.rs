// Recipe full-text indexing with Tantivy

pub mod schema;
pub mod search;

// Re-exports
pub use schema::RecipeSchema;
pub use search::{SearchIndex, SearchQuery, SearchResult, SearchResults};
