use crate::db::{self, models::Recipe, DbPool};
use crate::error::{Error, Result};
use crate::indexer::schema::RecipeSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{Query, QueryParser};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use tracing::{debug, info, warn};

const WRITER_HEAP_BYTES: usize = 50_000_000;
const REBUILD_BATCH_SIZE: i64 = 200;

pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    // Serialises writes; the writer itself only lives for one commit
    write_lock: Mutex<()>,
    schema: RecipeSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub recipe_id: i64,
    pub title: String,
    pub ingredients: Vec<String>,
    pub photo_url: Option<String>,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl SearchIndex {
    /// Create or open search index
    pub fn new(index_path: impl AsRef<Path>) -> Result<Self> {
        let path = index_path.as_ref();
        let schema = RecipeSchema::new();

        std::fs::create_dir_all(path)?;

        let index = if path.join("meta.json").exists() {
            Index::open_in_dir(path)
                .map_err(|e| Error::Search(format!("Failed to open index: {e}")))?
        } else {
            Index::create_in_dir(path, schema.schema.clone())
                .map_err(|e| Error::Search(format!("Failed to create index: {e}")))?
        };

        // Reloaded explicitly after each commit so writes are visible to the next search
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::Search(format!("Failed to create reader: {e}")))?;

        info!("Search index initialized at {:?}", path);

        Ok(Self {
            index,
            reader,
            write_lock: Mutex::new(()),
            schema,
        })
    }

    /// Run `write` against a fresh writer and commit. The writer, and with it the
    /// directory lockfile, is released before returning.
    fn with_writer<F>(&self, write: F) -> Result<()>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Internal("Search index write lock poisoned".to_string()))?;

        let mut writer: IndexWriter = self
            .index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|e| Error::Search(format!("Failed to create writer: {e}")))?;

        write(&mut writer)?;

        writer
            .commit()
            .map_err(|e| Error::Search(format!("Failed to commit: {e}")))?;
        writer
            .wait_merging_threads()
            .map_err(|e| Error::Search(format!("Failed to finish merges: {e}")))?;

        self.reader
            .reload()
            .map_err(|e| Error::Search(format!("Failed to reload reader: {e}")))?;
        Ok(())
    }

    fn add_document(&self, writer: &mut IndexWriter, recipe: &Recipe) -> Result<()> {
        let mut doc = doc!(
            self.schema.id => recipe.id,
            self.schema.title => recipe.title.clone(),
        );

        for ingredient in recipe.ingredients.iter() {
            doc.add_text(self.schema.ingredients, &ingredient.name);
        }

        for step in recipe.instructions.iter() {
            doc.add_text(self.schema.instructions, &step.instruction);
        }

        if let Some(photo_url) = &recipe.photo_url {
            doc.add_text(self.schema.photo_url, photo_url);
        }

        writer.add_document(doc)?;
        Ok(())
    }

    /// Index a recipe, replacing any previous version of it
    pub fn index_recipe(&self, recipe: &Recipe) -> Result<()> {
        debug!("Indexing recipe: {}", recipe.id);

        self.with_writer(|writer| {
            writer.delete_term(Term::from_field_i64(self.schema.id, recipe.id));
            self.add_document(writer, recipe)
        })
    }

    /// Delete a recipe from the index
    pub fn delete_recipe(&self, recipe_id: i64) -> Result<()> {
        debug!("Removing recipe from index: {}", recipe_id);

        self.with_writer(|writer| {
            writer.delete_term(Term::from_field_i64(self.schema.id, recipe_id));
            Ok(())
        })
    }

    /// Drop every document and index all recipes from the database again
    pub async fn rebuild(&self, pool: &DbPool) -> Result<usize> {
        let mut recipes = Vec::new();
        let mut last_id = 0;

        loop {
            let batch = db::recipes::list_recipes_after(pool, last_id, REBUILD_BATCH_SIZE).await?;
            let Some(last) = batch.last() else {
                break;
            };
            last_id = last.id;
            recipes.extend(batch);
        }

        self.with_writer(|writer| {
            writer.delete_all_documents()?;
            for recipe in &recipes {
                self.add_document(writer, recipe)?;
            }
            Ok(())
        })?;

        info!("Search index rebuilt with {} recipes", recipes.len());
        Ok(recipes.len())
    }

    /// Number of searchable documents
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Free text search over titles, ingredients and instructions.
    /// Titles weigh double and title/ingredient terms tolerate one typo.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        let searcher = self.reader.searcher();

        let mut query_parser = QueryParser::for_index(
            &self.index,
            vec![
                self.schema.title,
                self.schema.ingredients,
                self.schema.instructions,
            ],
        );
        query_parser.set_field_boost(self.schema.title, 2.0);
        query_parser.set_field_fuzzy(self.schema.title, true, 1, true);
        query_parser.set_field_fuzzy(self.schema.ingredients, true, 1, true);

        let tantivy_query = if query.q.trim().is_empty() {
            Box::new(tantivy::query::AllQuery) as Box<dyn Query>
        } else {
            let (parsed, errors) = query_parser.parse_query_lenient(&query.q);
            if !errors.is_empty() {
                warn!("Query '{}' parsed leniently: {:?}", query.q, errors);
            }
            parsed
        };

        let limit = query.limit.max(1);
        let offset = query.page.saturating_sub(1) * limit;

        let (top_docs, total) = searcher
            .search(
                &*tantivy_query,
                &(TopDocs::with_limit(limit + offset), Count),
            )
            .map_err(|e| Error::Search(format!("Search failed: {e}")))?;

        let results: Vec<SearchResult> = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc = searcher.doc::<tantivy::TantivyDocument>(doc_address).ok()?;

                let recipe_id = match doc.get_first(self.schema.id)? {
                    tantivy::schema::OwnedValue::I64(id) => *id,
                    _ => return None,
                };

                let title = match doc.get_first(self.schema.title)? {
                    tantivy::schema::OwnedValue::Str(s) => s.to_string(),
                    _ => return None,
                };

                let ingredients = doc
                    .get_all(self.schema.ingredients)
                    .filter_map(|v| match v {
                        tantivy::schema::OwnedValue::Str(s) => Some(s.to_string()),
                        _ => None,
                    })
                    .collect();

                let photo_url = doc.get_first(self.schema.photo_url).and_then(|v| match v {
                    tantivy::schema::OwnedValue::Str(s) => Some(s.to_string()),
                    _ => None,
                });

                Some(SearchResult {
                    recipe_id,
                    title,
                    ingredients,
                    photo_url,
                    score,
                })
            })
            .collect();

        Ok(SearchResults {
            results,
            total,
            page: query.page,
            total_pages: total.div_ceil(limit),
        })
    }
}
