use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, TEXT};

/// Schema for recipe search index
#[derive(Clone)]
pub struct RecipeSchema {
    pub schema: Schema,
    pub id: Field,
    pub title: Field,
    pub ingredients: Field,
    pub instructions: Field,
    pub photo_url: Field,
}

impl RecipeSchema {
    pub fn new() -> Self {
        let mut schema_builder = Schema::builder();

        // Recipe ID (stored, indexed for delete-by-term)
        let id = schema_builder.add_i64_field("id", INDEXED | STORED | FAST);

        let title = schema_builder.add_text_field("title", TEXT | STORED);

        // Ingredient names, one value per ingredient
        let ingredients = schema_builder.add_text_field("ingredients", TEXT | STORED);

        let instructions = schema_builder.add_text_field("instructions", TEXT);

        // Returned with hits, never searched
        let photo_url = schema_builder.add_text_field("photo_url", STORED);

        let schema = schema_builder.build();

        Self {
            schema,
            id,
            title,
            ingredients,
            instructions,
            photo_url,
        }
    }
}

impl Default for RecipeSchema {
    fn default() -> Self {
        Self::new()
    }
}
