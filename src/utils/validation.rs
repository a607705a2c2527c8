// Validation utilities
use crate::db::models::{Ingredient, Step};
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Validate an email address shape
pub fn validate_email(email: &str) -> Result<()> {
    if email.len() > 254 || !email_regex().is_match(email) {
        return Err(Error::Validation(format!("Invalid email address: {email}")));
    }
    Ok(())
}

/// Validate recipe title length (in characters, after trimming)
pub fn validate_title(title: &str) -> Result<()> {
    let len = title.trim().chars().count();

    if len == 0 {
        return Err(Error::Validation("Recipe title is required".to_string()));
    }
    if len < TITLE_MIN_CHARS {
        return Err(Error::Validation(format!(
            "Recipe title must be at least {TITLE_MIN_CHARS} characters"
        )));
    }
    if len > TITLE_MAX_CHARS {
        return Err(Error::Validation(format!(
            "Recipe title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }

    Ok(())
}

/// Every ingredient needs a name, a unit and a positive amount
pub fn validate_ingredients(ingredients: &[Ingredient]) -> Result<()> {
    if ingredients.is_empty() {
        return Err(Error::Validation(
            "Add at least one ingredient".to_string(),
        ));
    }

    for (i, ingredient) in ingredients.iter().enumerate() {
        let position = i + 1;
        if ingredient.name.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Ingredient #{position} needs a name"
            )));
        }
        if ingredient.unit.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Ingredient #{position} needs a unit"
            )));
        }
        if !(ingredient.count.is_finite() && ingredient.count > 0.0) {
            return Err(Error::Validation(format!(
                "Ingredient #{position} needs a positive amount"
            )));
        }
    }

    Ok(())
}

/// Every step needs an instruction
pub fn validate_steps(steps: &[Step]) -> Result<()> {
    if steps.is_empty() {
        return Err(Error::Validation("Add at least one step".to_string()));
    }

    for (i, step) in steps.iter().enumerate() {
        if step.instruction.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Step #{} needs an instruction",
                i + 1
            )));
        }
    }

    Ok(())
}

/// Return the lowercase extension of `filename` if it is in the allow-list
pub fn validate_extension(filename: &str, allowed: &BTreeSet<String>) -> Result<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .ok_or_else(|| Error::Validation(format!("File has no extension: {filename}")))?;

    if !allowed.contains(&extension) {
        warn!("Rejected upload with extension '{}'", extension);
        return Err(Error::Validation(format!(
            "File type .{extension} is not allowed"
        )));
    }

    Ok(extension)
}
