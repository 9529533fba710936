//! `run` and `clean` command handlers.

use crate::context::ServiceContext;
use crate::recipe::{RecipeKey, RecipeManager};

/// Runs a recipe and prints its result as pretty JSON.
///
/// # Errors
///
/// Returns an error if the recipe name is unknown, a dataset fetch fails,
/// or the transform fails.
pub fn run_recipe(ctx: &ServiceContext, recipe: &str, object: Option<&str>) -> Result<(), String> {
    let key = RecipeKey::parse(recipe, object)?;
    let manager = RecipeManager::new(ctx)?;
    let result = super::runtime()?.block_on(manager.run(&key))?;
    let rendered = serde_json::to_string_pretty(&result)
        .map_err(|e| format!("Failed to render recipe result: {e}"))?;
    println!("{rendered}");
    Ok(())
}

/// Invalidates a recipe's cached datasets.
///
/// # Errors
///
/// Returns an error if the recipe name is unknown or the cache cannot be
/// modified.
pub fn clean_recipe(
    ctx: &ServiceContext,
    recipe: &str,
    object: Option<&str>,
) -> Result<(), String> {
    let key = RecipeKey::parse(recipe, object)?;
    let manager = RecipeManager::new(ctx)?;
    super::runtime()?.block_on(manager.clean(&key))?;
    println!("Cleaned cached datasets for {recipe}");
    Ok(())
}
