pub mod image;
pub mod recipe;

pub use image::{CacheStats, CachedImage, ImageEncoding, ProgressiveImage};
pub use recipe::{recipe_image_key, step_image_key, RecipeStep, RecipeSummary};
