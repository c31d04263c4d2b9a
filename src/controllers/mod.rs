pub mod favorites;
pub mod health;
pub mod narration;

pub use favorites::FavoritesController;
pub use narration::NarrationController;
