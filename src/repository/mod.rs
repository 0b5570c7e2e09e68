//! Storage access for recipes and users.

mod recipes;
mod users;

pub use recipes::RecipeRepository;
pub use users::UserRepository;
