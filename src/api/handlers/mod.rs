pub mod favourites;
pub mod files;
pub mod health;
