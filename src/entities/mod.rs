pub mod prelude;

pub mod favourites;
pub mod files;
pub mod orphaned_blobs;
