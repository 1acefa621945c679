pub use super::favourites::Entity as Favourites;
pub use super::files::Entity as Files;
pub use super::orphaned_blobs::Entity as OrphanedBlobs;
