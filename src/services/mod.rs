pub mod changes;
pub mod favourites;
pub mod file_store;
pub mod file_type;
pub mod query;
pub mod reconciliation;
pub mod storage;
pub mod tenant;
pub mod upload;
pub mod worker;
