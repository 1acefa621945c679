use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::services::file_type::FileType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub scope_id: String,
    pub name: String,
    pub file_type: String, // image | csv | pdf
    pub storage_key: String,
    pub owner_id: String,
    pub size: i64,
    pub created_at: DateTimeUtc,
    pub deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::favourites::Entity")]
    Favourites,
}

impl Related<super::favourites::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favourites.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed type; `None` only for rows written outside this service.
    pub fn kind(&self) -> Option<FileType> {
        self.file_type.parse().ok()
    }
}
