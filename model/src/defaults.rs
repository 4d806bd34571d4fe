use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fallback row UUIDs, keyed by table name. Loaders consult this table when
/// a candidate reading does not name a reference or metric type explicitly.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "defaults")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub table_name: String,
    pub uuid: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl crate::UniqueConstraints for Entity {}
