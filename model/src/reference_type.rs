use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The kind of timing source a reading is measured against (GNSS, UTC,
/// another probe, or unknown).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reference_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reference::Entity")]
    Reference,
}

impl Related<super::reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reference.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl crate::UniqueConstraints for Entity {
    fn unique_constraints() -> &'static [&'static [&'static str]] {
        &[&["name"]]
    }
}
