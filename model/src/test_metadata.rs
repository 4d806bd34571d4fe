use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A measurement campaign; probes are attached to at most one at a time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::probe_metadata::Entity")]
    ProbeMetadata,
}

impl Related<super::probe_metadata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProbeMetadata.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl crate::UniqueConstraints for Entity {
    fn unique_constraints() -> &'static [&'static [&'static str]] {
        &[&["name"]]
    }
}
