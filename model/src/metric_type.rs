use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The quantity a probe reading measures (phase offset, frequency offset).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "metric_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::probe_data::Entity")]
    ProbeData,
}

impl Related<super::probe_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProbeData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl crate::UniqueConstraints for Entity {
    fn unique_constraints() -> &'static [&'static [&'static str]] {
        &[&["name"]]
    }
}
