use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A concrete timing reference. `compound_reference_uuid` points at the
/// probe acting as the far side when the reference type is PROBE; it is null
/// for standalone references such as the seeded UNKNOWN default.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reference")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    pub reference_type_uuid: Uuid,
    pub compound_reference_uuid: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reference_type::Entity",
        from = "Column::ReferenceTypeUuid",
        to = "super::reference_type::Column::Uuid",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    ReferenceType,
    #[sea_orm(has_many = "super::probe_data::Entity")]
    ProbeData,
}

impl Related<super::reference_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReferenceType.def()
    }
}

impl Related<super::probe_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProbeData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl crate::UniqueConstraints for Entity {
    fn unique_constraints() -> &'static [&'static [&'static str]] {
        &[&["reference_type_uuid", "compound_reference_uuid"]]
    }
}
