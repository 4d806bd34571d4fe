use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The vendor-independent description of a clock probe.
///
/// A probe is addressed by its surrogate `uuid` or by the business key
/// (`probe_id`, `ip_address`); vendor-specific fields live in the per-vendor
/// metadata tables keyed by `uuid`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "probe_metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    pub probe_id: String,
    pub ip_address: String,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub public: Option<bool>,
    pub location_uuid: Option<Uuid>,
    pub test_uuid: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub additional_metadata: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::locations::Entity",
        from = "Column::LocationUuid",
        to = "super::locations::Column::Uuid",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    Locations,
    #[sea_orm(
        belongs_to = "super::test_metadata::Entity",
        from = "Column::TestUuid",
        to = "super::test_metadata::Column::Uuid",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    TestMetadata,
    #[sea_orm(has_many = "super::probe_data::Entity")]
    ProbeData,
}

impl Related<super::locations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Locations.def()
    }
}

impl Related<super::test_metadata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestMetadata.def()
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
        &[&["probe_id", "ip_address"]]
    }
}
