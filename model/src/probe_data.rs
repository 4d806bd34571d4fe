use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One time-series sample. The composite key pins a reading to a probe, an
/// instant, a metric, and the reference it was measured against, so repeat
/// loads of the same export collide instead of duplicating.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "probe_data")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub probe_uuid: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub time: DateTimeWithTimeZone,
    #[sea_orm(primary_key, auto_increment = false)]
    pub metric_type_uuid: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub reference_uuid: Uuid,
    pub value: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::probe_metadata::Entity",
        from = "Column::ProbeUuid",
        to = "super::probe_metadata::Column::Uuid",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    ProbeMetadata,
    #[sea_orm(
        belongs_to = "super::metric_type::Entity",
        from = "Column::MetricTypeUuid",
        to = "super::metric_type::Column::Uuid",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    MetricType,
    #[sea_orm(
        belongs_to = "super::reference::Entity",
        from = "Column::ReferenceUuid",
        to = "super::reference::Column::Uuid",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    Reference,
}

impl Related<super::probe_metadata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProbeMetadata.def()
    }
}

impl Related<super::metric_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MetricType.def()
    }
}

impl Related<super::reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reference.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl crate::UniqueConstraints for Entity {}
