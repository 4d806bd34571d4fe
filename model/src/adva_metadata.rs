use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// ADVA clock-probe settings parsed from the export header, one row per
/// probe.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "adva_metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub probe_uuid: Uuid,
    pub probe_type: Option<String>,
    pub start: Option<DateTimeWithTimeZone>,
    pub frequency: Option<f64>,
    pub multiplier: Option<i32>,
    pub tick: Option<i32>,
    pub adjustment_type: Option<String>,
    pub mtie_mask: Option<String>,
    pub mask_margin: Option<i32>,
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
}

impl Related<super::probe_metadata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProbeMetadata.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl crate::UniqueConstraints for Entity {}
