use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Microchip TWST modem settings, one row per probe.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "twst_metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub probe_uuid: Uuid,
    pub modem_id: Option<String>,
    pub remote_site: Option<String>,
    pub tx_frequency: Option<f64>,
    pub rx_frequency: Option<f64>,
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
