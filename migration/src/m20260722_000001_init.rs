use crate::{assert_not_has_tables, drop_tables};
use sea_orm::DbBackend;
use sea_orm_migration::prelude::{Index as MigrationIndex, Table as MigrationTable, *};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        assert_not_has_tables!(
            manager,
            Locations,
            TestMetadata,
            ReferenceType,
            MetricType,
            ProbeMetadata,
            AdvaMetadata,
            TwstMetadata,
            Reference,
            Defaults,
            ProbeData
        );

        match manager.get_database_backend() {
            DbBackend::MySql => {}
            DbBackend::Postgres => {}
            DbBackend::Sqlite => {
                manager
                    .get_connection()
                    .execute_unprepared("PRAGMA foreign_keys = ON")
                    .await
                    .expect("failed to set foreign key enforcement");
            }
            _ => {}
        }

        manager
            .create_table(
                MigrationTable::create()
                    .table(Locations::Table)
                    .col(
                        ColumnDef::new(Locations::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Locations::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Locations::Geom).string())
                    .col(ColumnDef::new(Locations::Public).boolean())
                    .col(ColumnDef::new(Locations::Description).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(TestMetadata::Table)
                    .col(
                        ColumnDef::new(TestMetadata::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TestMetadata::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(TestMetadata::Description).string())
                    .col(ColumnDef::new(TestMetadata::StartDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(TestMetadata::EndDate).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(ReferenceType::Table)
                    .col(
                        ColumnDef::new(ReferenceType::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReferenceType::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ReferenceType::Description).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(MetricType::Table)
                    .col(
                        ColumnDef::new(MetricType::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MetricType::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MetricType::Description).string())
                    .col(ColumnDef::new(MetricType::Unit).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(ProbeMetadata::Table)
                    .col(
                        ColumnDef::new(ProbeMetadata::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProbeMetadata::ProbeId).string().not_null())
                    .col(
                        ColumnDef::new(ProbeMetadata::IpAddress)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProbeMetadata::Name).string())
                    .col(ColumnDef::new(ProbeMetadata::Vendor).string())
                    .col(ColumnDef::new(ProbeMetadata::Model).string())
                    .col(ColumnDef::new(ProbeMetadata::Public).boolean())
                    .col(ColumnDef::new(ProbeMetadata::LocationUuid).uuid())
                    .col(ColumnDef::new(ProbeMetadata::TestUuid).uuid())
                    .col(ColumnDef::new(ProbeMetadata::AdditionalMetadata).json_binary())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_probe_metadata_location")
                            .from(ProbeMetadata::Table, ProbeMetadata::LocationUuid)
                            .to(Locations::Table, Locations::Uuid)
                            .on_update(ForeignKeyAction::Restrict)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_probe_metadata_test")
                            .from(ProbeMetadata::Table, ProbeMetadata::TestUuid)
                            .to(TestMetadata::Table, TestMetadata::Uuid)
                            .on_update(ForeignKeyAction::Restrict)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                MigrationIndex::create()
                    .name("uq_probe_metadata_probe_id_ip_address")
                    .table(ProbeMetadata::Table)
                    .col(ProbeMetadata::ProbeId)
                    .col(ProbeMetadata::IpAddress)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(AdvaMetadata::Table)
                    .col(
                        ColumnDef::new(AdvaMetadata::ProbeUuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdvaMetadata::ProbeType).string())
                    .col(ColumnDef::new(AdvaMetadata::Start).timestamp_with_time_zone())
                    .col(ColumnDef::new(AdvaMetadata::Frequency).double())
                    .col(ColumnDef::new(AdvaMetadata::Multiplier).integer())
                    .col(ColumnDef::new(AdvaMetadata::Tick).integer())
                    .col(ColumnDef::new(AdvaMetadata::AdjustmentType).string())
                    .col(ColumnDef::new(AdvaMetadata::MtieMask).string())
                    .col(ColumnDef::new(AdvaMetadata::MaskMargin).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_adva_metadata_probe")
                            .from(AdvaMetadata::Table, AdvaMetadata::ProbeUuid)
                            .to(ProbeMetadata::Table, ProbeMetadata::Uuid)
                            .on_update(ForeignKeyAction::Restrict)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(TwstMetadata::Table)
                    .col(
                        ColumnDef::new(TwstMetadata::ProbeUuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TwstMetadata::ModemId).string())
                    .col(ColumnDef::new(TwstMetadata::RemoteSite).string())
                    .col(ColumnDef::new(TwstMetadata::TxFrequency).double())
                    .col(ColumnDef::new(TwstMetadata::RxFrequency).double())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_twst_metadata_probe")
                            .from(TwstMetadata::Table, TwstMetadata::ProbeUuid)
                            .to(ProbeMetadata::Table, ProbeMetadata::Uuid)
                            .on_update(ForeignKeyAction::Restrict)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(Reference::Table)
                    .col(
                        ColumnDef::new(Reference::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reference::ReferenceTypeUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reference::CompoundReferenceUuid).uuid())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reference_reference_type")
                            .from(Reference::Table, Reference::ReferenceTypeUuid)
                            .to(ReferenceType::Table, ReferenceType::Uuid)
                            .on_update(ForeignKeyAction::Restrict)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                MigrationIndex::create()
                    .name("uq_reference_type_compound")
                    .table(Reference::Table)
                    .col(Reference::ReferenceTypeUuid)
                    .col(Reference::CompoundReferenceUuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(Defaults::Table)
                    .col(
                        ColumnDef::new(Defaults::TableName)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Defaults::Uuid).uuid().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                MigrationTable::create()
                    .table(ProbeData::Table)
                    .col(ColumnDef::new(ProbeData::ProbeUuid).uuid().not_null())
                    .col(
                        ColumnDef::new(ProbeData::Time)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProbeData::MetricTypeUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProbeData::ReferenceUuid).uuid().not_null())
                    .col(ColumnDef::new(ProbeData::Value).double().not_null())
                    .primary_key(
                        MigrationIndex::create()
                            .col(ProbeData::ProbeUuid)
                            .col(ProbeData::Time)
                            .col(ProbeData::MetricTypeUuid)
                            .col(ProbeData::ReferenceUuid),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_probe_data_probe")
                            .from(ProbeData::Table, ProbeData::ProbeUuid)
                            .to(ProbeMetadata::Table, ProbeMetadata::Uuid)
                            .on_update(ForeignKeyAction::Restrict)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_probe_data_metric_type")
                            .from(ProbeData::Table, ProbeData::MetricTypeUuid)
                            .to(MetricType::Table, MetricType::Uuid)
                            .on_update(ForeignKeyAction::Restrict)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_probe_data_reference")
                            .from(ProbeData::Table, ProbeData::ReferenceUuid)
                            .to(Reference::Table, Reference::Uuid)
                            .on_update(ForeignKeyAction::Restrict)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_tables!(
            manager,
            ProbeData,
            Defaults,
            Reference,
            TwstMetadata,
            AdvaMetadata,
            ProbeMetadata,
            MetricType,
            ReferenceType,
            TestMetadata,
            Locations
        );
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Locations {
    Table,
    Uuid,
    Name,
    Geom,
    Public,
    Description,
}

#[derive(DeriveIden)]
enum TestMetadata {
    Table,
    Uuid,
    Name,
    Description,
    StartDate,
    EndDate,
}

#[derive(DeriveIden)]
enum ReferenceType {
    Table,
    Uuid,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum MetricType {
    Table,
    Uuid,
    Name,
    Description,
    Unit,
}

#[derive(DeriveIden)]
enum ProbeMetadata {
    Table,
    Uuid,
    ProbeId,
    IpAddress,
    Name,
    Vendor,
    Model,
    Public,
    LocationUuid,
    TestUuid,
    AdditionalMetadata,
}

#[derive(DeriveIden)]
enum AdvaMetadata {
    Table,
    ProbeUuid,
    ProbeType,
    Start,
    Frequency,
    Multiplier,
    Tick,
    AdjustmentType,
    MtieMask,
    MaskMargin,
}

#[derive(DeriveIden)]
enum TwstMetadata {
    Table,
    ProbeUuid,
    ModemId,
    RemoteSite,
    TxFrequency,
    RxFrequency,
}

#[derive(DeriveIden)]
enum Reference {
    Table,
    Uuid,
    ReferenceTypeUuid,
    CompoundReferenceUuid,
}

#[derive(DeriveIden)]
enum Defaults {
    Table,
    TableName,
    Uuid,
}

#[derive(DeriveIden)]
enum ProbeData {
    Table,
    ProbeUuid,
    Time,
    MetricTypeUuid,
    ReferenceUuid,
    Value,
}
