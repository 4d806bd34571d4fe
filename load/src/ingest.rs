//! Local loaders for parsed probe exports.
//!
//! These are the database-side halves of the routed entry points: they take
//! what a vendor parser produced (a probe key plus metadata, or a probe key
//! plus readings) and stage it through the table writer inside one
//! transaction per call.

use crate::database::State;
use crate::registry;
use crate::vendors::{ProbeKey, ProbeReading, Vendor};
use crate::writer::{IfExists, WriteError};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("probe {0} was not found after upsert")]
    ProbeNotFound(ProbeKey),
    #[error("unknown metric type '{0}'")]
    UnknownMetric(String),
    #[error("no default configured for '{0}'; run `opensampl init` first")]
    NoDefault(&'static str),
    #[error("metadata payload must be a JSON object")]
    NotAnObject,
}

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Upserts the vendor-independent probe row, then the vendor's metadata
/// table row keyed by the probe's uuid. One transaction covers both writes.
pub async fn load_probe_metadata(
    state: &State,
    vendor: Vendor,
    probe_key: &ProbeKey,
    data: &JsonValue,
) -> Result<(), IngestError> {
    if !data.is_object() {
        return Err(IngestError::NotAnObject);
    }

    let txn = state.conn.begin().await?;
    match stage_probe_metadata(&txn, vendor, probe_key, data).await {
        Ok(()) => {
            txn.commit().await?;
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(%rollback_err, probe = %probe_key, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn stage_probe_metadata(
    txn: &DatabaseTransaction,
    vendor: Vendor,
    probe_key: &ProbeKey,
    data: &JsonValue,
) -> Result<(), IngestError> {
    let base = json!({
        "probe_id": probe_key.probe_id,
        "ip_address": probe_key.ip_address,
        "vendor": vendor.to_string(),
    });
    registry::write_to_table_in(txn, "probe_metadata", base, IfExists::Update).await?;

    let probe = find_probe(txn, probe_key)
        .await?
        .ok_or_else(|| IngestError::ProbeNotFound(probe_key.clone()))?;

    let mut vendor_row = data.clone();
    if let Some(object) = vendor_row.as_object_mut() {
        object.insert("probe_uuid".to_owned(), json!(probe.uuid));
    }
    registry::write_to_table_in(txn, vendor.metadata_table(), vendor_row, IfExists::Update).await?;

    tracing::debug!(probe = %probe_key, vendor = %vendor, "loaded probe metadata");
    Ok(())
}

/// Bulk-inserts readings for one probe.
///
/// The metric and reference UUIDs are resolved once up front, falling back
/// to the `defaults` table when unspecified; a stub probe row is created
/// when the probe has not been registered yet. Readings that collide with
/// already-loaded rows surface as a database error, they are not absorbed.
pub async fn load_time_data(
    state: &State,
    probe_key: &ProbeKey,
    metric_type_name: Option<&str>,
    reference_uuid: Option<Uuid>,
    readings: &[ProbeReading],
    chunk_size: Option<usize>,
) -> Result<(), IngestError> {
    if readings.is_empty() {
        return Ok(());
    }

    let txn = state.conn.begin().await?;
    match stage_time_data(
        &txn,
        probe_key,
        metric_type_name,
        reference_uuid,
        readings,
        chunk_size,
    )
    .await
    {
        Ok(()) => {
            txn.commit().await?;
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(%rollback_err, probe = %probe_key, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn stage_time_data(
    txn: &DatabaseTransaction,
    probe_key: &ProbeKey,
    metric_type_name: Option<&str>,
    reference_uuid: Option<Uuid>,
    readings: &[ProbeReading],
    chunk_size: Option<usize>,
) -> Result<(), IngestError> {
    let probe_uuid = match find_probe(txn, probe_key).await? {
        Some(probe) => probe.uuid,
        None => {
            let stub = json!({
                "probe_id": probe_key.probe_id,
                "ip_address": probe_key.ip_address,
            });
            registry::write_to_table_in(txn, "probe_metadata", stub, IfExists::Update).await?;
            find_probe(txn, probe_key)
                .await?
                .ok_or_else(|| IngestError::ProbeNotFound(probe_key.clone()))?
                .uuid
        }
    };

    let metric_type_uuid = match metric_type_name {
        Some(name) => {
            model::metric_type::Entity::find()
                .filter(model::metric_type::Column::Name.eq(name))
                .one(txn)
                .await?
                .ok_or_else(|| IngestError::UnknownMetric(name.to_owned()))?
                .uuid
        }
        None => lookup_default(txn, "metric_type")
            .await?
            .ok_or(IngestError::NoDefault("metric_type"))?,
    };
    let reference_uuid = match reference_uuid {
        Some(uuid) => uuid,
        None => lookup_default(txn, "reference")
            .await?
            .ok_or(IngestError::NoDefault("reference"))?,
    };

    let chunk_size = chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1);
    for chunk in readings.chunks(chunk_size) {
        let rows = chunk.iter().map(|reading| model::probe_data::ActiveModel {
            probe_uuid: Set(probe_uuid),
            time: Set(reading.time),
            metric_type_uuid: Set(metric_type_uuid),
            reference_uuid: Set(reference_uuid),
            value: Set(reading.value),
        });
        model::probe_data::Entity::insert_many(rows).exec(txn).await?;
    }

    tracing::debug!(probe = %probe_key, rows = readings.len(), "loaded time data");
    Ok(())
}

pub(crate) async fn find_probe<C: ConnectionTrait>(
    conn: &C,
    probe_key: &ProbeKey,
) -> Result<Option<model::probe_metadata::Model>, sea_orm::DbErr> {
    model::probe_metadata::Entity::find()
        .filter(model::probe_metadata::Column::ProbeId.eq(&probe_key.probe_id))
        .filter(model::probe_metadata::Column::IpAddress.eq(&probe_key.ip_address))
        .one(conn)
        .await
}

/// Looks up the configured default row uuid for `table_name`.
pub async fn lookup_default<C: ConnectionTrait>(
    conn: &C,
    table_name: &str,
) -> Result<Option<Uuid>, sea_orm::DbErr> {
    Ok(model::defaults::Entity::find_by_id(table_name.to_owned())
        .one(conn)
        .await?
        .map(|row| row.uuid))
}

const METRIC_TYPES: &[(&str, &str, &str)] = &[
    ("PHASE", "Phase offset between probe and reference", "ns"),
    ("FREQUENCY", "Fractional frequency offset", "ppb"),
];

const REFERENCE_TYPES: &[(&str, &str)] = &[
    ("UNKNOWN", "Reference could not be determined from the export"),
    ("GNSS", "Satellite timing reference"),
    ("UTC", "National timing laboratory UTC realization"),
    ("PROBE", "Another probe acting as the far side of a compound link"),
];

const DEFAULT_METRIC: &str = "PHASE";

/// Seeds the metric/reference vocabularies and the fallback rows the
/// loaders rely on. Safe to run repeatedly.
pub async fn seed_reference_data(state: &State) -> Result<(), IngestError> {
    let txn = state.conn.begin().await?;
    match stage_reference_data(&txn).await {
        Ok(()) => {
            txn.commit().await?;
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(%rollback_err, "rollback failed while seeding");
            }
            Err(err)
        }
    }
}

async fn stage_reference_data(txn: &DatabaseTransaction) -> Result<(), IngestError> {
    use model::{defaults, metric_type, reference, reference_type};

    let mut default_metric_uuid = None;
    for (name, description, unit) in METRIC_TYPES {
        let existing = metric_type::Entity::find()
            .filter(metric_type::Column::Name.eq(*name))
            .one(txn)
            .await?;
        let uuid = match existing {
            Some(row) => row.uuid,
            None => {
                metric_type::ActiveModel {
                    uuid: Set(Uuid::new_v4()),
                    name: Set((*name).to_owned()),
                    description: Set(Some((*description).to_owned())),
                    unit: Set(Some((*unit).to_owned())),
                }
                .insert(txn)
                .await?
                .uuid
            }
        };
        if *name == DEFAULT_METRIC {
            default_metric_uuid = Some(uuid);
        }
    }

    let mut unknown_type_uuid = None;
    for (name, description) in REFERENCE_TYPES {
        let existing = reference_type::Entity::find()
            .filter(reference_type::Column::Name.eq(*name))
            .one(txn)
            .await?;
        let uuid = match existing {
            Some(row) => row.uuid,
            None => {
                reference_type::ActiveModel {
                    uuid: Set(Uuid::new_v4()),
                    name: Set((*name).to_owned()),
                    description: Set(Some((*description).to_owned())),
                }
                .insert(txn)
                .await?
                .uuid
            }
        };
        if *name == "UNKNOWN" {
            unknown_type_uuid = Some(uuid);
        }
    }
    let unknown_type_uuid = unknown_type_uuid.expect("UNKNOWN reference type is seeded above");

    let default_reference_uuid = match reference::Entity::find()
        .filter(reference::Column::ReferenceTypeUuid.eq(unknown_type_uuid))
        .filter(reference::Column::CompoundReferenceUuid.is_null())
        .one(txn)
        .await?
    {
        Some(row) => row.uuid,
        None => {
            reference::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                reference_type_uuid: Set(unknown_type_uuid),
                compound_reference_uuid: Set(None),
            }
            .insert(txn)
            .await?
            .uuid
        }
    };

    let default_metric_uuid = default_metric_uuid.expect("PHASE metric is seeded above");
    for (table_name, uuid) in [
        ("reference", default_reference_uuid),
        ("metric_type", default_metric_uuid),
    ] {
        if defaults::Entity::find_by_id(table_name.to_owned())
            .one(txn)
            .await?
            .is_none()
        {
            defaults::ActiveModel {
                table_name: Set(table_name.to_owned()),
                uuid: Set(uuid),
            }
            .insert(txn)
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use serde_json::json;

    fn sample_probe_key() -> ProbeKey {
        ProbeKey {
            probe_id: "1-1".to_owned(),
            ip_address: "192.168.1.100".to_owned(),
        }
    }

    fn sample_readings(count: usize) -> Vec<ProbeReading> {
        let start = DateTime::parse_from_rfc3339("2024-03-20T10:00:00Z").unwrap();
        (0..count)
            .map(|i| ProbeReading {
                time: start + Duration::seconds(i as i64),
                value: i as f64 * 0.5,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_seed_reference_data_is_idempotent() {
        let state = State::for_test().await;

        seed_reference_data(&state).await.unwrap();
        seed_reference_data(&state).await.unwrap();

        let metrics = model::metric_type::Entity::find()
            .all(&state.conn)
            .await
            .unwrap();
        assert_eq!(metrics.len(), METRIC_TYPES.len());

        assert!(lookup_default(&state.conn, "reference")
            .await
            .unwrap()
            .is_some());
        assert!(lookup_default(&state.conn, "metric_type")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_load_probe_metadata_creates_probe_and_vendor_rows() {
        let state = State::for_test().await;

        let data = json!({
            "probe_type": "PTP",
            "frequency": 2048000.0,
            "adjustment_type": "phase",
        });
        load_probe_metadata(&state, Vendor::Adva, &sample_probe_key(), &data)
            .await
            .unwrap();

        let probes = model::probe_metadata::Entity::find()
            .all(&state.conn)
            .await
            .unwrap();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].probe_id, "1-1");
        assert_eq!(probes[0].ip_address, "192.168.1.100");
        assert_eq!(probes[0].vendor.as_deref(), Some("ADVA"));

        let adva = model::adva_metadata::Entity::find()
            .all(&state.conn)
            .await
            .unwrap();
        assert_eq!(adva.len(), 1);
        assert_eq!(adva[0].probe_uuid, probes[0].uuid);
        assert_eq!(adva[0].probe_type.as_deref(), Some("PTP"));
        assert_eq!(adva[0].frequency, Some(2048000.0));
    }

    #[tokio::test]
    async fn test_load_probe_metadata_twice_keeps_one_row_per_table() {
        let state = State::for_test().await;
        let data = json!({"probe_type": "PTP"});

        load_probe_metadata(&state, Vendor::Adva, &sample_probe_key(), &data)
            .await
            .unwrap();
        load_probe_metadata(&state, Vendor::Adva, &sample_probe_key(), &data)
            .await
            .unwrap();

        assert_eq!(
            model::probe_metadata::Entity::find()
                .all(&state.conn)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            model::adva_metadata::Entity::find()
                .all(&state.conn)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_load_time_data_resolves_defaults_and_inserts() {
        let state = State::for_test().await;
        seed_reference_data(&state).await.unwrap();

        load_time_data(&state, &sample_probe_key(), None, None, &sample_readings(3), None)
            .await
            .unwrap();

        let rows = model::probe_data::Entity::find()
            .all(&state.conn)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);

        // a stub probe row was created for the unregistered probe
        let probe = find_probe(&state.conn, &sample_probe_key())
            .await
            .unwrap()
            .expect("stub probe should exist");
        assert!(rows.iter().all(|r| r.probe_uuid == probe.uuid));

        let default_metric = lookup_default(&state.conn, "metric_type")
            .await
            .unwrap()
            .unwrap();
        assert!(rows.iter().all(|r| r.metric_type_uuid == default_metric));
    }

    #[tokio::test]
    async fn test_load_time_data_chunks_inserts() {
        let state = State::for_test().await;
        seed_reference_data(&state).await.unwrap();

        load_time_data(
            &state,
            &sample_probe_key(),
            Some("FREQUENCY"),
            None,
            &sample_readings(25),
            Some(10),
        )
        .await
        .unwrap();

        assert_eq!(
            model::probe_data::Entity::find()
                .all(&state.conn)
                .await
                .unwrap()
                .len(),
            25
        );
    }

    #[tokio::test]
    async fn test_load_time_data_unknown_metric_fails_before_insert() {
        let state = State::for_test().await;
        seed_reference_data(&state).await.unwrap();

        let err = load_time_data(
            &state,
            &sample_probe_key(),
            Some("NOT_A_METRIC"),
            None,
            &sample_readings(2),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::UnknownMetric(ref name) if name == "NOT_A_METRIC"));

        assert!(model::probe_data::Entity::find()
            .all(&state.conn)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_readings_surface_as_errors() {
        let state = State::for_test().await;
        seed_reference_data(&state).await.unwrap();

        let readings = sample_readings(2);
        load_time_data(&state, &sample_probe_key(), None, None, &readings, None)
            .await
            .unwrap();

        let err = load_time_data(&state, &sample_probe_key(), None, None, &readings, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Database(_)));
    }
}
