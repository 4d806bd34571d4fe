//! The fixed table registry.
//!
//! Callers address tables by name; the registry resolves the name against
//! the schema (nothing dynamic — one `match` per entity, mirroring the
//! static schema definition in `migration/`), applies per-table pre-insert
//! normalization, and hands the candidate to the generic writer.

use crate::database::State;
use crate::ingest;
use crate::writer::{self, IfExists, WriteError};
use model::{
    adva_metadata, defaults, locations, metric_type, probe_data, probe_metadata, reference,
    reference_type, test_metadata, twst_metadata, UniqueConstraints,
};
use sea_orm::{
    ActiveModelBehavior, ConnectionTrait, EntityTrait, IntoActiveModel, TransactionTrait,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Every table a caller may address, in schema order.
pub const TABLES: &[&str] = &[
    "locations",
    "test_metadata",
    "probe_metadata",
    "adva_metadata",
    "twst_metadata",
    "reference_type",
    "reference",
    "metric_type",
    "probe_data",
    "defaults",
];

pub fn is_known_table(table: &str) -> bool {
    TABLES.contains(&table)
}

/// Writes one candidate row to `table`, resolving conflicts with existing
/// rows under `if_exists`.
///
/// Opens its own transaction: exactly one commit or one rollback happens
/// per call, and a failed write re-raises the original error after rolling
/// back. Input validation happens before the transaction opens.
pub async fn write_to_table(
    state: &State,
    table: &str,
    data: JsonValue,
    if_exists: IfExists,
) -> Result<(), WriteError> {
    if !is_known_table(table) {
        return Err(WriteError::UnknownTable(table.to_owned()));
    }
    let data = normalize(&state.conn, table, data).await?;

    match table {
        "locations" => run::<locations::Entity>(state, table, &data, if_exists).await,
        "test_metadata" => run::<test_metadata::Entity>(state, table, &data, if_exists).await,
        "probe_metadata" => run::<probe_metadata::Entity>(state, table, &data, if_exists).await,
        "adva_metadata" => run::<adva_metadata::Entity>(state, table, &data, if_exists).await,
        "twst_metadata" => run::<twst_metadata::Entity>(state, table, &data, if_exists).await,
        "reference_type" => run::<reference_type::Entity>(state, table, &data, if_exists).await,
        "reference" => run::<reference::Entity>(state, table, &data, if_exists).await,
        "metric_type" => run::<metric_type::Entity>(state, table, &data, if_exists).await,
        "probe_data" => run::<probe_data::Entity>(state, table, &data, if_exists).await,
        "defaults" => run::<defaults::Entity>(state, table, &data, if_exists).await,
        _ => Err(WriteError::UnknownTable(table.to_owned())),
    }
}

/// Like [`write_to_table`], but stages on a caller-supplied connection or
/// transaction. The transaction boundary stays with the caller.
pub async fn write_to_table_in<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    data: JsonValue,
    if_exists: IfExists,
) -> Result<(), WriteError> {
    if !is_known_table(table) {
        return Err(WriteError::UnknownTable(table.to_owned()));
    }
    let data = normalize(conn, table, data).await?;

    match table {
        "locations" => run_one::<locations::Entity, C>(conn, table, &data, if_exists).await,
        "test_metadata" => run_one::<test_metadata::Entity, C>(conn, table, &data, if_exists).await,
        "probe_metadata" => {
            run_one::<probe_metadata::Entity, C>(conn, table, &data, if_exists).await
        }
        "adva_metadata" => run_one::<adva_metadata::Entity, C>(conn, table, &data, if_exists).await,
        "twst_metadata" => run_one::<twst_metadata::Entity, C>(conn, table, &data, if_exists).await,
        "reference_type" => {
            run_one::<reference_type::Entity, C>(conn, table, &data, if_exists).await
        }
        "reference" => run_one::<reference::Entity, C>(conn, table, &data, if_exists).await,
        "metric_type" => run_one::<metric_type::Entity, C>(conn, table, &data, if_exists).await,
        "probe_data" => run_one::<probe_data::Entity, C>(conn, table, &data, if_exists).await,
        "defaults" => run_one::<defaults::Entity, C>(conn, table, &data, if_exists).await,
        _ => Err(WriteError::UnknownTable(table.to_owned())),
    }
}

async fn run<E>(
    state: &State,
    table: &str,
    data: &JsonValue,
    if_exists: IfExists,
) -> Result<(), WriteError>
where
    E: EntityTrait + UniqueConstraints,
    E::Model: Serialize + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelBehavior + Send,
{
    let prepared = writer::prepare::<E>(table, data)?;

    let txn = state.conn.begin().await?;
    match writer::execute::<E, _>(&txn, table, prepared, if_exists).await {
        Ok(()) => {
            txn.commit().await?;
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(%rollback_err, table, "rollback failed after write error");
            }
            Err(err)
        }
    }
}

async fn run_one<E, C>(
    conn: &C,
    table: &str,
    data: &JsonValue,
    if_exists: IfExists,
) -> Result<(), WriteError>
where
    C: ConnectionTrait,
    E: EntityTrait + UniqueConstraints,
    E::Model: Serialize + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelBehavior + Send,
{
    let prepared = writer::prepare::<E>(table, data)?;
    writer::execute::<E, C>(conn, table, prepared, if_exists).await
}

/// Per-table pre-insert normalization. Explicit and up front rather than
/// hidden in storage-layer hooks: `locations` folds raw coordinates into a
/// `geom` value, `probe_data` fills the reference/metric UUIDs from the
/// `defaults` table.
async fn normalize<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    data: JsonValue,
) -> Result<JsonValue, WriteError> {
    match table {
        "locations" => Ok(locations::fold_coordinates(data)?),
        "probe_data" => resolve_probe_data_defaults(conn, data).await,
        _ => Ok(data),
    }
}

async fn resolve_probe_data_defaults<C: ConnectionTrait>(
    conn: &C,
    data: JsonValue,
) -> Result<JsonValue, WriteError> {
    let JsonValue::Object(mut object) = data else {
        return Ok(data);
    };

    // Defaults only complete a reading whose identity core is present;
    // anything else stays as-is and fails the identifiability check.
    if !object.contains_key("probe_uuid") || !object.contains_key("time") {
        return Ok(JsonValue::Object(object));
    }

    for (key, table_name) in [
        ("reference_uuid", "reference"),
        ("metric_type_uuid", "metric_type"),
    ] {
        let missing = object.get(key).map_or(true, JsonValue::is_null);
        if missing {
            if let Some(uuid) = ingest::lookup_default(conn, table_name).await? {
                object.insert(key.to_owned(), JsonValue::String(uuid.to_string()));
            }
        }
    }

    Ok(JsonValue::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::State;
    use crate::ingest::seed_reference_data;
    use crate::test_utils::test_prop;
    use model::testing::arb_location_candidate;
    use proptest::prelude::*;
    use sea_orm::{ColumnTrait, QueryFilter};
    use serde_json::json;
    use uuid::Uuid;

    async fn all_locations(state: &State) -> Vec<locations::Model> {
        locations::Entity::find().all(&state.conn).await.unwrap()
    }

    fn sample_location() -> serde_json::Value {
        json!({
            "name": "Test Location",
            "lat": 35.0844,
            "lon": -106.6504,
            "public": true,
        })
    }

    #[tokio::test]
    async fn test_write_to_table() {
        let state = State::for_test().await;

        write_to_table(&state, "locations", sample_location(), IfExists::Update)
            .await
            .expect("write should succeed");

        let rows = all_locations(&state).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Test Location");
        assert_eq!(rows[0].public, Some(true));
        assert!(rows[0].geom.is_some(), "geometry folded from lat/lon");
    }

    #[tokio::test]
    async fn test_conflict_handling_does_not_duplicate() {
        let state = State::for_test().await;

        write_to_table(&state, "locations", sample_location(), IfExists::Update)
            .await
            .unwrap();

        let mut updated = sample_location();
        updated["lat"] = json!(39.0844);
        write_to_table(&state, "locations", updated, IfExists::Update)
            .await
            .unwrap();

        assert_eq!(all_locations(&state).await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_fills_gaps_only() {
        let state = State::for_test().await;

        write_to_table(&state, "locations", sample_location(), IfExists::Update)
            .await
            .unwrap();

        let second = json!({
            "name": "Test Location",
            "public": false,
            "description": "filled in later",
        });
        write_to_table(&state, "locations", second, IfExists::Update)
            .await
            .unwrap();

        let rows = all_locations(&state).await;
        assert_eq!(rows.len(), 1);
        // `public` was already populated and must not be clobbered
        assert_eq!(rows[0].public, Some(true));
        // `description` was a gap and gets filled
        assert_eq!(rows[0].description.as_deref(), Some("filled in later"));
    }

    #[tokio::test]
    async fn test_replace_overwrites_unconditionally() {
        let state = State::for_test().await;

        write_to_table(&state, "locations", sample_location(), IfExists::Update)
            .await
            .unwrap();
        let existing = all_locations(&state).await.remove(0);

        let replacement = json!({
            "uuid": existing.uuid,
            "name": "New Location",
            "public": false,
        });
        write_to_table(&state, "locations", replacement, IfExists::Replace)
            .await
            .unwrap();

        let rows = all_locations(&state).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uuid, existing.uuid);
        assert_eq!(rows[0].name, "New Location");
        assert_eq!(rows[0].public, Some(false));
    }

    #[tokio::test]
    async fn test_ignore_is_a_noop() {
        let state = State::for_test().await;

        write_to_table(&state, "locations", sample_location(), IfExists::Ignore)
            .await
            .unwrap();

        let mut second = sample_location();
        second["public"] = json!(false);
        write_to_table(&state, "locations", second, IfExists::Ignore)
            .await
            .unwrap();

        let rows = all_locations(&state).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].public, Some(true));
    }

    #[tokio::test]
    async fn test_error_policy_never_mutates() {
        let state = State::for_test().await;

        write_to_table(&state, "locations", sample_location(), IfExists::Update)
            .await
            .unwrap();
        let before = all_locations(&state).await.remove(0);

        let mut second = sample_location();
        second["public"] = json!(false);
        let err = write_to_table(&state, "locations", second, IfExists::Error)
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Conflict { ref table } if table == "locations"));

        let after = all_locations(&state).await.remove(0);
        assert_eq!(before, after, "error policy must leave the row untouched");
    }

    #[tokio::test]
    async fn test_unknown_table_fails_fast() {
        let state = State::for_test().await;

        let err = write_to_table(&state, "not_a_table", json!({"name": "x"}), IfExists::Update)
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::UnknownTable(ref t) if t == "not_a_table"));
    }

    #[tokio::test]
    async fn test_unidentifiable_candidate_writes_nothing() {
        let state = State::for_test().await;

        let err = write_to_table(&state, "locations", json!({"public": true}), IfExists::Update)
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::NoIdentifiableFields));
        assert!(all_locations(&state).await.is_empty());
    }

    #[tokio::test]
    async fn test_pk_match_takes_precedence_over_unique_constraint() {
        let state = State::for_test().await;

        write_to_table(
            &state,
            "locations",
            json!({"name": "alpha", "public": true}),
            IfExists::Update,
        )
        .await
        .unwrap();
        write_to_table(
            &state,
            "locations",
            json!({"name": "beta", "public": true}),
            IfExists::Update,
        )
        .await
        .unwrap();

        let alpha = locations::Entity::find()
            .filter(locations::Column::Name.eq("alpha"))
            .one(&state.conn)
            .await
            .unwrap()
            .unwrap();

        // addressed by pk: renames alpha even though the name changes
        write_to_table(
            &state,
            "locations",
            json!({"uuid": alpha.uuid, "name": "alpha-renamed"}),
            IfExists::Replace,
        )
        .await
        .unwrap();

        let rows = all_locations(&state).await;
        assert_eq!(rows.len(), 2);
        let renamed = rows.iter().find(|r| r.uuid == alpha.uuid).unwrap();
        assert_eq!(renamed.name, "alpha-renamed");
        assert!(rows.iter().any(|r| r.name == "beta"));
    }

    #[tokio::test]
    async fn test_probe_data_defaults_resolution() {
        let state = State::for_test().await;
        seed_reference_data(&state).await.unwrap();

        write_to_table(
            &state,
            "probe_metadata",
            json!({"probe_id": "1-1", "ip_address": "10.0.0.5"}),
            IfExists::Update,
        )
        .await
        .unwrap();
        let probe = probe_metadata::Entity::find()
            .one(&state.conn)
            .await
            .unwrap()
            .unwrap();

        let reading = json!({
            "probe_uuid": probe.uuid,
            "time": "2024-03-20T10:00:00Z",
            "value": 12.5,
        });
        write_to_table(&state, "probe_data", reading.clone(), IfExists::Update)
            .await
            .unwrap();

        let rows = probe_data::Entity::find().all(&state.conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].probe_uuid, probe.uuid);

        let default_reference = ingest::lookup_default(&state.conn, "reference")
            .await
            .unwrap()
            .unwrap();
        let default_metric = ingest::lookup_default(&state.conn, "metric_type")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rows[0].reference_uuid, default_reference);
        assert_eq!(rows[0].metric_type_uuid, default_metric);

        // the same reading loaded again is the same row, not a duplicate
        write_to_table(&state, "probe_data", reading, IfExists::Ignore)
            .await
            .unwrap();
        assert_eq!(
            probe_data::Entity::find().all(&state.conn).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_storage_failure_rolls_back() {
        let state = State::for_test().await;
        seed_reference_data(&state).await.unwrap();

        // all four key fields reference rows that do not exist
        let orphan = json!({
            "probe_uuid": Uuid::new_v4(),
            "time": "2024-03-20T10:00:00Z",
            "metric_type_uuid": Uuid::new_v4(),
            "reference_uuid": Uuid::new_v4(),
            "value": 1.0,
        });
        let err = write_to_table(&state, "probe_data", orphan, IfExists::Update)
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Database(_)));

        assert!(probe_data::Entity::find()
            .all(&state.conn)
            .await
            .unwrap()
            .is_empty());
    }

    async fn prop_ignore_is_idempotent(candidate: serde_json::Value) {
        let state = State::for_test().await;

        write_to_table(&state, "locations", candidate.clone(), IfExists::Ignore)
            .await
            .expect("first write should succeed");
        write_to_table(&state, "locations", candidate, IfExists::Ignore)
            .await
            .expect("second write should succeed");

        assert_eq!(all_locations(&state).await.len(), 1);
    }

    async fn prop_update_never_clobbers(candidate: serde_json::Value, flipped: bool) {
        let state = State::for_test().await;

        write_to_table(&state, "locations", candidate.clone(), IfExists::Update)
            .await
            .unwrap();
        let before = all_locations(&state).await.remove(0);

        let mut second = candidate;
        second["public"] = json!(flipped);
        write_to_table(&state, "locations", second, IfExists::Update)
            .await
            .unwrap();

        let after = all_locations(&state).await.remove(0);
        assert_eq!(before.public, after.public);
    }

    proptest! {
        #[test]
        fn ignore_is_idempotent(candidate in arb_location_candidate()) {
            test_prop(|| async move {
                prop_ignore_is_idempotent(candidate).await;
            });
        }

        #[test]
        fn update_never_clobbers(candidate in arb_location_candidate(), flipped in any::<bool>()) {
            test_prop(|| async move {
                prop_update_never_clobbers(candidate, flipped).await;
            });
        }
    }
}
