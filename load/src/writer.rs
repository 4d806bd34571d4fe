//! The generic table-upsert engine.
//!
//! A write is resolved in three steps: the candidate JSON object is coerced
//! into typed column values ([`prepare`]), an existing row is looked up by
//! primary key first and then by each satisfied unique constraint
//! ([`find_existing`]), and the caller's [`IfExists`] policy decides what
//! happens when a row is found. All staging happens on the caller's
//! connection; the transaction boundary is owned by [`crate::registry`].

use model::UniqueConstraints;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ColumnType, Condition, ConnectionTrait,
    EntityTrait, IdenStatic, IntoActiveModel, Iterable, PrimaryKeyToColumn, QueryFilter, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use strum::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

/// Conflict policy applied when a write targets a row that already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    /// Fill in fields the existing row has not populated. Never overwrites
    /// a populated field, only gaps.
    #[default]
    Update,
    /// Fail if an entry already exists.
    Error,
    /// Overwrite every non-primary-key field with the candidate values.
    Replace,
    /// Leave the existing entry untouched.
    Ignore,
}

impl IfExists {
    /// Parses a policy string, rejecting anything outside the closed set
    /// before any I/O happens.
    pub fn parse(value: &str) -> Result<Self, WriteError> {
        Self::from_str(value).map_err(|_| WriteError::InvalidPolicy(value.to_owned()))
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("on_conflict must be one of update, error, replace, ignore; got '{0}'")]
    InvalidPolicy(String),
    #[error("table data must be a JSON object")]
    NotAnObject,
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
    #[error("column '{column}' expects {expected}")]
    InvalidValue {
        column: String,
        expected: &'static str,
    },
    #[error("no identifiable fields: supply a primary key or a complete unique constraint")]
    NoIdentifiableFields,
    #[error("entry already exists in '{table}' and on_conflict is 'error'")]
    Conflict { table: String },
    #[error(transparent)]
    Coordinates(#[from] model::locations::CoordinateError),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One candidate column: the resolved entity column, the value coerced to a
/// database term, and whether the caller supplied an explicit null.
#[derive(Debug)]
struct CandidateColumn<E: EntityTrait> {
    column: E::Column,
    name: String,
    value: Value,
    is_null: bool,
}

/// A validated candidate row for `E`: the coerced columns plus the
/// conditions used to locate an existing row.
#[derive(Debug)]
pub(crate) struct PreparedWrite<E: EntityTrait> {
    columns: Vec<CandidateColumn<E>>,
    pk_condition: Option<Condition>,
    unique_conditions: Vec<Condition>,
}

/// Validates and coerces a candidate row. Fails before any database I/O:
/// unknown columns, uncoercible values, and candidates with no identifiable
/// fields never reach a connection.
pub(crate) fn prepare<E>(table: &str, data: &JsonValue) -> Result<PreparedWrite<E>, WriteError>
where
    E: EntityTrait + UniqueConstraints,
{
    let object = data.as_object().ok_or(WriteError::NotAnObject)?;

    let mut columns: Vec<CandidateColumn<E>> = Vec::with_capacity(object.len());
    for (key, value) in object {
        let column = E::Column::from_str(key).map_err(|_| WriteError::UnknownColumn {
            table: table.to_owned(),
            column: key.clone(),
        })?;
        let name = column.as_str();
        let coerced = if value.is_null() {
            null_value(column.def().get_column_type(), name)?
        } else {
            json_to_db_value(column.def().get_column_type(), name, value)?
        };
        columns.push(CandidateColumn {
            column,
            name: name.to_owned(),
            value: coerced,
            is_null: value.is_null(),
        });
    }

    // Primary-key equalities, one per pk column present in the candidate.
    let mut pk_condition = Condition::all();
    let mut pk_present = false;
    for key in E::PrimaryKey::iter() {
        let column = key.into_column();
        if let Some(cc) = columns
            .iter()
            .find(|cc| cc.name == column.as_str() && !cc.is_null)
        {
            pk_condition = pk_condition.add(column.eq(cc.value.clone()));
            pk_present = true;
        }
    }

    // Unique-constraint groups are only usable when the candidate supplies
    // every column they cover, non-null.
    let mut unique_conditions = Vec::new();
    for group in E::unique_constraints() {
        let mut condition = Condition::all();
        let mut complete = true;
        for name in *group {
            match columns.iter().find(|cc| cc.name == *name && !cc.is_null) {
                Some(cc) => condition = condition.add(cc.column.eq(cc.value.clone())),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            unique_conditions.push(condition);
        }
    }

    if !pk_present && unique_conditions.is_empty() {
        return Err(WriteError::NoIdentifiableFields);
    }

    Ok(PreparedWrite {
        columns,
        pk_condition: pk_present.then_some(pk_condition),
        unique_conditions,
    })
}

/// Runs a prepared write on `conn`: looks up the existing row and either
/// resolves the conflict under `if_exists` or inserts the candidate.
pub(crate) async fn execute<E, C>(
    conn: &C,
    table: &str,
    prepared: PreparedWrite<E>,
    if_exists: IfExists,
) -> Result<(), WriteError>
where
    C: ConnectionTrait,
    E: EntityTrait + UniqueConstraints,
    E::Model: Serialize + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelBehavior + Send,
{
    match find_existing::<E, C>(conn, &prepared).await? {
        Some(existing) => resolve_conflict::<E, C>(conn, table, existing, &prepared, if_exists).await,
        None => insert_candidate::<E, C>(conn, &prepared).await,
    }
}

/// Primary-key identity always wins over business-key uniqueness; the
/// unique-constraint groups are only consulted when the pk conditions match
/// nothing, in the order the model declares them.
async fn find_existing<E, C>(
    conn: &C,
    prepared: &PreparedWrite<E>,
) -> Result<Option<E::Model>, WriteError>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    if let Some(condition) = &prepared.pk_condition {
        if let Some(found) = E::find().filter(condition.clone()).one(conn).await? {
            return Ok(Some(found));
        }
    }
    for condition in &prepared.unique_conditions {
        if let Some(found) = E::find().filter(condition.clone()).one(conn).await? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

async fn resolve_conflict<E, C>(
    conn: &C,
    table: &str,
    existing: E::Model,
    prepared: &PreparedWrite<E>,
    if_exists: IfExists,
) -> Result<(), WriteError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Serialize + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelBehavior + Send,
{
    match if_exists {
        IfExists::Error => Err(WriteError::Conflict {
            table: table.to_owned(),
        }),
        IfExists::Ignore => Ok(()),
        IfExists::Update | IfExists::Replace => {
            let current = serde_json::to_value(&existing)?;
            let pk_columns: Vec<E::Column> =
                E::PrimaryKey::iter().map(|key| key.into_column()).collect();

            let mut active = existing.into_active_model();
            let mut dirty = false;
            for cc in &prepared.columns {
                if pk_columns.iter().any(|pk| pk.as_str() == cc.name) {
                    continue;
                }
                let stage = match if_exists {
                    IfExists::Replace => true,
                    // update fills gaps only: the existing value must be
                    // unset and the candidate must actually carry one
                    _ => !cc.is_null && current.get(cc.name.as_str()).map_or(true, JsonValue::is_null),
                };
                if stage {
                    active.set(cc.column, cc.value.clone());
                    dirty = true;
                }
            }
            if dirty {
                active.update(conn).await?;
            }
            Ok(())
        }
    }
}

async fn insert_candidate<E, C>(conn: &C, prepared: &PreparedWrite<E>) -> Result<(), WriteError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelBehavior + Send,
{
    let mut active = <E::ActiveModel as ActiveModelTrait>::default();
    for cc in &prepared.columns {
        if !cc.is_null {
            active.set(cc.column, cc.value.clone());
        }
    }

    // Surrogate-key tables get their uuid generated here when the caller
    // addressed the row by business key alone.
    if let Some(pk) = single_uuid_pk::<E>() {
        let supplied = prepared
            .columns
            .iter()
            .any(|cc| cc.name == pk.as_str() && !cc.is_null);
        if !supplied {
            active.set(pk, Value::Uuid(Some(Box::new(Uuid::new_v4()))));
        }
    }

    active.insert(conn).await?;
    Ok(())
}

fn single_uuid_pk<E: EntityTrait>() -> Option<E::Column> {
    let mut keys = E::PrimaryKey::iter();
    let first = keys.next()?;
    if keys.next().is_some() {
        return None;
    }
    let column = first.into_column();
    matches!(column.def().get_column_type(), ColumnType::Uuid).then_some(column)
}

fn json_to_db_value(
    column_type: &ColumnType,
    column: &str,
    value: &JsonValue,
) -> Result<Value, WriteError> {
    let invalid = |expected: &'static str| WriteError::InvalidValue {
        column: column.to_owned(),
        expected,
    };

    match column_type {
        ColumnType::Uuid => {
            let raw = value.as_str().ok_or_else(|| invalid("a UUID string"))?;
            let parsed = Uuid::parse_str(raw).map_err(|_| invalid("a UUID string"))?;
            Ok(Value::Uuid(Some(Box::new(parsed))))
        }
        ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => {
            let raw = value.as_str().ok_or_else(|| invalid("a string"))?;
            Ok(Value::String(Some(Box::new(raw.to_owned()))))
        }
        ColumnType::SmallInteger => {
            let n = value.as_i64().ok_or_else(|| invalid("an integer"))?;
            let n = i16::try_from(n).map_err(|_| invalid("a 16-bit integer"))?;
            Ok(Value::SmallInt(Some(n)))
        }
        ColumnType::Integer => {
            let n = value.as_i64().ok_or_else(|| invalid("an integer"))?;
            let n = i32::try_from(n).map_err(|_| invalid("a 32-bit integer"))?;
            Ok(Value::Int(Some(n)))
        }
        ColumnType::BigInteger => {
            let n = value.as_i64().ok_or_else(|| invalid("an integer"))?;
            Ok(Value::BigInt(Some(n)))
        }
        ColumnType::Float => {
            let n = value.as_f64().ok_or_else(|| invalid("a number"))?;
            Ok(Value::Float(Some(n as f32)))
        }
        ColumnType::Double => {
            let n = value.as_f64().ok_or_else(|| invalid("a number"))?;
            Ok(Value::Double(Some(n)))
        }
        ColumnType::Boolean => {
            let b = value.as_bool().ok_or_else(|| invalid("a boolean"))?;
            Ok(Value::Bool(Some(b)))
        }
        ColumnType::TimestampWithTimeZone => {
            let raw = value
                .as_str()
                .ok_or_else(|| invalid("an RFC 3339 timestamp"))?;
            let parsed = chrono::DateTime::parse_from_rfc3339(raw)
                .map_err(|_| invalid("an RFC 3339 timestamp"))?;
            Ok(Value::ChronoDateTimeWithTimeZone(Some(Box::new(parsed))))
        }
        ColumnType::Json | ColumnType::JsonBinary => Ok(Value::Json(Some(Box::new(value.clone())))),
        _ => Err(invalid("a supported column type")),
    }
}

fn null_value(column_type: &ColumnType, column: &str) -> Result<Value, WriteError> {
    match column_type {
        ColumnType::Uuid => Ok(Value::Uuid(None)),
        ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => Ok(Value::String(None)),
        ColumnType::SmallInteger => Ok(Value::SmallInt(None)),
        ColumnType::Integer => Ok(Value::Int(None)),
        ColumnType::BigInteger => Ok(Value::BigInt(None)),
        ColumnType::Float => Ok(Value::Float(None)),
        ColumnType::Double => Ok(Value::Double(None)),
        ColumnType::Boolean => Ok(Value::Bool(None)),
        ColumnType::TimestampWithTimeZone => Ok(Value::ChronoDateTimeWithTimeZone(None)),
        ColumnType::Json | ColumnType::JsonBinary => Ok(Value::Json(None)),
        _ => Err(WriteError::InvalidValue {
            column: column.to_owned(),
            expected: "a supported column type",
        }),
    }
}
