use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A measurement site. `geom` holds the site position as EWKT text
/// (`SRID=<srid>;POINT(lon lat [z])`), composed from the `lat`/`lon`
/// candidate fields by [`fold_coordinates`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub geom: Option<String>,
    pub public: Option<bool>,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::probe_metadata::Entity")]
    ProbeMetadata,
}

impl Related<super::probe_metadata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProbeMetadata.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl crate::UniqueConstraints for Entity {
    fn unique_constraints() -> &'static [&'static [&'static str]] {
        &[&["name"]]
    }
}

const DEFAULT_SRID: u32 = 4326;

#[derive(Error, Debug)]
pub enum CoordinateError {
    #[error("'{0}' must be a number")]
    NotANumber(&'static str),
    #[error("'lat' and 'lon' must be supplied together")]
    IncompletePair,
    #[error("'projection' must be a positive integer")]
    BadProjection,
}

/// Collapses `lat`/`lon` (plus optional `z` and `projection`) fields of a
/// candidate row into a single EWKT `geom` value, removing the source keys.
///
/// Candidates without coordinate fields pass through untouched.
pub fn fold_coordinates(data: Value) -> Result<Value, CoordinateError> {
    let Value::Object(mut object) = data else {
        return Ok(data);
    };

    if !object.contains_key("lat") && !object.contains_key("lon") {
        return Ok(Value::Object(object));
    }

    let lat = take_number(&mut object, "lat")?.ok_or(CoordinateError::IncompletePair)?;
    let lon = take_number(&mut object, "lon")?.ok_or(CoordinateError::IncompletePair)?;
    let z = take_number(&mut object, "z")?;
    let srid = match object.remove("projection") {
        Some(value) => value.as_u64().ok_or(CoordinateError::BadProjection)? as u32,
        None => DEFAULT_SRID,
    };

    let point = match z {
        Some(z) => format!("SRID={srid};POINT({lon} {lat} {z})"),
        None => format!("SRID={srid};POINT({lon} {lat})"),
    };
    object.insert("geom".to_owned(), Value::String(point));

    Ok(Value::Object(object))
}

fn take_number(
    object: &mut Map<String, Value>,
    key: &'static str,
) -> Result<Option<f64>, CoordinateError> {
    match object.remove(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or(CoordinateError::NotANumber(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn folds_lat_lon_into_ewkt_point() {
        let data = json!({"name": "site", "lat": 35.0844, "lon": -106.6504});
        let folded = fold_coordinates(data).unwrap();

        assert_eq!(
            folded["geom"],
            json!("SRID=4326;POINT(-106.6504 35.0844)")
        );
        assert!(folded.get("lat").is_none());
        assert!(folded.get("lon").is_none());
    }

    #[test]
    fn respects_z_and_projection() {
        let data = json!({"name": "site", "lat": 1.0, "lon": 2.0, "z": 3.5, "projection": 3857});
        let folded = fold_coordinates(data).unwrap();

        assert_eq!(folded["geom"], json!("SRID=3857;POINT(2 1 3.5)"));
    }

    #[test]
    fn passes_through_without_coordinates() {
        let data = json!({"name": "site", "public": true});
        assert_eq!(fold_coordinates(data.clone()).unwrap(), data);
    }

    #[test]
    fn rejects_half_a_coordinate_pair() {
        let data = json!({"name": "site", "lat": 1.0});
        assert!(matches!(
            fold_coordinates(data),
            Err(CoordinateError::IncompletePair)
        ));
    }
}
