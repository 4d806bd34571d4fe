//! Parser for Microchip TWST modem exports.
//!
//! File names follow `<ip>TWST-<modem>-YYYY-MM-DD-HH-MM-SS.csv`; the body
//! is a `# Key: value` preamble followed by `"<rfc3339>,<value>"` rows.

use super::{ParseError, ProbeKey, ProbeReading};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use regex::Regex;
use sea_orm::{IdenStatic, Iterable};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static FILE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<ip>\d{1,3}(?:\.\d{1,3}){3})TWST-(?P<modem>[A-Za-z0-9]+)-(?P<ts>\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2})\.csv$",
    )
    .expect("regex")
});

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

pub struct TwstProbe {
    pub input_file: PathBuf,
    pub probe_key: ProbeKey,
    pub start_time: DateTime<FixedOffset>,
}

impl TwstProbe {
    pub fn new(input_file: impl Into<PathBuf>) -> Result<Self, ParseError> {
        let input_file = input_file.into();
        let (probe_key, start_time) = Self::parse_file_name(&input_file)?;
        Ok(Self {
            input_file,
            probe_key,
            start_time,
        })
    }

    pub fn parse_file_name(
        path: &Path,
    ) -> Result<(ProbeKey, DateTime<FixedOffset>), ParseError> {
        let unrecognized = || ParseError::UnrecognizedFileName(path.to_path_buf());

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(unrecognized)?;
        let captures = FILE_NAME_RE.captures(name).ok_or_else(unrecognized)?;
        let start_time = NaiveDateTime::parse_from_str(&captures["ts"], TIMESTAMP_FORMAT)
            .map_err(|_| unrecognized())?
            .and_utc()
            .fixed_offset();

        Ok((
            ProbeKey {
                probe_id: captures["modem"].to_owned(),
                ip_address: captures["ip"].to_owned(),
            },
            start_time,
        ))
    }

    pub fn process_metadata(&self) -> Result<Value, ParseError> {
        let content = fs::read_to_string(&self.input_file)?;
        let mut metadata = Map::new();
        metadata.insert("modem_id".to_owned(), json!(self.probe_key.probe_id));

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            let Some(rest) = line.strip_prefix('#') else {
                break;
            };
            if rest.trim().is_empty() {
                continue;
            }
            let (key, value) = rest.split_once(':').ok_or_else(|| ParseError::MalformedHeader {
                line: index + 1,
                content: line.to_owned(),
            })?;

            let column = key.trim().to_ascii_lowercase().replace(' ', "_");
            if !is_metadata_column(&column) {
                tracing::debug!(header = %column, "skipping header without a metadata column");
                continue;
            }
            metadata.insert(column, parse_scalar(value.trim()));
        }

        Ok(Value::Object(metadata))
    }

    pub fn process_time_data(&self) -> Result<Vec<ProbeReading>, ParseError> {
        let content = fs::read_to_string(&self.input_file)?;
        let mut readings = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("time,") {
                continue;
            }
            let malformed = || ParseError::MalformedSample {
                line: index + 1,
                content: line.to_owned(),
            };

            let (time, value) = line.split_once(',').ok_or_else(malformed)?;
            let time = DateTime::parse_from_rfc3339(time.trim()).map_err(|_| malformed())?;
            let value: f64 = value.trim().parse().map_err(|_| malformed())?;

            readings.push(ProbeReading { time, value });
        }

        Ok(readings)
    }
}

fn is_metadata_column(name: &str) -> bool {
    model::twst_metadata::Column::iter().any(|column| column.as_str() == name)
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return json!(n);
    }
    if let Ok(x) = raw.parse::<f64>() {
        return json!(x);
    }
    json!(raw)
}
