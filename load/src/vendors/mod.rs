//! Vendor-specific probe export parsers.
//!
//! Each parser turns an export file into the two things the loaders
//! consume: a [`ProbeKey`] plus a metadata candidate row for the vendor's
//! table, and a [`ProbeKey`] plus a series of [`ProbeReading`]s.

pub mod adva;
pub mod twst;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;

/// A supported probe vendor and the metadata table its parser feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum Vendor {
    #[strum(serialize = "ADVA")]
    #[serde(rename = "ADVA")]
    Adva,
    #[strum(serialize = "MicrochipTWST")]
    #[serde(rename = "MicrochipTWST")]
    MicrochipTwst,
}

impl Vendor {
    pub fn metadata_table(self) -> &'static str {
        match self {
            Vendor::Adva => "adva_metadata",
            Vendor::MicrochipTwst => "twst_metadata",
        }
    }

    pub fn all() -> Vec<Vendor> {
        Vendor::iter().collect()
    }
}

/// The business key identifying one probe: a vendor-assigned id plus the
/// address the export was pulled from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeKey {
    pub probe_id: String,
    pub ip_address: String,
}

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.ip_address, self.probe_id)
    }
}

/// One parsed time-series sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeReading {
    pub time: DateTime<FixedOffset>,
    pub value: f64,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unrecognized probe export file name: {0}")]
    UnrecognizedFileName(PathBuf),
    #[error("gzip-compressed exports are not supported: {0}")]
    UnsupportedCompression(PathBuf),
    #[error("malformed header on line {line}: {content}")]
    MalformedHeader { line: usize, content: String },
    #[error("malformed sample on line {line}: {content}")]
    MalformedSample { line: usize, content: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn probe_key_displays_as_ip_then_id() {
        let key = ProbeKey {
            probe_id: "TEST001".to_owned(),
            ip_address: "192.168.1.100".to_owned(),
        };
        assert_eq!(key.to_string(), "192.168.1.100_TEST001");
    }

    #[test]
    fn vendor_names_round_trip() {
        assert_eq!(Vendor::Adva.to_string(), "ADVA");
        assert_eq!(Vendor::MicrochipTwst.to_string(), "MicrochipTWST");
        assert_eq!(Vendor::from_str("adva").unwrap(), Vendor::Adva);
        assert_eq!(
            Vendor::from_str("microchiptwst").unwrap(),
            Vendor::MicrochipTwst
        );
        assert!(Vendor::from_str("NONEXISTENT").is_err());
    }

    #[test]
    fn vendor_metadata_tables_are_known() {
        for vendor in Vendor::all() {
            assert!(crate::registry::is_known_table(vendor.metadata_table()));
        }
    }
}
