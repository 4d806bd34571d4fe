//! Test utilities and proptest strategies for model types.
//!
//! This module is only available when the `testing` feature is enabled.

use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for location names that satisfy the `name` unique constraint
/// without colliding across cases.
pub fn arb_location_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_-]{3,24}").unwrap()
}

prop_compose! {
    /// Strategy for candidate `locations` rows as a caller would supply
    /// them: a business key plus raw coordinates, no surrogate uuid.
    pub fn arb_location_candidate()(
        name in arb_location_name(),
        lat in -90.0..90.0f64,
        lon in -180.0..180.0f64,
        public in any::<bool>(),
    ) -> Value {
        json!({
            "name": name,
            "lat": lat,
            "lon": lon,
            "public": public,
        })
    }
}

prop_compose! {
    /// Strategy for candidate `probe_metadata` rows keyed by the
    /// (`probe_id`, `ip_address`) unique constraint.
    pub fn arb_probe_candidate()(
        probe_id in proptest::string::string_regex("[0-9]-[0-9]{1,2}").unwrap(),
        octet in 1..254u8,
        vendor in prop_oneof![Just("ADVA"), Just("MicrochipTWST")],
    ) -> Value {
        json!({
            "probe_id": probe_id,
            "ip_address": format!("10.0.0.{octet}"),
            "vendor": vendor,
        })
    }
}
