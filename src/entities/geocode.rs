use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;
use crate::normalize::{normalize_cep, normalize_text};

// Every field is normalized so the same entity always maps to the same row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeCacheKey {
    pub entity_type: String,
    pub short_name: String,
    pub cep: String,
    pub address: String,
    pub city: String,
    pub state: String,
}

impl GeocodeCacheKey {
    pub fn build(
        entity_type: &str,
        short_name: &str,
        cep: Option<&str>,
        address: Option<&str>,
        city: Option<&str>,
        state: Option<&str>,
    ) -> Self {
        Self {
            entity_type: entity_type.trim().to_lowercase(),
            short_name: normalize_text(short_name),
            cep: normalize_cep(cep.unwrap_or("")),
            address: normalize_text(address.unwrap_or("")),
            city: normalize_text(city.unwrap_or("")),
            state: normalize_text(state.unwrap_or("")),
        }
    }

    pub fn normalized_cep(&self) -> Option<String> {
        if self.cep.is_empty() {
            None
        } else {
            Some(self.cep.clone())
        }
    }
}

// Null coordinates record an explicit miss so a known-bad address is not
// retried on every batch run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodeCacheEntry {
    pub key: GeocodeCacheKey,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub provider: Option<String>,
    pub geocoded_at: DateTime<Utc>,
}

impl GeocodeCacheEntry {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Coordinates::sanitize(Some(Coordinates::new(lat, lon))),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeStage {
    Customers,
    Orders,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodeProgress {
    pub stage: GeocodeStage,
    pub processed: usize,
    pub total: usize,
    pub label: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct StageSummary {
    pub total: usize,
    pub geocoded: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct OrderStageSummary {
    pub total: usize,
    pub geocoded: usize,
    pub failed: usize,
    pub reused_from_customer: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct GeocodeSummary {
    pub customers: StageSummary,
    pub orders: OrderStageSummary,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodeOutcome {
    pub coords: Option<Coordinates>,
    pub cep: Option<String>,
    pub reused_from_customer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_normalizes_every_field() {
        let key = GeocodeCacheKey::build(
            " Customer ",
            "  acme  metais ",
            Some("13.054-703"),
            Some(" rua A,  10 "),
            Some("campinas"),
            Some("sp"),
        );

        assert_eq!(key.entity_type, "customer");
        assert_eq!(key.short_name, "ACME METAIS");
        assert_eq!(key.cep, "13054-703");
        assert_eq!(key.address, "RUA A, 10");
        assert_eq!(key.city, "CAMPINAS");
        assert_eq!(key.state, "SP");
        assert_eq!(key.normalized_cep(), Some("13054-703".into()));
    }

    #[test]
    fn identical_inputs_build_identical_keys() {
        let a = GeocodeCacheKey::build("customer", "Acme", Some("13054703"), None, None, None);
        let b = GeocodeCacheKey::build("CUSTOMER", " acme ", Some("13054-703"), None, None, None);
        assert_eq!(a, b);
        let c = GeocodeCacheKey::build("transportadora", " acme ", Some("13054-703"), None, None, None);
        assert_ne!(a, c);
    }

    #[test]
    fn cache_entry_with_null_coords_is_a_known_miss() {
        let key = GeocodeCacheKey::build("customer", "acme", None, None, None, None);
        let entry = GeocodeCacheEntry {
            key,
            lat: None,
            lon: None,
            provider: None,
            geocoded_at: Utc::now(),
        };
        assert!(entry.coordinates().is_none());
    }
}
