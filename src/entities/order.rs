use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::Coordinates;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_short_name: String,
    // As it appeared on the imported row.
    pub customer_name: String,
    pub delivery_date: Option<String>,
    pub rota: Option<String>,
    pub rota_normalized: Option<String>,
    pub cep: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub geocoded: bool,
    pub raw_data: Value,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.geocoded, self.lat, self.lon) {
            (true, Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    pub fn set_geocode(&mut self, coords: Option<Coordinates>, cep: Option<String>) {
        match coords {
            Some(coords) => {
                self.lat = Some(coords.lat);
                self.lon = Some(coords.lon);
                self.geocoded = true;
            }
            None => {
                self.lat = None;
                self.lon = None;
                self.geocoded = false;
            }
        }
        self.cep = cep;
    }

    // Delivery-address columns are not promoted to fields.
    pub fn raw_str(&self, column: &str) -> Option<&str> {
        self.raw_data
            .get(column)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
