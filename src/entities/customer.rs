use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::Coordinates;

// Alternate carrier delivery address that can override the customer's own.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transportadora {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub cep: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub geocoded: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportadoraUpdate {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub cep: Option<String>,
    pub use_transportadora: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    // Normalized; the key orders are matched against.
    pub short_name: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub cep: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub geocoded: bool,
    pub transportadora: Transportadora,
    pub use_transportadora: bool,
    pub raw_data: Value,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.geocoded, self.lat, self.lon) {
            (true, Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    pub fn set_geocode(&mut self, coords: Option<Coordinates>) {
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
    }

    pub fn apply_transportadora_update(&mut self, update: TransportadoraUpdate) {
        self.transportadora = Transportadora {
            address: update.address,
            city: update.city,
            state: update.state,
            cep: update.cep,
            lat: None,
            lon: None,
            geocoded: false,
        };
        self.use_transportadora = update.use_transportadora;
    }

    pub fn set_transportadora_geocode(&mut self, coords: Option<Coordinates>) {
        match coords {
            Some(coords) => {
                self.transportadora.lat = Some(coords.lat);
                self.transportadora.lon = Some(coords.lon);
                self.transportadora.geocoded = true;
            }
            None => {
                self.transportadora.lat = None;
                self.transportadora.lon = None;
                self.transportadora.geocoded = false;
            }
        }
    }
}
