use serde::{Deserialize, Serialize};

// Accepted results must fall inside Brazil; providers occasionally resolve a
// bare CEP to a point on another continent.
const BRAZIL_MIN_LAT: f64 = -34.0;
const BRAZIL_MAX_LAT: f64 = 6.0;
const BRAZIL_MIN_LON: f64 = -74.0;
const BRAZIL_MAX_LON: f64 = -28.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_within_brazil(&self) -> bool {
        self.lat >= BRAZIL_MIN_LAT
            && self.lat <= BRAZIL_MAX_LAT
            && self.lon >= BRAZIL_MIN_LON
            && self.lon <= BRAZIL_MAX_LON
    }

    pub fn sanitize(maybe: Option<Coordinates>) -> Option<Coordinates> {
        maybe.filter(|coords| coords.is_within_brazil())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_points_outside_brazil() {
        let campinas = Coordinates::new(-22.9, -47.06);
        assert_eq!(Coordinates::sanitize(Some(campinas)), Some(campinas));

        let lisbon = Coordinates::new(38.72, -9.14);
        assert_eq!(Coordinates::sanitize(Some(lisbon)), None);
        assert_eq!(Coordinates::sanitize(None), None);
    }
}
