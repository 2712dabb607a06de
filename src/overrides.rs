// Route tags whose deliveries always go to a fixed drop-off point
// regardless of the order's own address.

use crate::entities::Coordinates;

pub const DEFAULT_CEP: &str = "13054-703";

const ZINCOLOR_ROTA: &str = "ENTREGAS ZINCOLOR";

pub fn predefined_route_coords(rota_normalized: &str) -> Option<Coordinates> {
    match rota_normalized {
        ZINCOLOR_ROTA => Some(Coordinates::new(-22.989473229980398, -47.11499624654793)),
        _ => None,
    }
}

pub fn default_cep_for_route(rota_normalized: &str) -> Option<&'static str> {
    match rota_normalized {
        ZINCOLOR_ROTA => Some(DEFAULT_CEP),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zincolor_route_has_fixed_coords_and_cep() {
        let coords = predefined_route_coords("ENTREGAS ZINCOLOR").unwrap();
        assert!(coords.is_within_brazil());
        assert_eq!(default_cep_for_route("ENTREGAS ZINCOLOR"), Some(DEFAULT_CEP));
        assert!(predefined_route_coords("OUTRA ROTA").is_none());
        assert!(default_cep_for_route("OUTRA ROTA").is_none());
    }
}
