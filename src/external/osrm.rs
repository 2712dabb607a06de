// OSRM distances come back in meters and durations in seconds.

use serde::{Deserialize, Serialize};
use std::env;

use crate::entities::{RouteOption, RouteSegment, RouteStep, Waypoint};
use crate::error::{upstream_error, Error};

fn api_base() -> String {
    env::var("OSRM_API_BASE").unwrap_or_else(|_| "https://router.project-osrm.org".into())
}

fn coordinate_path(waypoints: &[Waypoint]) -> String {
    waypoints
        .iter()
        .map(|wp| format!("{},{}", wp.lon, wp.lat))
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineGeometry {
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Maneuver {
    pub instruction: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub distance: f64,
    pub duration: f64,
    pub maneuver: Option<Maneuver>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Leg {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Route {
    pub distance: f64,
    pub duration: f64,
    pub geometry: LineGeometry,
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteResponse {
    pub code: String,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TripWaypoint {
    pub waypoint_index: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TripResponse {
    pub code: String,
    #[serde(default)]
    pub waypoints: Vec<TripWaypoint>,
}

#[tracing::instrument(skip(waypoints))]
pub async fn route(waypoints: &[Waypoint], alternatives: bool) -> Result<RouteResponse, Error> {
    let url = format!(
        "{}/route/v1/driving/{}",
        api_base(),
        coordinate_path(waypoints)
    );
    let mut request = reqwest::Client::new()
        .get(url)
        .query(&[("overview", "full")])
        .query(&[("geometries", "geojson")])
        .query(&[("steps", "true")]);

    if alternatives {
        request = request.query(&[("alternatives", "2")]);
    }

    let res = request.send().await?;

    if res.status().as_u16() != 200 {
        return Err(upstream_error());
    }

    let data: RouteResponse = res.json().await?;

    if data.code != "Ok" {
        return Err(upstream_error());
    }

    Ok(data)
}

// Visiting order keeping the first waypoint as start and the last as end.
#[tracing::instrument(skip(waypoints))]
pub async fn trip_order(waypoints: &[Waypoint]) -> Result<Vec<usize>, Error> {
    let url = format!(
        "{}/trip/v1/driving/{}",
        api_base(),
        coordinate_path(waypoints)
    );
    let res = reqwest::Client::new()
        .get(url)
        .query(&[("source", "first")])
        .query(&[("destination", "last")])
        .query(&[("roundtrip", "false")])
        .send()
        .await?;

    if res.status().as_u16() != 200 {
        return Err(upstream_error());
    }

    let data: TripResponse = res.json().await?;

    if data.code != "Ok" {
        return Err(upstream_error());
    }

    Ok(data.waypoints.iter().map(|wp| wp.waypoint_index).collect())
}

pub fn route_options(response: &RouteResponse) -> Vec<RouteOption> {
    response
        .routes
        .iter()
        .take(3)
        .enumerate()
        .map(|(index, route)| RouteOption {
            id: format!("osrm-{}", index),
            name: if index == 0 {
                "Rota Principal (OSRM)".into()
            } else {
                format!("Rota Alternativa {} (OSRM)", index)
            },
            description: if index == 0 {
                "Rota recomendada pelo OSRM".into()
            } else {
                format!("Opção alternativa {}", index)
            },
            total_distance: route.distance / 1000.0,
            total_duration: route.duration / 60.0,
            geometry: route
                .geometry
                .coordinates
                .iter()
                .map(|&[lon, lat]| [lat, lon])
                .collect(),
            segments: route
                .legs
                .iter()
                .map(|leg| RouteSegment {
                    distance: leg.distance / 1000.0,
                    duration: leg.duration / 60.0,
                    steps: leg
                        .steps
                        .iter()
                        .map(|step| RouteStep {
                            instruction: step
                                .maneuver
                                .as_ref()
                                .and_then(|m| m.instruction.clone())
                                .unwrap_or_else(|| "Continue".into()),
                            distance: step.distance / 1000.0,
                            duration: step.duration / 60.0,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_options_convert_meters_and_seconds() {
        let response: RouteResponse = serde_json::from_value(json!({
            "code": "Ok",
            "routes": [{
                "distance": 15000.0,
                "duration": 1200.0,
                "geometry": { "coordinates": [[-47.11, -22.98], [-47.06, -22.90]] },
                "legs": [{
                    "distance": 15000.0,
                    "duration": 1200.0,
                    "steps": [{
                        "distance": 500.0,
                        "duration": 60.0,
                        "maneuver": { "instruction": "Vire à direita" }
                    }, {
                        "distance": 500.0,
                        "duration": 60.0,
                        "maneuver": null
                    }]
                }]
            }]
        }))
        .unwrap();

        let options = route_options(&response);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].id, "osrm-0");
        assert_eq!(options[0].name, "Rota Principal (OSRM)");
        assert_eq!(options[0].total_distance, 15.0);
        assert_eq!(options[0].total_duration, 20.0);
        assert_eq!(options[0].geometry, vec![[-22.98, -47.11], [-22.90, -47.06]]);

        let steps = &options[0].segments[0].steps;
        assert_eq!(steps[0].instruction, "Vire à direita");
        assert_eq!(steps[1].instruction, "Continue");
        assert_eq!(steps[0].distance, 0.5);
    }

    #[test]
    fn route_options_caps_alternatives_at_three() {
        let route = json!({
            "distance": 1000.0,
            "duration": 60.0,
            "geometry": { "coordinates": [] },
            "legs": []
        });
        let response: RouteResponse = serde_json::from_value(json!({
            "code": "Ok",
            "routes": [route.clone(), route.clone(), route.clone(), route]
        }))
        .unwrap();

        let options = route_options(&response);
        assert_eq!(options.len(), 3);
        assert_eq!(options[1].name, "Rota Alternativa 1 (OSRM)");
        assert_eq!(options[2].name, "Rota Alternativa 2 (OSRM)");
    }

    #[test]
    fn coordinate_path_is_lon_lat_semicolon_separated() {
        let waypoints = vec![
            Waypoint {
                id: "a".into(),
                lat: -22.98,
                lon: -47.11,
                address: String::new(),
                position: None,
                order_ids: vec![],
                produced_kg: None,
                packed_kg: None,
            },
            Waypoint {
                id: "b".into(),
                lat: -22.90,
                lon: -47.06,
                address: String::new(),
                position: None,
                order_ids: vec![],
                produced_kg: None,
                packed_kg: None,
            },
        ];

        assert_eq!(coordinate_path(&waypoints), "-47.11,-22.98;-47.06,-22.9");
    }
}
