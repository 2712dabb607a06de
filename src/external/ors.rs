use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;

use crate::entities::{Coordinates, RouteOption, RouteSegment, RouteStep, Waypoint};
use crate::error::{invalid_input_error, upstream_error, Error};

fn api_base() -> String {
    env::var("ORS_API_BASE").unwrap_or_else(|_| "https://api.openrouteservice.org".into())
}

pub fn api_key() -> Option<String> {
    env::var("ORS_API_KEY").ok().filter(|key| !key.is_empty())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PointGeometry {
    pub coordinates: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodeFeature {
    pub geometry: PointGeometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub features: Vec<GeocodeFeature>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineGeometry {
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Summary {
    pub distance: f64,
    pub duration: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectionsStep {
    pub instruction: String,
    pub distance: f64,
    pub duration: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectionsSegment {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub steps: Vec<DirectionsStep>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectionsProperties {
    pub summary: Summary,
    #[serde(default)]
    pub segments: Vec<DirectionsSegment>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectionsFeature {
    pub properties: DirectionsProperties,
    pub geometry: LineGeometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub features: Vec<DirectionsFeature>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizationStep {
    #[serde(rename = "type")]
    pub kind: String,
    pub job: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizationRoute {
    #[serde(default)]
    pub steps: Vec<OptimizationStep>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizationResponse {
    #[serde(default)]
    pub routes: Vec<OptimizationRoute>,
}

// Returns Ok(None) when no API key is configured so callers can move on to
// the fallback provider.
#[tracing::instrument]
pub async fn geocode_search(query: &str) -> Result<Option<Coordinates>, Error> {
    let key = match api_key() {
        Some(key) => key,
        None => return Ok(None),
    };

    let url = format!("{}/geocode/search", api_base());
    let res = reqwest::Client::new()
        .get(url)
        .header("Accept", "application/json")
        .query(&[("api_key", key.as_str())])
        .query(&[("text", query)])
        .query(&[("boundary.country", "BR")])
        .query(&[("size", "1")])
        .send()
        .await?;

    let status_code = res.status().as_u16();

    if status_code >= 400 && status_code < 500 {
        return Err(invalid_input_error());
    } else if status_code != 200 {
        return Err(upstream_error());
    }

    let data: GeocodeResponse = res.json().await?;

    Ok(first_coordinates(&data))
}

pub fn first_coordinates(response: &GeocodeResponse) -> Option<Coordinates> {
    let coordinates = &response.features.first()?.geometry.coordinates;
    if coordinates.len() < 2 {
        return None;
    }

    // GeoJSON order is lon, lat.
    Some(Coordinates::new(coordinates[1], coordinates[0]))
}

// Coordinates are lon/lat pairs; distances come back in km, durations in
// seconds.
#[tracing::instrument(skip(coordinates))]
pub async fn directions(
    coordinates: &[[f64; 2]],
    preference: &str,
) -> Result<DirectionsResponse, Error> {
    let key = env::var("ORS_API_KEY")?;

    let url = format!("{}/v2/directions/driving-car/geojson", api_base());
    let res = reqwest::Client::new()
        .post(url)
        .header("Authorization", key)
        .json(&json!({
            "coordinates": coordinates,
            "preference": preference,
            "instructions": true,
            "units": "km",
        }))
        .send()
        .await?;

    let status_code = res.status().as_u16();

    if status_code >= 400 && status_code < 500 {
        return Err(invalid_input_error());
    } else if status_code != 200 {
        return Err(upstream_error());
    }

    Ok(res.json().await?)
}

// Returns destination indexes in visit order, starting and ending at start.
#[tracing::instrument(skip(start, destinations))]
pub async fn optimize(start: &Waypoint, destinations: &[Waypoint]) -> Result<Vec<usize>, Error> {
    let key = env::var("ORS_API_KEY")?;

    let jobs: Vec<_> = destinations
        .iter()
        .enumerate()
        .map(|(index, wp)| json!({ "id": index, "location": [wp.lon, wp.lat] }))
        .collect();
    let vehicles = json!([{
        "id": 1,
        "profile": "driving-car",
        "start": [start.lon, start.lat],
        "end": [start.lon, start.lat],
    }]);

    let url = format!("{}/optimization", api_base());
    let res = reqwest::Client::new()
        .post(url)
        .header("Authorization", key)
        .json(&json!({ "jobs": jobs, "vehicles": vehicles }))
        .send()
        .await?;

    let status_code = res.status().as_u16();

    if status_code >= 400 && status_code < 500 {
        return Err(invalid_input_error());
    } else if status_code != 200 {
        return Err(upstream_error());
    }

    let data: OptimizationResponse = res.json().await?;

    Ok(job_order(&data))
}

pub fn job_order(response: &OptimizationResponse) -> Vec<usize> {
    response
        .routes
        .first()
        .map(|route| {
            route
                .steps
                .iter()
                .filter(|step| step.kind == "job")
                .filter_map(|step| step.job)
                .collect()
        })
        .unwrap_or_default()
}

// Geometry is flipped into lat/lon pairs, durations into minutes.
pub fn route_option(
    response: &DirectionsResponse,
    id: &str,
    name: &str,
    description: &str,
) -> Option<RouteOption> {
    let feature = response.features.first()?;
    let props = &feature.properties;

    Some(RouteOption {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        total_distance: props.summary.distance,
        total_duration: props.summary.duration / 60.0,
        geometry: feature
            .geometry
            .coordinates
            .iter()
            .map(|&[lon, lat]| [lat, lon])
            .collect(),
        segments: props
            .segments
            .iter()
            .map(|seg| RouteSegment {
                distance: seg.distance,
                duration: seg.duration / 60.0,
                steps: seg
                    .steps
                    .iter()
                    .map(|step| RouteStep {
                        instruction: step.instruction.clone(),
                        distance: step.distance,
                        duration: step.duration / 60.0,
                    })
                    .collect(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_coordinates_flips_geojson_order() {
        let response: GeocodeResponse = serde_json::from_value(json!({
            "features": [{ "geometry": { "coordinates": [-47.11, -22.98] } }]
        }))
        .unwrap();

        let coords = first_coordinates(&response).unwrap();
        assert_eq!(coords.lat, -22.98);
        assert_eq!(coords.lon, -47.11);
    }

    #[test]
    fn first_coordinates_handles_empty_responses() {
        let response: GeocodeResponse = serde_json::from_value(json!({})).unwrap();
        assert!(first_coordinates(&response).is_none());

        let short: GeocodeResponse = serde_json::from_value(json!({
            "features": [{ "geometry": { "coordinates": [-47.11] } }]
        }))
        .unwrap();
        assert!(first_coordinates(&short).is_none());
    }

    #[test]
    fn job_order_keeps_only_job_steps() {
        let response: OptimizationResponse = serde_json::from_value(json!({
            "routes": [{
                "steps": [
                    { "type": "start", "job": null },
                    { "type": "job", "job": 2 },
                    { "type": "job", "job": 0 },
                    { "type": "job", "job": 1 },
                    { "type": "end", "job": null }
                ]
            }]
        }))
        .unwrap();

        assert_eq!(job_order(&response), vec![2, 0, 1]);
    }

    #[test]
    fn route_option_converts_durations_and_flips_geometry() {
        let response: DirectionsResponse = serde_json::from_value(json!({
            "features": [{
                "properties": {
                    "summary": { "distance": 12.5, "duration": 1800.0 },
                    "segments": [{
                        "distance": 12.5,
                        "duration": 1800.0,
                        "steps": [{
                            "instruction": "Siga em frente",
                            "distance": 12.5,
                            "duration": 1800.0
                        }]
                    }]
                },
                "geometry": { "coordinates": [[-47.11, -22.98], [-47.06, -22.90]] }
            }]
        }))
        .unwrap();

        let option = route_option(&response, "fastest", "Rota Mais Rápida", "desc").unwrap();
        assert_eq!(option.total_distance, 12.5);
        assert_eq!(option.total_duration, 30.0);
        assert_eq!(option.geometry, vec![[-22.98, -47.11], [-22.90, -47.06]]);
        assert_eq!(option.segments[0].steps[0].duration, 30.0);
        assert_eq!(option.segments[0].steps[0].instruction, "Siga em frente");
    }

    #[test]
    fn route_option_is_none_without_features() {
        let response: DirectionsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(route_option(&response, "fastest", "n", "d").is_none());
    }
}
