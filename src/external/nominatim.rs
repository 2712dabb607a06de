// Nominatim's usage policy requires an identifying User-Agent.

use serde::{Deserialize, Serialize};
use std::env;

use crate::entities::Coordinates;
use crate::error::{upstream_error, Error};

const USER_AGENT: &str = "rotaplan/0.1";

fn api_base() -> String {
    env::var("NOMINATIM_API_BASE").unwrap_or_else(|_| "https://nominatim.openstreetmap.org".into())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ReverseResult {
    display_name: Option<String>,
}

#[tracing::instrument]
pub async fn search_address(
    query: &str,
    limit: u32,
    country_codes: Option<&str>,
) -> Result<Vec<SearchResult>, Error> {
    if query.len() < 3 {
        return Ok(vec![]);
    }

    let url = format!("{}/search", api_base());
    let mut request = reqwest::Client::new()
        .get(url)
        .header("User-Agent", USER_AGENT)
        .query(&[("q", query)])
        .query(&[("format", "json")])
        .query(&[("addressdetails", "1")])
        .query(&[("limit", limit.to_string())]);

    if let Some(codes) = country_codes {
        request = request.query(&[("countrycodes", codes)]);
    }

    let res = request.send().await?;

    if res.status().as_u16() != 200 {
        return Err(upstream_error());
    }

    Ok(res.json().await?)
}

#[tracing::instrument]
pub async fn geocode_search(query: &str) -> Result<Option<Coordinates>, Error> {
    let results = search_address(query, 1, Some("br")).await?;

    Ok(results.first().and_then(parse_coordinates))
}

pub fn parse_coordinates(result: &SearchResult) -> Option<Coordinates> {
    let lat = result.lat.parse::<f64>().ok()?;
    let lon = result.lon.parse::<f64>().ok()?;

    Some(Coordinates::new(lat, lon))
}

// Falls back to the bare coordinate pair when the lookup returns nothing.
#[tracing::instrument]
pub async fn reverse_geocode(coords: Coordinates) -> String {
    match try_reverse_geocode(coords).await {
        Ok(Some(name)) => name,
        _ => format!("{:.4}, {:.4}", coords.lat, coords.lon),
    }
}

async fn try_reverse_geocode(coords: Coordinates) -> Result<Option<String>, Error> {
    let url = format!("{}/reverse", api_base());
    let res = reqwest::Client::new()
        .get(url)
        .header("User-Agent", USER_AGENT)
        .query(&[("lat", coords.lat.to_string()), ("lon", coords.lon.to_string())])
        .query(&[("format", "json")])
        .send()
        .await?;

    if res.status().as_u16() != 200 {
        return Err(upstream_error());
    }

    let data: ReverseResult = res.json().await?;

    Ok(data.display_name)
}
