use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub address: String,
    #[serde(default)]
    pub position: Option<usize>,
    #[serde(default)]
    pub order_ids: Vec<Uuid>,
    #[serde(default)]
    pub produced_kg: Option<f64>,
    #[serde(default)]
    pub packed_kg: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    /// Kilometers.
    pub distance: f64,
    /// Minutes.
    pub duration: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteSegment {
    pub distance: f64,
    pub duration: f64,
    pub steps: Vec<RouteStep>,
}

// Geometry is lat/lon pairs, distances km, durations minutes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteOption {
    pub id: String,
    pub name: String,
    pub description: String,
    pub total_distance: f64,
    pub total_duration: f64,
    pub geometry: Vec<[f64; 2]>,
    pub segments: Vec<RouteSegment>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteAlternatives {
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<RouteOption>,
    pub used_fallback: bool,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub total_distance: f64,
    pub total_duration: f64,
    pub waypoint_count: usize,
    pub order_count: usize,
    pub produced_kg: f64,
    pub packed_kg: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedRoute {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub waypoints: Vec<Waypoint>,
    pub route: RouteOption,
    pub metrics: RouteMetrics,
}

impl SavedRoute {
    pub fn new(
        name: String,
        waypoints: Vec<Waypoint>,
        route: RouteOption,
        metrics: RouteMetrics,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            waypoints,
            route,
            metrics,
        }
    }
}
