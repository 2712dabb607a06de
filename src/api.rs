use async_channel::Sender;
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{
    Customer, GeocodeOutcome, GeocodeProgress, GeocodeSummary, Order, RouteAlternatives,
    RouteMetrics, RouteOption, SavedRoute, TransportadoraUpdate, Waypoint,
};
use crate::error::Error;
use crate::import::ImportOutcome;

#[async_trait]
pub trait CustomerAPI {
    async fn list_customers(&self, user: User) -> Result<Vec<Customer>, Error>;
    async fn set_transportadora(
        &self,
        user: User,
        id: Uuid,
        update: TransportadoraUpdate,
    ) -> Result<Customer, Error>;
    async fn geocode_transportadora(&self, user: User, id: Uuid) -> Result<GeocodeOutcome, Error>;
}

#[async_trait]
pub trait OrderAPI {
    async fn list_orders(&self, user: User) -> Result<Vec<Order>, Error>;
}

#[async_trait]
pub trait ImportAPI {
    async fn import_records(
        &self,
        user: User,
        customers: Option<Vec<Map<String, Value>>>,
        orders: Option<Vec<Map<String, Value>>>,
    ) -> Result<ImportOutcome, Error>;

    async fn clear_data(
        &self,
        user: User,
        clear_orders: bool,
        clear_customers: bool,
    ) -> Result<(), Error>;
}

#[async_trait]
pub trait GeocodeAPI {
    // Customers run to completion first so orders can reuse their
    // coordinates.
    async fn geocode_pending(
        &self,
        user: User,
        progress: Option<Sender<GeocodeProgress>>,
    ) -> Result<GeocodeSummary, Error>;
}

#[async_trait]
pub trait RouteAPI {
    async fn optimize_route(
        &self,
        user: User,
        waypoints: Vec<Waypoint>,
    ) -> Result<RouteAlternatives, Error>;
    async fn calculate_routes(
        &self,
        user: User,
        waypoints: Vec<Waypoint>,
    ) -> Result<RouteAlternatives, Error>;
    async fn save_route(
        &self,
        user: User,
        name: String,
        waypoints: Vec<Waypoint>,
        route: RouteOption,
        metrics: RouteMetrics,
    ) -> Result<SavedRoute, Error>;
    async fn list_saved_routes(&self, user: User) -> Result<Vec<SavedRoute>, Error>;
    async fn delete_saved_route(&self, user: User, id: Uuid) -> Result<(), Error>;
}

pub trait API: CustomerAPI + OrderAPI + ImportAPI + GeocodeAPI + RouteAPI {}
