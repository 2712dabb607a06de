use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{RouteAlternatives, RouteMetrics, RouteOption, SavedRoute, Waypoint};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct RouteParams {
    waypoints: Vec<Waypoint>,
}

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    name: String,
    waypoints: Vec<Waypoint>,
    route: RouteOption,
    metrics: RouteMetrics,
}

pub async fn optimize(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Json(params): Json<RouteParams>,
) -> Result<Json<RouteAlternatives>, Error> {
    let alternatives = api.optimize_route(user, params.waypoints).await?;

    Ok(alternatives.into())
}

pub async fn calculate(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Json(params): Json<RouteParams>,
) -> Result<Json<RouteAlternatives>, Error> {
    let alternatives = api.calculate_routes(user, params.waypoints).await?;

    Ok(alternatives.into())
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Json(params): Json<CreateParams>,
) -> Result<Json<SavedRoute>, Error> {
    let saved = api
        .save_route(user, params.name, params.waypoints, params.route, params.metrics)
        .await?;

    Ok(saved.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<SavedRoute>>, Error> {
    let routes = api.list_saved_routes(user).await?;

    Ok(routes.into())
}

pub async fn remove(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, Error> {
    api.delete_saved_route(user, id).await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}
