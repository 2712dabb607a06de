use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::User;
use crate::error::Error;
use crate::import::ImportOutcome;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    customers: Option<Vec<Map<String, Value>>>,
    orders: Option<Vec<Map<String, Value>>>,
}

#[derive(Serialize, Deserialize)]
pub struct ClearParams {
    #[serde(default)]
    orders: bool,
    #[serde(default)]
    customers: bool,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Json(params): Json<CreateParams>,
) -> Result<Json<ImportOutcome>, Error> {
    let outcome = api
        .import_records(user, params.customers, params.orders)
        .await?;

    Ok(outcome.into())
}

pub async fn clear(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Json(params): Json<ClearParams>,
) -> Result<Json<Value>, Error> {
    api.clear_data(user, params.orders, params.customers).await?;

    Ok(Json(serde_json::json!({ "cleared": true })))
}
