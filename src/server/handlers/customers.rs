use axum::extract::{Extension, Json, Path};
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{Customer, GeocodeOutcome, TransportadoraUpdate};
use crate::error::Error;
use crate::server::DynAPI;

pub async fn list(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Customer>>, Error> {
    let customers = api.list_customers(user).await?;

    Ok(customers.into())
}

pub async fn set_transportadora(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(params): Json<TransportadoraUpdate>,
) -> Result<Json<Customer>, Error> {
    let customer = api.set_transportadora(user, id, params).await?;

    Ok(customer.into())
}

pub async fn geocode_transportadora(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeocodeOutcome>, Error> {
    let outcome = api.geocode_transportadora(user, id).await?;

    Ok(outcome.into())
}
