use axum::extract::{Extension, Json};

use crate::auth::User;
use crate::entities::Order;
use crate::error::Error;
use crate::server::DynAPI;

pub async fn list(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Order>>, Error> {
    let orders = api.list_orders(user).await?;

    Ok(orders.into())
}
