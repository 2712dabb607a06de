mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{delete, get, patch, post},
    Router,
};

use crate::server::handlers::{customers, geocoding, imports, orders, routes};
use crate::{api::API, auth::User};

type DynAPI = Arc<dyn API + Send + Sync>;

pub async fn serve<T: API + Sync + Send + 'static>(api: T) {
    let api = Arc::new(api) as DynAPI;

    let app = Router::new()
        .route("/imports", post(imports::create))
        .route("/data", delete(imports::clear))
        .route("/customers", get(customers::list))
        .route(
            "/customers/:id/transportadora",
            patch(customers::set_transportadora),
        )
        .route(
            "/customers/:id/transportadora/geocode",
            post(customers::geocode_transportadora),
        )
        .route("/orders", get(orders::list))
        .route("/geocoding/run", post(geocoding::run))
        .route("/routes/optimize", post(routes::optimize))
        .route("/routes/calculate", post(routes::calculate))
        .route("/routes", post(routes::create).get(routes::list))
        .route("/routes/:id", delete(routes::remove))
        .layer(Extension(api))
        .layer(Extension(User::new_system_user()));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
