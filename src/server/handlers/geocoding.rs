use axum::extract::{Extension, Json};

use crate::auth::User;
use crate::entities::{GeocodeProgress, GeocodeSummary};
use crate::error::Error;
use crate::server::DynAPI;

pub async fn run(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
) -> Result<Json<GeocodeSummary>, Error> {
    let (sender, receiver) = async_channel::unbounded::<GeocodeProgress>();

    tokio::spawn(async move {
        while let Ok(progress) = receiver.recv().await {
            tracing::info!(
                stage = ?progress.stage,
                processed = progress.processed,
                total = progress.total,
                label = progress.label.as_deref().unwrap_or(""),
                "geocoding progress"
            );
        }
    });

    let summary = api.geocode_pending(user, Some(sender)).await?;

    Ok(summary.into())
}
