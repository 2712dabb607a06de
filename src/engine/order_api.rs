use super::helpers::fetch_orders;
use super::Engine;

use async_trait::async_trait;

use crate::api::OrderAPI;
use crate::auth::User;
use crate::entities::Order;
use crate::error::Error;

#[async_trait]
impl OrderAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_orders(&self, user: User) -> Result<Vec<Order>, Error> {
        let mut conn = self.pool.acquire().await?;

        fetch_orders(&mut conn).await
    }
}
