mod customer_api;
mod geocode_api;
mod helpers;
mod import_api;
mod order_api;
mod route_api;

use sqlx::{Executor, Pool, Postgres};

use crate::api::API;
use crate::error::Error;
use crate::geocoder::Geocoder;

type Database = Postgres;

pub struct Engine {
    pool: Pool<Database>,
    geocoder: Geocoder,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(pool: Pool<Database>) -> Result<Self, Error> {
        pool.execute(
            "CREATE TABLE IF NOT EXISTS customers (id UUID PRIMARY KEY, short_name VARCHAR NOT NULL, geocoded BOOLEAN NOT NULL, data JSONB NOT NULL)",
        )
        .await?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS orders (id UUID PRIMARY KEY, customer_short_name VARCHAR NOT NULL, geocoded BOOLEAN NOT NULL, data JSONB NOT NULL)",
        )
        .await?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS geocode_cache (
                entity_type VARCHAR NOT NULL,
                short_name VARCHAR NOT NULL,
                cep VARCHAR NOT NULL,
                address VARCHAR NOT NULL,
                city VARCHAR NOT NULL,
                state VARCHAR NOT NULL,
                lat DOUBLE PRECISION,
                lon DOUBLE PRECISION,
                provider VARCHAR,
                geocoded_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (entity_type, short_name, cep, address, city, state)
            )",
        )
        .await?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS saved_routes (id UUID PRIMARY KEY, name VARCHAR NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)",
        )
        .await?;

        Ok(Self {
            pool,
            geocoder: Geocoder::new(),
        })
    }

}

impl API for Engine {}
