use super::Database;

use sqlx::pool::PoolConnection;
use sqlx::types::Json;
use sqlx::{Executor, Row, Transaction};
use uuid::Uuid;

use crate::entities::{Customer, GeocodeCacheEntry, GeocodeCacheKey, Order, SavedRoute};
use crate::error::{invalid_input_error, Error};

#[tracing::instrument(skip(conn))]
pub async fn fetch_customers(conn: &mut PoolConnection<Database>) -> Result<Vec<Customer>, Error> {
    let rows = conn
        .fetch_all(sqlx::query(
            "SELECT data FROM customers ORDER BY short_name ASC",
        ))
        .await?;

    rows.into_iter()
        .map(|row| {
            let Json(customer): Json<Customer> = row.try_get("data")?;
            Ok(customer)
        })
        .collect()
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_customer(
    conn: &mut PoolConnection<Database>,
    id: &Uuid,
) -> Result<Customer, Error> {
    let Json(customer): Json<Customer> = conn
        .fetch_optional(sqlx::query("SELECT data FROM customers WHERE id = $1").bind(id))
        .await?
        .ok_or_else(invalid_input_error)?
        .try_get("data")?;

    Ok(customer)
}

#[tracing::instrument(skip(conn, customer))]
pub async fn update_customer(
    conn: &mut PoolConnection<Database>,
    customer: &Customer,
) -> Result<(), Error> {
    conn.execute(
        sqlx::query("UPDATE customers SET short_name = $2, geocoded = $3, data = $4 WHERE id = $1")
            .bind(&customer.id)
            .bind(&customer.short_name)
            .bind(customer.geocoded)
            .bind(Json(customer)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx, customer))]
pub async fn insert_customer(
    tx: &mut Transaction<'_, Database>,
    customer: &Customer,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO customers (id, short_name, geocoded, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(&customer.id)
        .bind(&customer.short_name)
        .bind(customer.geocoded)
        .bind(Json(customer)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_orders(conn: &mut PoolConnection<Database>) -> Result<Vec<Order>, Error> {
    let rows = conn
        .fetch_all(sqlx::query(
            "SELECT data FROM orders ORDER BY customer_short_name ASC",
        ))
        .await?;

    rows.into_iter()
        .map(|row| {
            let Json(order): Json<Order> = row.try_get("data")?;
            Ok(order)
        })
        .collect()
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_orders_by_short_name(
    conn: &mut PoolConnection<Database>,
    short_name: &str,
) -> Result<Vec<Order>, Error> {
    let rows = conn
        .fetch_all(
            sqlx::query("SELECT data FROM orders WHERE customer_short_name = $1").bind(short_name),
        )
        .await?;

    rows.into_iter()
        .map(|row| {
            let Json(order): Json<Order> = row.try_get("data")?;
            Ok(order)
        })
        .collect()
}

#[tracing::instrument(skip(conn, order))]
pub async fn update_order(conn: &mut PoolConnection<Database>, order: &Order) -> Result<(), Error> {
    conn.execute(
        sqlx::query(
            "UPDATE orders SET customer_short_name = $2, geocoded = $3, data = $4 WHERE id = $1",
        )
        .bind(&order.id)
        .bind(&order.customer_short_name)
        .bind(order.geocoded)
        .bind(Json(order)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx, order))]
pub async fn insert_order(
    tx: &mut Transaction<'_, Database>,
    order: &Order,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO orders (id, customer_short_name, geocoded, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(&order.id)
        .bind(&order.customer_short_name)
        .bind(order.geocoded)
        .bind(Json(order)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(conn))]
pub async fn find_cache_entry(
    conn: &mut PoolConnection<Database>,
    key: &GeocodeCacheKey,
) -> Result<Option<GeocodeCacheEntry>, Error> {
    let maybe_row = conn
        .fetch_optional(
            sqlx::query(
                "SELECT lat, lon, provider, geocoded_at FROM geocode_cache
                 WHERE entity_type = $1 AND short_name = $2 AND cep = $3
                   AND address = $4 AND city = $5 AND state = $6",
            )
            .bind(&key.entity_type)
            .bind(&key.short_name)
            .bind(&key.cep)
            .bind(&key.address)
            .bind(&key.city)
            .bind(&key.state),
        )
        .await?;

    let row = match maybe_row {
        Some(row) => row,
        None => return Ok(None),
    };

    Ok(Some(GeocodeCacheEntry {
        key: key.clone(),
        lat: row.try_get("lat")?,
        lon: row.try_get("lon")?,
        provider: row.try_get("provider")?,
        geocoded_at: row.try_get("geocoded_at")?,
    }))
}

#[tracing::instrument(skip(conn))]
pub async fn fetch_saved_routes(
    conn: &mut PoolConnection<Database>,
) -> Result<Vec<SavedRoute>, Error> {
    let rows = conn
        .fetch_all(sqlx::query(
            "SELECT data FROM saved_routes ORDER BY created_at DESC",
        ))
        .await?;

    rows.into_iter()
        .map(|row| {
            let Json(route): Json<SavedRoute> = row.try_get("data")?;
            Ok(route)
        })
        .collect()
}

#[tracing::instrument(skip(conn, route))]
pub async fn insert_saved_route(
    conn: &mut PoolConnection<Database>,
    route: &SavedRoute,
) -> Result<(), Error> {
    conn.execute(
        sqlx::query("INSERT INTO saved_routes (id, name, created_at, data) VALUES ($1, $2, $3, $4)")
            .bind(&route.id)
            .bind(&route.name)
            .bind(route.created_at)
            .bind(Json(route)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(conn))]
pub async fn delete_saved_route(
    conn: &mut PoolConnection<Database>,
    id: &Uuid,
) -> Result<u64, Error> {
    let result = conn
        .execute(sqlx::query("DELETE FROM saved_routes WHERE id = $1").bind(id))
        .await?;

    Ok(result.rows_affected())
}

#[tracing::instrument(skip(conn, entry))]
pub async fn upsert_cache_entry(
    conn: &mut PoolConnection<Database>,
    entry: &GeocodeCacheEntry,
) -> Result<(), Error> {
    conn.execute(
        sqlx::query(
            "INSERT INTO geocode_cache
                 (entity_type, short_name, cep, address, city, state, lat, lon, provider, geocoded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (entity_type, short_name, cep, address, city, state)
             DO UPDATE SET lat = $7, lon = $8, provider = $9, geocoded_at = $10",
        )
        .bind(&entry.key.entity_type)
        .bind(&entry.key.short_name)
        .bind(&entry.key.cep)
        .bind(&entry.key.address)
        .bind(&entry.key.city)
        .bind(&entry.key.state)
        .bind(entry.lat)
        .bind(entry.lon)
        .bind(&entry.provider)
        .bind(entry.geocoded_at),
    )
    .await?;

    Ok(())
}
