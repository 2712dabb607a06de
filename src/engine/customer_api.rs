use super::helpers::{
    fetch_customer, fetch_customers, fetch_orders_by_short_name, find_cache_entry,
    update_customer, update_order, upsert_cache_entry,
};
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::api::CustomerAPI;
use crate::auth::User;
use crate::entities::{
    Coordinates, Customer, GeocodeCacheEntry, GeocodeCacheKey, GeocodeOutcome,
    TransportadoraUpdate,
};
use crate::error::{geocode_error, invalid_input_error, Error};
use crate::normalize::normalize_address;

fn transportadora_cache_key(customer: &Customer) -> GeocodeCacheKey {
    GeocodeCacheKey::build(
        "transportadora",
        &customer.short_name,
        customer.transportadora.cep.as_deref(),
        customer.transportadora.address.as_deref(),
        customer.transportadora.city.as_deref(),
        customer.transportadora.state.as_deref(),
    )
}

fn transportadora_address_query(customer: &Customer) -> Option<String> {
    let parts: Vec<&str> = [
        customer.transportadora.address.as_deref(),
        customer.transportadora.city.as_deref(),
        customer.transportadora.state.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect();

    if parts.is_empty() {
        return None;
    }

    Some(normalize_address(parts))
}

impl Engine {
    // Applies a resolved carrier location to the customer and all its orders.
    async fn propagate_transportadora(
        &self,
        customer: &mut Customer,
        coords: Coordinates,
        cep: Option<String>,
    ) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        customer.set_transportadora_geocode(Some(coords));
        update_customer(&mut conn, customer).await?;

        let mut orders = fetch_orders_by_short_name(&mut conn, &customer.short_name).await?;
        for order in orders.iter_mut() {
            order.set_geocode(Some(coords), cep.clone());
            update_order(&mut conn, order).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CustomerAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_customers(&self, user: User) -> Result<Vec<Customer>, Error> {
        let mut conn = self.pool.acquire().await?;

        fetch_customers(&mut conn).await
    }

    #[tracing::instrument(skip(self))]
    async fn set_transportadora(
        &self,
        user: User,
        id: Uuid,
        update: TransportadoraUpdate,
    ) -> Result<Customer, Error> {
        let mut conn = self.pool.acquire().await?;

        let mut customer = fetch_customer(&mut conn, &id).await?;
        customer.apply_transportadora_update(update);
        update_customer(&mut conn, &customer).await?;

        Ok(customer)
    }

    #[tracing::instrument(skip(self))]
    async fn geocode_transportadora(&self, user: User, id: Uuid) -> Result<GeocodeOutcome, Error> {
        let mut customer = {
            let mut conn = self.pool.acquire().await?;
            fetch_customer(&mut conn, &id).await?
        };

        if !customer.use_transportadora {
            let mut conn = self.pool.acquire().await?;
            customer.set_transportadora_geocode(None);
            update_customer(&mut conn, &customer).await?;
            return Ok(GeocodeOutcome {
                coords: None,
                cep: None,
                reused_from_customer: false,
            });
        }

        let key = transportadora_cache_key(&customer);
        let cep_candidate = key.normalized_cep();
        let address = transportadora_address_query(&customer);

        if cep_candidate.is_none() && address.is_none() {
            return Err(invalid_input_error());
        }

        let cached = {
            let mut conn = self.pool.acquire().await?;
            find_cache_entry(&mut conn, &key).await?
        };
        if let Some(coords) = cached.and_then(|entry| entry.coordinates()) {
            self.propagate_transportadora(&mut customer, coords, cep_candidate.clone())
                .await?;
            return Ok(GeocodeOutcome {
                coords: Some(coords),
                cep: cep_candidate,
                reused_from_customer: false,
            });
        }

        if let Some(cep) = &cep_candidate {
            let coords = self
                .geocoder
                .lookup_cep(
                    cep,
                    customer.transportadora.city.as_deref(),
                    customer.transportadora.state.as_deref(),
                )
                .await;
            if let Some(coords) = coords {
                self.propagate_transportadora(&mut customer, coords, cep_candidate.clone())
                    .await?;
                let mut conn = self.pool.acquire().await?;
                upsert_cache_entry(
                    &mut conn,
                    &GeocodeCacheEntry {
                        key,
                        lat: Some(coords.lat),
                        lon: Some(coords.lon),
                        provider: Some("cep".into()),
                        geocoded_at: Utc::now(),
                    },
                )
                .await?;
                return Ok(GeocodeOutcome {
                    coords: Some(coords),
                    cep: cep_candidate,
                    reused_from_customer: false,
                });
            }
        }

        if let Some(address) = address {
            if let Some(coords) = self.geocoder.lookup(&address).await {
                let cep = cep_candidate
                    .clone()
                    .or_else(|| customer.transportadora.cep.clone());
                self.propagate_transportadora(&mut customer, coords, cep.clone())
                    .await?;
                let mut conn = self.pool.acquire().await?;
                upsert_cache_entry(
                    &mut conn,
                    &GeocodeCacheEntry {
                        key,
                        lat: Some(coords.lat),
                        lon: Some(coords.lon),
                        provider: Some("address".into()),
                        geocoded_at: Utc::now(),
                    },
                )
                .await?;
                return Ok(GeocodeOutcome {
                    coords: Some(coords),
                    cep,
                    reused_from_customer: false,
                });
            }
        }

        let mut conn = self.pool.acquire().await?;
        customer.set_transportadora_geocode(None);
        update_customer(&mut conn, &customer).await?;

        Err(geocode_error())
    }
}
