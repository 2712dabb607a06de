use super::helpers::{
    fetch_customers, fetch_orders, find_cache_entry, update_customer, update_order,
    upsert_cache_entry,
};
use super::Engine;

use async_channel::Sender;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;

use crate::api::GeocodeAPI;
use crate::auth::User;
use crate::entities::{
    Coordinates, Customer, GeocodeCacheEntry, GeocodeCacheKey, GeocodeOutcome, GeocodeProgress,
    GeocodeStage, GeocodeSummary, Order, OrderStageSummary, StageSummary,
};
use crate::error::Error;
use crate::normalize::{normalize_address, normalize_cep, parse_city_state};
use crate::overrides;

fn customer_cache_key(customer: &Customer) -> GeocodeCacheKey {
    GeocodeCacheKey::build(
        "customer",
        &customer.short_name,
        customer.cep.as_deref(),
        customer.address.as_deref(),
        customer.city.as_deref(),
        customer.state.as_deref(),
    )
}

fn customer_address_query(customer: &Customer) -> Option<String> {
    let parts: Vec<&str> = [
        customer.address.as_deref(),
        customer.city.as_deref(),
        customer.state.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        return None;
    }

    Some(normalize_address(parts))
}

fn order_cep_candidate(order: &Order) -> Option<String> {
    let from_columns = order
        .cep
        .as_deref()
        .or_else(|| order.raw_str("CEP"))
        .or_else(|| order.raw_str("Cep"))
        .or_else(|| order.raw_str("CEP Entrega"));

    let cep = from_columns
        .map(normalize_cep)
        .filter(|cep| !cep.is_empty());
    if cep.is_some() {
        return cep;
    }

    order
        .rota_normalized
        .as_deref()
        .and_then(overrides::default_cep_for_route)
        .map(String::from)
}

// "Cidade Entrega" cells read "Campinas - SP", "Campinas-SP" or just the
// city; the first hyphen separates city from state regardless of spacing.
fn city_cell_query(cidade: &str) -> String {
    match cidade.split_once('-') {
        Some((city, state)) => format!("{}, {}", city.trim_end(), state.trim_start()),
        None => cidade.to_string(),
    }
}

fn order_address_query(order: &Order, customer: Option<&Customer>) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(local) = order.raw_str("Local Entrega") {
        parts.push(local.to_string());
    }

    if let Some(cidade) = order.raw_str("Cidade Entrega") {
        parts.push(city_cell_query(cidade));
    } else if let Some(customer) = customer {
        let fallback: Vec<&str> = [customer.city.as_deref(), customer.state.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !fallback.is_empty() {
            parts.push(fallback.join(", "));
        }
    }

    if parts.is_empty() {
        return None;
    }

    Some(normalize_address(parts))
}

impl Engine {
    // Cache first, then CEP, then address. The result, miss included, is
    // written back to both the customer row and the cache.
    #[tracing::instrument(skip(self, customer), fields(short_name = %customer.short_name))]
    pub(super) async fn geocode_customer_record(
        &self,
        customer: &mut Customer,
    ) -> Result<GeocodeOutcome, Error> {
        let key = customer_cache_key(customer);
        let cep_candidate = key.normalized_cep();

        let mut conn = self.pool.acquire().await?;

        if let Some(entry) = find_cache_entry(&mut conn, &key).await? {
            let coords = entry.coordinates();
            customer.set_geocode(coords);
            update_customer(&mut conn, customer).await?;
            return Ok(GeocodeOutcome {
                coords,
                cep: cep_candidate,
                reused_from_customer: false,
            });
        }

        if let Some(cep) = &cep_candidate {
            let coords = self
                .geocoder
                .lookup_cep(cep, customer.city.as_deref(), customer.state.as_deref())
                .await;
            if let Some(coords) = coords {
                customer.set_geocode(Some(coords));
                update_customer(&mut conn, customer).await?;
                upsert_cache_entry(&mut conn, &cache_hit(&key, coords, "cep")).await?;
                return Ok(GeocodeOutcome {
                    coords: Some(coords),
                    cep: cep_candidate,
                    reused_from_customer: false,
                });
            }
        }

        if let Some(address) = customer_address_query(customer) {
            if let Some(coords) = self.geocoder.lookup(&address).await {
                customer.set_geocode(Some(coords));
                update_customer(&mut conn, customer).await?;
                upsert_cache_entry(&mut conn, &cache_hit(&key, coords, "address")).await?;
                return Ok(GeocodeOutcome {
                    coords: Some(coords),
                    cep: cep_candidate,
                    reused_from_customer: false,
                });
            }
        }

        customer.set_geocode(None);
        update_customer(&mut conn, customer).await?;
        upsert_cache_entry(&mut conn, &cache_miss(&key)).await?;

        Ok(GeocodeOutcome {
            coords: None,
            cep: cep_candidate,
            reused_from_customer: false,
        })
    }

    // Priority order: predefined route override, geocoded parent customer,
    // CEP, free-text address, unresolved.
    #[tracing::instrument(skip(self, order, customer), fields(order_id = %order.id))]
    pub(super) async fn geocode_order_record(
        &self,
        order: &mut Order,
        customer: Option<&Customer>,
    ) -> Result<GeocodeOutcome, Error> {
        let rota = order.rota_normalized.clone().unwrap_or_default();
        let cep_candidate = order_cep_candidate(order);

        let mut conn = self.pool.acquire().await?;

        if let Some(coords) = overrides::predefined_route_coords(&rota) {
            let cep = cep_candidate
                .clone()
                .or_else(|| customer.and_then(|c| c.cep.clone()))
                .or_else(|| Some(overrides::DEFAULT_CEP.into()));
            order.set_geocode(Some(coords), cep.clone());
            update_order(&mut conn, order).await?;
            return Ok(GeocodeOutcome {
                coords: Some(coords),
                cep,
                reused_from_customer: false,
            });
        }

        if let Some(coords) = customer.and_then(Customer::coordinates) {
            let cep = cep_candidate
                .clone()
                .or_else(|| customer.and_then(|c| c.cep.clone()));
            order.set_geocode(Some(coords), cep.clone());
            update_order(&mut conn, order).await?;
            return Ok(GeocodeOutcome {
                coords: Some(coords),
                cep,
                reused_from_customer: true,
            });
        }

        if let Some(cep) = &cep_candidate {
            let (delivery_city, delivery_state) = order
                .raw_str("Cidade Entrega")
                .map(parse_city_state)
                .unwrap_or((None, None));
            let city = delivery_city.or_else(|| customer.and_then(|c| c.city.clone()));
            let state = delivery_state.or_else(|| customer.and_then(|c| c.state.clone()));

            let coords = self
                .geocoder
                .lookup_cep(cep, city.as_deref(), state.as_deref())
                .await;
            if let Some(coords) = coords {
                order.set_geocode(Some(coords), cep_candidate.clone());
                update_order(&mut conn, order).await?;
                return Ok(GeocodeOutcome {
                    coords: Some(coords),
                    cep: cep_candidate,
                    reused_from_customer: false,
                });
            }
        }

        if let Some(address) = order_address_query(order, customer) {
            if let Some(coords) = self.geocoder.lookup(&address).await {
                order.set_geocode(Some(coords), cep_candidate.clone());
                update_order(&mut conn, order).await?;
                return Ok(GeocodeOutcome {
                    coords: Some(coords),
                    cep: cep_candidate,
                    reused_from_customer: false,
                });
            }
        }

        order.set_geocode(None, cep_candidate.clone());
        update_order(&mut conn, order).await?;

        Ok(GeocodeOutcome {
            coords: None,
            cep: cep_candidate,
            reused_from_customer: false,
        })
    }
}

fn cache_hit(key: &GeocodeCacheKey, coords: Coordinates, provider: &str) -> GeocodeCacheEntry {
    GeocodeCacheEntry {
        key: key.clone(),
        lat: Some(coords.lat),
        lon: Some(coords.lon),
        provider: Some(provider.into()),
        geocoded_at: Utc::now(),
    }
}

fn cache_miss(key: &GeocodeCacheKey) -> GeocodeCacheEntry {
    GeocodeCacheEntry {
        key: key.clone(),
        lat: None,
        lon: None,
        provider: None,
        geocoded_at: Utc::now(),
    }
}

async fn report(
    progress: &Option<Sender<GeocodeProgress>>,
    stage: GeocodeStage,
    processed: usize,
    total: usize,
    label: Option<String>,
) {
    if let Some(sender) = progress {
        let _ = sender
            .send(GeocodeProgress {
                stage,
                processed,
                total,
                label,
            })
            .await;
    }
}

#[async_trait]
impl GeocodeAPI for Engine {
    #[tracing::instrument(skip(self, progress))]
    async fn geocode_pending(
        &self,
        user: User,
        progress: Option<Sender<GeocodeProgress>>,
    ) -> Result<GeocodeSummary, Error> {
        let (customers, orders) = {
            let mut conn = self.pool.acquire().await?;
            (
                fetch_customers(&mut conn).await?,
                fetch_orders(&mut conn).await?,
            )
        };

        let mut customer_map: HashMap<String, Customer> = customers
            .iter()
            .map(|customer| (customer.short_name.clone(), customer.clone()))
            .collect();

        let mut pending_customers: Vec<Customer> = customers
            .into_iter()
            .filter(|customer| customer.coordinates().is_none())
            .collect();

        let mut customer_summary = StageSummary {
            total: pending_customers.len(),
            ..StageSummary::default()
        };

        let total = pending_customers.len();
        for (index, customer) in pending_customers.iter_mut().enumerate() {
            let label = Some(customer.name.clone());
            report(&progress, GeocodeStage::Customers, index, total, label.clone()).await;

            match self.geocode_customer_record(customer).await {
                Ok(outcome) if outcome.coords.is_some() => {
                    customer_summary.geocoded += 1;
                    customer_map.insert(customer.short_name.clone(), customer.clone());
                }
                Ok(_) => customer_summary.failed += 1,
                Err(error) => {
                    tracing::error!(short_name = %customer.short_name, ?error, "customer geocode failed");
                    customer_summary.failed += 1;
                }
            }

            report(&progress, GeocodeStage::Customers, index + 1, total, label).await;
        }

        let mut pending_orders: Vec<Order> = orders
            .into_iter()
            .filter(|order| order.coordinates().is_none())
            .collect();

        let mut order_summary = OrderStageSummary {
            total: pending_orders.len(),
            ..OrderStageSummary::default()
        };

        let total = pending_orders.len();
        for (index, order) in pending_orders.iter_mut().enumerate() {
            let label = Some(order.customer_name.clone());
            report(&progress, GeocodeStage::Orders, index, total, label.clone()).await;

            let customer = customer_map.get(&order.customer_short_name).cloned();
            match self.geocode_order_record(order, customer.as_ref()).await {
                Ok(outcome) if outcome.coords.is_some() => {
                    order_summary.geocoded += 1;
                    if outcome.reused_from_customer {
                        order_summary.reused_from_customer += 1;
                    }
                }
                Ok(_) => order_summary.failed += 1,
                Err(error) => {
                    tracing::error!(order_id = %order.id, ?error, "order geocode failed");
                    order_summary.failed += 1;
                }
            }

            report(&progress, GeocodeStage::Orders, index + 1, total, label).await;
        }

        Ok(GeocodeSummary {
            customers: customer_summary,
            orders: order_summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn order_with_raw(raw: serde_json::Value) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_short_name: "ACME".into(),
            customer_name: "ACME".into(),
            delivery_date: None,
            rota: None,
            rota_normalized: None,
            cep: None,
            lat: None,
            lon: None,
            geocoded: false,
            raw_data: raw,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn city_cell_splits_on_first_hyphen_regardless_of_spacing() {
        assert_eq!(city_cell_query("Campinas - SP"), "Campinas, SP");
        assert_eq!(city_cell_query("Campinas-SP"), "Campinas, SP");
        assert_eq!(city_cell_query("Campinas  -  SP"), "Campinas, SP");
        assert_eq!(city_cell_query("Campinas"), "Campinas");
    }

    #[test]
    fn order_address_query_uses_the_delivery_city_cell() {
        let order = order_with_raw(json!({
            "Local Entrega": "RUA A, 10",
            "Cidade Entrega": "Campinas-SP",
        }));

        assert_eq!(
            order_address_query(&order, None).as_deref(),
            Some("RUA A, 10, CAMPINAS, SP")
        );
    }

    #[test]
    fn order_address_query_falls_back_to_customer_city_state() {
        let order = order_with_raw(json!({ "Local Entrega": "RUA A, 10" }));
        let mut customer = crate::import::build_customer(
            json!({ "Nome": "ACME", "Cidade": "Campinas", "Estado": "SP" })
                .as_object()
                .unwrap(),
        );
        customer.short_name = "ACME".into();

        assert_eq!(
            order_address_query(&order, Some(&customer)).as_deref(),
            Some("RUA A, 10, CAMPINAS, SP")
        );
        assert!(order_address_query(&order_with_raw(json!({})), None).is_none());
    }
}
