use super::helpers::{fetch_customers, insert_customer, insert_order};
use super::Engine;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::Executor;
use std::collections::{HashMap, HashSet};

use crate::api::ImportAPI;
use crate::auth::User;
use crate::entities::{Customer, Order};
use crate::error::{import_error, invalid_input_error, Error};
use crate::import::{
    build_customer, build_orders, clean_rows, collect_unmatched, normalize_order_dates,
    ImportOutcome,
};

#[async_trait]
impl ImportAPI for Engine {
    // Replaces the affected tables. Orders must all match a customer,
    // imported in the same call or already registered, or nothing is written.
    #[tracing::instrument(skip(self, customers, orders))]
    async fn import_records(
        &self,
        user: User,
        customers: Option<Vec<Map<String, Value>>>,
        orders: Option<Vec<Map<String, Value>>>,
    ) -> Result<ImportOutcome, Error> {
        user.require_role("admin")?;

        let import_customers = customers.is_some();
        let import_orders = orders.is_some();

        if !import_customers && !import_orders {
            return Err(invalid_input_error());
        }

        let imported_customers: Option<Vec<Customer>> = match customers {
            Some(rows) => {
                let rows = clean_rows(rows);
                if rows.is_empty() {
                    return Err(import_error("customer import is empty".into()));
                }
                Some(rows.iter().map(build_customer).collect())
            }
            None => None,
        };

        let order_rows: Vec<Map<String, Value>> = match orders {
            Some(rows) => {
                let mut rows = clean_rows(rows);
                if rows.is_empty() {
                    return Err(import_error("order import is empty".into()));
                }
                for row in rows.iter_mut() {
                    normalize_order_dates(row);
                }
                rows
            }
            None => vec![],
        };

        let mut orders_payload: Option<Vec<Order>> = None;
        if import_orders {
            let source: Vec<Customer> = match &imported_customers {
                Some(list) => list.clone(),
                None => {
                    let mut conn = self.pool.acquire().await?;
                    let existing = fetch_customers(&mut conn).await?;
                    if existing.is_empty() {
                        return Err(import_error(
                            "no customers registered; import customers before orders".into(),
                        ));
                    }
                    existing
                }
            };

            let customer_map: HashMap<String, Customer> = source
                .into_iter()
                .map(|customer| (customer.short_name.clone(), customer))
                .collect();
            let short_names: HashSet<String> = customer_map.keys().cloned().collect();

            let unmatched = collect_unmatched(&order_rows, &short_names);
            if !unmatched.is_empty() {
                return Err(import_error(format!(
                    "orders without a matching customer: {}",
                    unmatched.join(", ")
                )));
            }

            orders_payload = Some(build_orders(&order_rows, &customer_map));
        }

        let mut tx = self.pool.begin().await?;

        if import_orders {
            tx.execute(sqlx::query("DELETE FROM orders")).await?;
        }
        if import_customers {
            tx.execute(sqlx::query("DELETE FROM customers")).await?;
        }

        if let Some(batch) = &imported_customers {
            for customer in batch {
                insert_customer(&mut tx, customer).await?;
            }
        }
        if let Some(batch) = &orders_payload {
            for order in batch {
                insert_order(&mut tx, order).await?;
            }
        }

        tx.commit().await?;

        let outcome = ImportOutcome {
            customers: imported_customers.map(|batch| batch.len()),
            orders: orders_payload.map(|batch| batch.len()),
        };

        tracing::info!(?outcome, "import finished");

        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    async fn clear_data(
        &self,
        user: User,
        clear_orders: bool,
        clear_customers: bool,
    ) -> Result<(), Error> {
        user.require_role("admin")?;

        if !clear_orders && !clear_customers {
            return Ok(());
        }

        let mut conn = self.pool.acquire().await?;

        if clear_orders {
            conn.execute(sqlx::query("DELETE FROM orders")).await?;
        }
        if clear_customers {
            conn.execute(sqlx::query("DELETE FROM customers")).await?;
        }

        Ok(())
    }
}
