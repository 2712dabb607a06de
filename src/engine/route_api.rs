use super::helpers::{delete_saved_route, fetch_saved_routes, insert_saved_route};
use super::Engine;

use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use crate::api::RouteAPI;
use crate::auth::User;
use crate::entities::{
    Coordinates, RouteAlternatives, RouteMetrics, RouteOption, SavedRoute, Waypoint,
};
use crate::error::{invalid_input_error, upstream_error, Error};
use crate::external::{nominatim, ors, osrm};

const ORS_PREFERENCES: [(&str, &str, &str); 3] = [
    (
        "fastest",
        "Rota Mais Rápida",
        "Prioriza velocidade e tempo de viagem",
    ),
    ("shortest", "Rota Mais Curta", "Menor distância percorrida"),
    (
        "recommended",
        "Rota Recomendada",
        "Equilíbrio entre distância e tempo",
    ),
];

fn is_permutation(order: &[usize], len: usize) -> bool {
    order.len() == len
        && order.iter().all(|&index| index < len)
        && order.iter().collect::<HashSet<_>>().len() == len
}

fn reorder(waypoints: Vec<Waypoint>, order: &[usize]) -> Vec<Waypoint> {
    let mut reordered: Vec<Waypoint> = order
        .iter()
        .filter_map(|&index| waypoints.get(index).cloned())
        .collect();

    for (position, waypoint) in reordered.iter_mut().enumerate() {
        waypoint.position = Some(position);
    }

    reordered
}

impl Engine {
    // Up to three route options for the waypoints in their given order;
    // OSRM takes over when no key is configured or every primary call fails.
    async fn compute_alternatives(
        &self,
        mut waypoints: Vec<Waypoint>,
    ) -> Result<RouteAlternatives, Error> {
        if waypoints.len() < 2 {
            return Err(invalid_input_error());
        }

        for waypoint in waypoints.iter_mut() {
            if waypoint.address.trim().is_empty() {
                waypoint.address =
                    nominatim::reverse_geocode(Coordinates::new(waypoint.lat, waypoint.lon)).await;
            }
        }

        if ors::api_key().is_some() {
            let coordinates: Vec<[f64; 2]> =
                waypoints.iter().map(|wp| [wp.lon, wp.lat]).collect();

            let mut routes = Vec::new();
            for (preference, name, description) in ORS_PREFERENCES {
                match ors::directions(&coordinates, preference).await {
                    Ok(response) => {
                        if let Some(option) =
                            ors::route_option(&response, preference, name, description)
                        {
                            routes.push(option);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(preference, ?error, "directions request failed");
                    }
                }
            }

            if !routes.is_empty() {
                return Ok(RouteAlternatives {
                    waypoints,
                    routes,
                    used_fallback: false,
                });
            }
        }

        let response = osrm::route(&waypoints, true).await?;
        let routes = osrm::route_options(&response);

        if routes.is_empty() {
            return Err(upstream_error());
        }

        Ok(RouteAlternatives {
            waypoints,
            routes,
            used_fallback: true,
        })
    }
}

#[async_trait]
impl RouteAPI for Engine {
    // First waypoint stays fixed as the start; the original order is kept
    // when neither router returns a usable permutation.
    #[tracing::instrument(skip(self, waypoints))]
    async fn optimize_route(
        &self,
        user: User,
        waypoints: Vec<Waypoint>,
    ) -> Result<RouteAlternatives, Error> {
        if waypoints.len() < 2 {
            return Err(invalid_input_error());
        }

        let order = if ors::api_key().is_some() {
            match ors::optimize(&waypoints[0], &waypoints[1..]).await {
                Ok(jobs) if is_permutation(&jobs, waypoints.len() - 1) => {
                    let mut order = vec![0];
                    order.extend(jobs.iter().map(|&job| job + 1));
                    order
                }
                Ok(_) | Err(_) => match osrm::trip_order(&waypoints).await {
                    Ok(order) if is_permutation(&order, waypoints.len()) => order,
                    _ => (0..waypoints.len()).collect(),
                },
            }
        } else {
            match osrm::trip_order(&waypoints).await {
                Ok(order) if is_permutation(&order, waypoints.len()) => order,
                _ => (0..waypoints.len()).collect(),
            }
        };

        let reordered = reorder(waypoints, &order);

        self.compute_alternatives(reordered).await
    }

    #[tracing::instrument(skip(self, waypoints))]
    async fn calculate_routes(
        &self,
        user: User,
        waypoints: Vec<Waypoint>,
    ) -> Result<RouteAlternatives, Error> {
        self.compute_alternatives(waypoints).await
    }

    #[tracing::instrument(skip(self, waypoints, route, metrics))]
    async fn save_route(
        &self,
        user: User,
        name: String,
        waypoints: Vec<Waypoint>,
        route: RouteOption,
        metrics: RouteMetrics,
    ) -> Result<SavedRoute, Error> {
        if name.trim().is_empty() || waypoints.is_empty() {
            return Err(invalid_input_error());
        }

        let saved = SavedRoute::new(name, waypoints, route, metrics);

        let mut conn = self.pool.acquire().await?;
        insert_saved_route(&mut conn, &saved).await?;

        Ok(saved)
    }

    #[tracing::instrument(skip(self))]
    async fn list_saved_routes(&self, user: User) -> Result<Vec<SavedRoute>, Error> {
        let mut conn = self.pool.acquire().await?;

        fetch_saved_routes(&mut conn).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_saved_route(&self, user: User, id: Uuid) -> Result<(), Error> {
        user.require_role("admin")?;

        let mut conn = self.pool.acquire().await?;

        let deleted = delete_saved_route(&mut conn, &id).await?;
        if deleted == 0 {
            return Err(invalid_input_error());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoint(id: &str) -> Waypoint {
        Waypoint {
            id: id.into(),
            lat: -23.0,
            lon: -47.0,
            address: "Campinas".into(),
            position: None,
            order_ids: vec![],
            produced_kg: None,
            packed_kg: None,
        }
    }

    #[test]
    fn reorder_assigns_positions() {
        let waypoints = vec![waypoint("a"), waypoint("b"), waypoint("c")];
        let reordered = reorder(waypoints, &[0, 2, 1]);

        let ids: Vec<&str> = reordered.iter().map(|wp| wp.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        let positions: Vec<Option<usize>> = reordered.iter().map(|wp| wp.position).collect();
        assert_eq!(positions, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn permutation_check_rejects_duplicates_and_wrong_length() {
        assert!(is_permutation(&[1, 0, 2], 3));
        assert!(!is_permutation(&[0, 0, 2], 3));
        assert!(!is_permutation(&[0, 1], 3));
        assert!(!is_permutation(&[0, 1, 2, 3], 3));
        assert!(!is_permutation(&[0, 1, 5], 3));
    }
}
