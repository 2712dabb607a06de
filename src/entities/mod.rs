mod coordinates;
mod customer;
mod geocode;
mod order;
mod route;

pub use coordinates::Coordinates;
pub use customer::{Customer, Transportadora, TransportadoraUpdate};
pub use geocode::{
    GeocodeCacheEntry, GeocodeCacheKey, GeocodeOutcome, GeocodeProgress, GeocodeStage,
    GeocodeSummary, OrderStageSummary, StageSummary,
};
pub use order::Order;
pub use route::{
    RouteAlternatives, RouteMetrics, RouteOption, RouteSegment, RouteStep, SavedRoute, Waypoint,
};
