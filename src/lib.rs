pub mod api;
pub mod auth;
pub mod engine;
pub mod entities;
pub mod error;
pub mod external;
pub mod geocoder;
pub mod import;
pub mod normalize;
pub mod overrides;
pub mod server;
