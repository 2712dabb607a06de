pub mod customers;
pub mod geocoding;
pub mod imports;
pub mod orders;
pub mod routes;
