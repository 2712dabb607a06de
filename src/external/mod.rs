pub mod nominatim;
pub mod ors;
pub mod osrm;
