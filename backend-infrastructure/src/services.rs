pub mod geocoding_service;

pub use geocoding_service::*;
