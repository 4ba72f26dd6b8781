pub mod comparison;
pub mod errors;
pub mod models;
pub mod ports;
