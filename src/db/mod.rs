pub mod locations;
pub mod models;
