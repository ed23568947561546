pub mod cache;
pub mod location;
pub mod openweather;
pub mod weather;
