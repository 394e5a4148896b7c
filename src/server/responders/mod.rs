pub mod health;
pub mod metrics;
pub mod portfolio;
pub mod prices;
pub mod probe;
